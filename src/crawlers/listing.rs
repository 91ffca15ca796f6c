//! Sequential pagination over one listing endpoint.
//!
//! One [`ListingCrawler`] drives one run: it fetches page after page,
//! extracts every product it has not seen yet and stops on the first
//! terminating condition. Pages are never fetched concurrently since each
//! decision depends on the pager metadata and duplicate counts seen so far.

use crate::config::HarvestConfig;
use crate::endpoint::Endpoint;
use crate::error::{FetchError, HarvestError, Result};
use crate::extract::{self, lookup};
use crate::fetch::JsonFetcher;
use crate::results::ProductRecord;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Keys that mark an object as a product when searching a payload for its list
const PRODUCT_TITLE_KEYS: [&str; 4] = ["title_fa", "title", "name", "product_title_fa"];

/// Consecutive product-less pages that end a run
const MAX_EMPTY_PAGES: u32 = 2;

/// Cooperative cancellation signal, checked between pages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next page
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run ended without an error
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The requested number of records was collected
    TargetReached,
    /// Two pages in a row held no products
    EmptyPages,
    /// A page held only products seen before
    NoNewProducts,
    /// The pager reported a page past the last one
    PagerExhausted,
    /// The pager reported zero matching items
    NoResults,
    /// The page ceiling was reached
    PageLimit,
    /// A page after the first could not be fetched or decoded
    PageFailed { page: u32, reason: String },
    /// The cancel flag was raised
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "target count reached"),
            StopReason::EmptyPages => write!(f, "no products on consecutive pages"),
            StopReason::NoNewProducts => write!(f, "no new products on the last page"),
            StopReason::PagerExhausted => write!(f, "no more pages available"),
            StopReason::NoResults => write!(f, "listing has no products"),
            StopReason::PageLimit => write!(f, "page limit reached"),
            StopReason::PageFailed { page, reason } => {
                write!(f, "page {} failed: {}", page, reason)
            }
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Unique records in the order they were found
    pub records: Vec<ProductRecord>,
    /// Endpoint the run paged through
    pub endpoint: Endpoint,
    /// Pages fetched successfully
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

/// Pager metadata exposed under `data.pager`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pager {
    current_page: Option<f64>,
    total_pages: Option<f64>,
    total_items: Option<f64>,
}

impl Pager {
    fn from_payload(payload: &Value) -> Option<Self> {
        let pager = lookup::present(payload, "data.pager")?;
        if !pager.is_object() {
            return None;
        }
        Some(Self {
            current_page: lookup::number_at(pager, "current_page"),
            total_pages: lookup::number_at(pager, "total_pages"),
            total_items: lookup::number_at(pager, "total_items"),
        })
    }

    /// Stop signal carried by the metadata, if any
    fn stop_reason(&self, requested_page: u32) -> Option<StopReason> {
        let current = self.current_page.unwrap_or(f64::from(requested_page));
        if let Some(total_pages) = self.total_pages.filter(|t| *t > 0.0) {
            if current > total_pages {
                return Some(StopReason::PagerExhausted);
            }
        }
        if self.total_items == Some(0.0) {
            return Some(StopReason::NoResults);
        }
        None
    }
}

/// Pagination driver for a single run
///
/// The seen-identifier set and collected records are owned by the crawler and
/// consumed by [`ListingCrawler::run`], so a crawler cannot be reused.
pub struct ListingCrawler<'a, F: JsonFetcher + ?Sized> {
    fetcher: &'a F,
    config: &'a HarvestConfig,
    cancel: Option<CancelFlag>,
    seen: HashSet<String>,
    records: Vec<ProductRecord>,
}

impl<'a, F: JsonFetcher + ?Sized> ListingCrawler<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a HarvestConfig) -> Self {
        Self {
            fetcher,
            config,
            cancel: None,
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Check this flag between pages
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Page through `endpoint` until a stop condition is met
    ///
    /// Fails only when the first page of the run cannot be fetched or is not a
    /// JSON object; later failures end the run with what was collected.
    pub async fn run(mut self, endpoint: &Endpoint) -> Result<HarvestReport> {
        let config = self.config;
        let pagination = &config.pagination;
        let target = pagination.target_count;
        let mut page = endpoint.page().filter(|p| *p > 0).unwrap_or(1);
        let mut pages_fetched = 0;
        let mut empty_pages = 0;

        ::log::info!(
            "Harvesting up to {} products from {} starting at page {}",
            target,
            endpoint,
            page
        );

        let stop_reason = loop {
            if self.records.len() >= target {
                break StopReason::TargetReached;
            }
            if page > pagination.max_pages {
                break StopReason::PageLimit;
            }
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }

            let page_url = endpoint.with_page(page).to_string();
            ::log::info!("Fetching page {}: {}", page, page_url);

            let payload = match self.fetch_page(&page_url, page).await {
                Ok(payload) => payload,
                Err(e) if pages_fetched == 0 => return Err(e),
                Err(e) => {
                    ::log::warn!("Stopping after failure on page {}: {}", page, e);
                    break StopReason::PageFailed {
                        page,
                        reason: e.to_string(),
                    };
                }
            };
            pages_fetched += 1;

            if let Some(reason) = Pager::from_payload(&payload).and_then(|p| p.stop_reason(page)) {
                break reason;
            }

            let products = find_products(&payload);
            ::log::info!("Found {} product(s) on page {}", products.len(), page);

            if products.is_empty() {
                empty_pages += 1;
                if empty_pages >= MAX_EMPTY_PAGES {
                    break StopReason::EmptyPages;
                }
            } else {
                empty_pages = 0;
                let added = self.collect(products, target);
                ::log::info!(
                    "Page {}: added {} product(s), {} total",
                    page,
                    added,
                    self.records.len()
                );

                if self.records.len() >= target {
                    break StopReason::TargetReached;
                }
                if added == 0 {
                    break StopReason::NoNewProducts;
                }
            }

            page += 1;
            if page > pagination.max_pages {
                break StopReason::PageLimit;
            }
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }
            tokio::time::sleep(pagination.polite_delay()).await;
        };

        ::log::info!(
            "Harvest finished with {} product(s) from {} page(s): {}",
            self.records.len(),
            pages_fetched,
            stop_reason
        );

        Ok(HarvestReport {
            records: self.records,
            endpoint: endpoint.clone(),
            pages_fetched,
            stop_reason,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    async fn fetch_page(&self, url: &str, page: u32) -> Result<Value> {
        let payload = self
            .fetcher
            .fetch_json(url)
            .await
            .map_err(|source: FetchError| HarvestError::Fetch { page, source })?;

        if !payload.is_object() {
            return Err(HarvestError::MalformedPayload {
                page,
                url: url.to_string(),
            });
        }
        Ok(payload)
    }

    /// Extract unseen products until `target` records are held
    fn collect(&mut self, products: &[Value], target: usize) -> usize {
        let mut added = 0;
        for product in products {
            if self.records.len() >= target {
                break;
            }
            let Some(id) = lookup::product_id(product) else {
                ::log::debug!("Skipping product without a readable id");
                continue;
            };
            if !self.seen.insert(id) {
                continue;
            }
            self.records.push(extract::extract(product, &self.config.site));
            added += 1;
        }
        added
    }
}

/// Locate the product list of a page payload
///
/// `data.products` is used when it is a non-empty list. Otherwise the whole
/// payload is searched breadth-first for the first list whose first element
/// looks like a product.
pub fn find_products(payload: &Value) -> &[Value] {
    if let Some(Value::Array(products)) = lookup::at(payload, "data.products") {
        if !products.is_empty() {
            return products;
        }
    }

    let mut queue: VecDeque<&Value> = VecDeque::from([payload]);
    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => queue.extend(map.values()),
            Value::Array(items) => {
                if items.first().is_some_and(looks_like_product) {
                    return items;
                }
                queue.extend(items.iter());
            }
            _ => {}
        }
    }
    &[]
}

fn looks_like_product(node: &Value) -> bool {
    node.as_object().is_some_and(|map| {
        map.contains_key("id") && PRODUCT_TITLE_KEYS.iter().any(|k| map.contains_key(*k))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "https://api.example.com/v1/categories/mobile-phone/search/";

    fn config(target: usize) -> HarvestConfig {
        let mut config = HarvestConfig::default();
        config.site.api_base = "https://api.example.com/v1".to_string();
        config.site.site_root = "https://shop.example.com".to_string();
        config.pagination.target_count = target;
        config.pagination.polite_delay_ms = 0;
        config
    }

    fn endpoint() -> Endpoint {
        Endpoint::new(BASE).with_param("sort", "7").with_param("page", "1")
    }

    fn page_url(page: u32) -> String {
        endpoint().with_page(page).to_string()
    }

    fn products(ids: &[u64]) -> Value {
        let list: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "title_fa": format!("Product {}", id) }))
            .collect();
        json!({ "data": { "products": list } })
    }

    fn ids(report: &HarvestReport) -> Vec<&str> {
        report.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_repeated_page_stops_with_no_new_products() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1, 2, 3]))
            .with_json(page_url(2), products(&[3, 2, 1]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2", "3"]);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.stop_reason, StopReason::NoNewProducts);
        assert_eq!(mock.calls(), vec![page_url(1), page_url(2)]);
    }

    #[tokio::test]
    async fn test_partial_duplicates_are_skipped() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1, 2]))
            .with_json(page_url(2), products(&[2, 3]))
            .with_json(page_url(3), products(&[3]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2", "3"]);
        assert_eq!(report.stop_reason, StopReason::NoNewProducts);
        assert_eq!(report.records[2].url, "https://shop.example.com/product/dkp-3");
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let mock = MockFetcher::new().with_status(page_url(1), 500);
        let config = config(100);

        match ListingCrawler::new(&mock, &config).run(&endpoint()).await {
            Err(HarvestError::Fetch { page, source }) => {
                assert_eq!(page, 1);
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("expected a fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_page_malformed_is_fatal() {
        let mock = MockFetcher::new().with_json(page_url(1), json!([1, 2, 3]));
        let config = config(100);

        let result = ListingCrawler::new(&mock, &config).run(&endpoint()).await;
        assert!(matches!(
            result,
            Err(HarvestError::MalformedPayload { page: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_later_failure_keeps_partial_results() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1, 2]))
            .with_status(page_url(2), 503);
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.pages_fetched, 1);
        assert!(matches!(report.stop_reason, StopReason::PageFailed { page: 2, .. }));
    }

    #[tokio::test]
    async fn test_later_transport_failure_keeps_partial_results() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1, 2]))
            .with_error(
                page_url(2),
                FetchError::Transport {
                    url: page_url(2),
                    message: "connection reset".to_string(),
                },
            );
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.endpoint, endpoint());
        match report.stop_reason {
            StopReason::PageFailed { page, reason } => {
                assert_eq!(page, 2);
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected PageFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_later_malformed_payload_keeps_partial_results() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1]))
            .with_json(page_url(2), json!("maintenance"));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1"]);
        assert!(matches!(report.stop_reason, StopReason::PageFailed { page: 2, .. }));
    }

    #[tokio::test]
    async fn test_target_truncates_page() {
        let mock = MockFetcher::new().with_json(page_url(1), products(&[1, 2, 3, 4]));
        let config = config(3);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2", "3"]);
        assert_eq!(report.stop_reason, StopReason::TargetReached);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_two_empty_pages_stop() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1]))
            .with_json(page_url(2), json!({ "data": { "products": [] } }))
            .with_json(page_url(3), json!({ "data": {} }))
            .with_json(page_url(4), products(&[2]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1"]);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.stop_reason, StopReason::EmptyPages);
    }

    #[tokio::test]
    async fn test_single_empty_page_is_skipped() {
        let mock = MockFetcher::new()
            .with_json(page_url(1), json!({ "data": { "products": [] } }))
            .with_json(page_url(2), products(&[7]))
            .with_json(page_url(3), products(&[7]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["7"]);
        assert_eq!(report.stop_reason, StopReason::NoNewProducts);
    }

    #[tokio::test]
    async fn test_pager_past_last_page_stops() {
        let mut page2 = products(&[3]);
        page2["data"]["pager"] = json!({ "current_page": 2, "total_pages": 1, "total_items": 2 });
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1, 2]))
            .with_json(page_url(2), page2);
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.stop_reason, StopReason::PagerExhausted);
    }

    #[tokio::test]
    async fn test_pager_without_items_stops() {
        let mock = MockFetcher::new().with_json(
            page_url(1),
            json!({ "data": { "products": [], "pager": { "current_page": 1, "total_pages": 0, "total_items": 0 } } }),
        );
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.stop_reason, StopReason::NoResults);
    }

    #[tokio::test]
    async fn test_pager_without_total_items_continues() {
        let mut page1 = products(&[1]);
        page1["data"]["pager"] = json!({ "current_page": 1, "total_pages": 3 });
        let mock = MockFetcher::new()
            .with_json(page_url(1), page1)
            .with_json(page_url(2), products(&[2]))
            .with_json(page_url(3), products(&[2]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.stop_reason, StopReason::NoNewProducts);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let mut config = config(100);
        config.pagination.max_pages = 2;
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1]))
            .with_json(page_url(2), products(&[2]))
            .with_json(page_url(3), products(&[3]));

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.stop_reason, StopReason::PageLimit);
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_starts_at_endpoint_page() {
        let mock = MockFetcher::new()
            .with_status(page_url(3), 502)
            .with_json(page_url(1), products(&[1]));
        let config = config(100);

        // page 3 is the first page of this run, so its failure is fatal
        let result = ListingCrawler::new(&mock, &config)
            .run(&endpoint().with_page(3))
            .await;
        assert!(matches!(result, Err(HarvestError::Fetch { page: 3, .. })));
        assert_eq!(mock.calls(), vec![page_url(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_pages() {
        let mut config = config(100);
        config.pagination.polite_delay_ms = 1500;
        let mock = MockFetcher::new()
            .with_json(page_url(1), products(&[1]))
            .with_json(page_url(2), products(&[1]));

        let start = tokio::time::Instant::now();
        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::NoNewProducts);
        // one pause between the two pages, none after the last
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_page_ceiling() {
        let mut config = config(100);
        config.pagination.max_pages = 1;
        config.pagination.polite_delay_ms = 1500;
        let mock = MockFetcher::new().with_json(page_url(1), products(&[1]));

        let start = tokio::time::Instant::now();
        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::PageLimit);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    /// Raises the cancel flag once a page has been served
    struct CancelAfterFetch {
        inner: MockFetcher,
        cancel: CancelFlag,
    }

    #[async_trait::async_trait]
    impl JsonFetcher for CancelAfterFetch {
        async fn fetch_json(&self, url: &str) -> std::result::Result<Value, FetchError> {
            let result = self.inner.fetch_json(url).await;
            self.cancel.cancel();
            result
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_between_pages_without_delay() {
        let mut config = config(100);
        config.pagination.polite_delay_ms = 1500;
        let cancel = CancelFlag::new();
        let fetcher = CancelAfterFetch {
            inner: MockFetcher::new()
                .with_json(page_url(1), products(&[1]))
                .with_json(page_url(2), products(&[2])),
            cancel: cancel.clone(),
        };

        let start = tokio::time::Instant::now();
        let report = ListingCrawler::new(&fetcher, &config)
            .with_cancel_flag(cancel)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["1"]);
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(fetcher.inner.calls(), vec![page_url(1)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let mock = MockFetcher::new().with_json(page_url(1), products(&[1]));
        let config = config(100);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = ListingCrawler::new(&mock, &config)
            .with_cancel_flag(cancel)
            .run(&endpoint())
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_ids_are_skipped() {
        let mock = MockFetcher::new()
            .with_json(
                page_url(1),
                json!({ "data": { "products": [
                    { "id": null, "title_fa": "No id" },
                    { "id": "  ", "title_fa": "Blank id" },
                    { "id": 9, "title_fa": "Kept" }
                ] } }),
            )
            .with_json(page_url(2), products(&[9]));
        let config = config(100);

        let report = ListingCrawler::new(&mock, &config)
            .run(&endpoint())
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["9"]);
        assert_eq!(report.records[0].title, "Kept");
    }

    #[test]
    fn test_find_products_direct_path() {
        let payload = products(&[1, 2]);
        assert_eq!(find_products(&payload).len(), 2);
    }

    #[test]
    fn test_find_products_nested() {
        let payload = json!({
            "status": 200,
            "data": {
                "products": [],
                "widgets": [
                    { "type": "banner", "items": [{ "id": 1, "image": "x" }] },
                    { "type": "list", "data": { "items": [
                        { "id": 10, "name": "Scarf" },
                        { "id": 11, "name": "Hat" }
                    ] } }
                ]
            }
        });
        let found = find_products(&payload);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["id"], 10);
    }

    #[test]
    fn test_find_products_none() {
        assert!(find_products(&json!({ "data": { "filters": [1, 2] } })).is_empty());
        assert!(find_products(&json!({})).is_empty());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
