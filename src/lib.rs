// Re-export modules
pub mod classify;
pub mod config;
pub mod crawlers;
pub mod endpoint;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use classify::{ListingKind, classify, sanitize_slug};
pub use config::HarvestConfig;
pub use crawlers::{CancelFlag, HarvestReport, ListingCrawler, StopReason};
pub use endpoint::Endpoint;
pub use error::{FetchError, HarvestError, Result};
pub use fetch::JsonFetcher;
pub use results::ProductRecord;

use std::path::Path;

/// Main builder for one harvest run over a listing URL
pub struct Harvest {
    listing_url: String,
    config: HarvestConfig,
    cancel: Option<CancelFlag>,
}

impl Harvest {
    /// Create a new Harvest builder for the given listing page URL
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            config: HarvestConfig::default(),
            cancel: None,
        }
    }

    /// Apply a configuration
    pub fn with_config(mut self, config: HarvestConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = HarvestConfig::from_file(path)?;
        Ok(self)
    }

    /// Set the number of records to collect
    pub fn with_target_count(mut self, count: usize) -> Self {
        self.config.pagination.target_count = count;
        self
    }

    /// Set the page ceiling
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.pagination.max_pages = max_pages;
        self
    }

    /// Stop between pages once this flag is raised
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Resolve the listing URL to its backend endpoint without fetching
    pub fn endpoint(&self) -> Result<Endpoint> {
        classify(&self.listing_url, &self.config.site)
    }

    /// Run with the fetcher described by the configuration
    pub async fn run(self) -> Result<HarvestReport> {
        self.config.validate()?;
        let fetcher = fetch::build_fetcher(&self.config)?;
        self.run_with(fetcher.as_ref()).await
    }

    /// Run with a caller-supplied fetcher
    pub async fn run_with<F: JsonFetcher + ?Sized>(self, fetcher: &F) -> Result<HarvestReport> {
        let endpoint = self.endpoint()?;
        ::log::info!("Resolved {} to {}", self.listing_url, endpoint);

        let mut crawler = ListingCrawler::new(fetcher, &self.config);
        if let Some(cancel) = self.cancel.clone() {
            crawler = crawler.with_cancel_flag(cancel);
        }
        crawler.run(&endpoint).await
    }
}
