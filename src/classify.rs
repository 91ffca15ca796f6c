use crate::config::SiteConfig;
use crate::endpoint::{Endpoint, PAGE_PARAM};
use crate::error::{HarvestError, Result};
use url::Url;

const CATEGORY_PREFIX: &str = "category-";
const SEARCH_SEGMENT: &str = "search";
const FACET_SEGMENT: &str = "facet";

/// Families of human-facing listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// `/search/?q=<term>`
    SearchQuery,
    /// `/search/facet/<filter>/<filter>/...`
    Facet,
    /// `/tags/<slug>/`
    Tag,
    /// `/brand/<slug>/`
    Brand,
    /// `/search/category-<slug>/<brand-slug>/`
    CategoryBrand,
    /// Anything else a category slug can be salvaged from
    Category,
}

/// Keep only ASCII letters, digits and hyphens
pub fn sanitize_slug(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Map a listing URL to the backend search endpoint for its first page
pub fn classify(listing_url: &str, site: &SiteConfig) -> Result<Endpoint> {
    classify_with_kind(listing_url, site).map(|(_, endpoint)| endpoint)
}

/// Like [`classify`], also reporting which URL family matched
///
/// Rules are tried in a fixed order and the first match wins; several of them
/// overlap syntactically, so the order matters.
pub fn classify_with_kind(listing_url: &str, site: &SiteConfig) -> Result<(ListingKind, Endpoint)> {
    let unrecognized = || HarvestError::UnrecognizedUrl {
        url: listing_url.to_string(),
    };

    let url = parse_listing(listing_url, &site.site_root).ok_or_else(unrecognized)?;
    let segments = path_segments(&url);
    let api = site.api_base.trim_end_matches('/');

    if let Some(term) = search_term(&url) {
        ::log::debug!("Classifying as search query: {}", listing_url);
        let endpoint = Endpoint::new(format!("{}/search/", api))
            .with_param("q", term)
            .with_param(PAGE_PARAM, "1");
        return Ok((ListingKind::SearchQuery, endpoint));
    }

    if let Some(filters) = facet_filters(&segments) {
        ::log::debug!("Classifying as facet: {}", listing_url);
        let mut endpoint = Endpoint::new(format!("{}/facet/search/{}/", api, filters.join("/")))
            .with_param("sort", site.default_sort.as_str())
            .with_param(PAGE_PARAM, "1");
        for (i, filter) in filters.iter().enumerate() {
            endpoint = endpoint.with_param(format!("facetURL[{}]", i), filter.as_str());
        }
        return Ok((ListingKind::Facet, endpoint));
    }

    if let Some(slug) = leading_slug(&segments, "tags") {
        ::log::debug!("Classifying as tag: {}", listing_url);
        let endpoint =
            Endpoint::new(format!("{}/tags/{}/", api, slug)).with_param(PAGE_PARAM, "1");
        return Ok((ListingKind::Tag, endpoint));
    }

    if let Some(slug) = leading_slug(&segments, "brand") {
        ::log::debug!("Classifying as brand: {}", listing_url);
        let endpoint =
            Endpoint::new(format!("{}/brands/{}/", api, slug)).with_param(PAGE_PARAM, "1");
        return Ok((ListingKind::Brand, endpoint));
    }

    if let Some((category, brand)) = category_brand(&segments) {
        ::log::debug!("Classifying as category+brand: {}", listing_url);
        let endpoint = Endpoint::new(format!(
            "{}/categories/{}/brands/{}/search/",
            api, category, brand
        ))
        .with_param(PAGE_PARAM, "1");
        return Ok((ListingKind::CategoryBrand, endpoint));
    }

    let slug = category_slug(&segments).ok_or_else(unrecognized)?;
    ::log::debug!("Classifying as category '{}': {}", slug, listing_url);
    let endpoint = Endpoint::new(format!("{}/categories/{}/search/", api, slug))
        .with_param("sort", site.default_sort.as_str())
        .with_param(PAGE_PARAM, "1");
    Ok((ListingKind::Category, endpoint))
}

/// Parse the listing URL
///
/// A bare `host/path` gets an `https://` scheme and a `/path` is resolved
/// against the site root. Other relative input is rejected.
fn parse_listing(input: &str, site_root: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Url::parse(trimmed) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if trimmed.starts_with('/') => {
            Url::parse(site_root).ok()?.join(trimmed).ok()
        }
        Err(url::ParseError::RelativeUrlWithoutBase) if looks_like_host(trimmed) => {
            Url::parse(&format!("https://{}", trimmed)).ok()
        }
        Err(_) => None,
    }
}

/// Whether the first segment of a scheme-less input is a host name
fn looks_like_host(input: &str) -> bool {
    let host = input
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.chars().any(|c| c.is_ascii_alphabetic()))
}

/// Non-empty, percent-decoded path segments
fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|decoded| decoded.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn search_term(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == "q" && !value.trim().is_empty())
        .map(|(_, value)| value.into_owned())
}

fn facet_filters(segments: &[String]) -> Option<Vec<String>> {
    if !segments.iter().any(|s| s == SEARCH_SEGMENT) {
        return None;
    }
    let facet_idx = segments.iter().position(|s| s == FACET_SEGMENT)?;
    let filters: Vec<String> = segments[facet_idx + 1..]
        .iter()
        .map(|s| sanitize_slug(s))
        .filter(|s| !s.is_empty())
        .collect();
    (!filters.is_empty()).then_some(filters)
}

fn leading_slug(segments: &[String], head: &str) -> Option<String> {
    match segments {
        [first, second, ..] if first == head => {
            let slug = sanitize_slug(second);
            (!slug.is_empty()).then_some(slug)
        }
        _ => None,
    }
}

fn category_brand(segments: &[String]) -> Option<(String, String)> {
    let search_idx = segments.iter().position(|s| s == SEARCH_SEGMENT)?;
    let category = segments.get(search_idx + 1)?.strip_prefix(CATEGORY_PREFIX)?;
    let brand = segments.get(search_idx + 2)?;

    let category = sanitize_slug(category);
    let brand = sanitize_slug(brand);
    if category.is_empty() || brand.is_empty() {
        return None;
    }
    Some((category, brand))
}

fn category_slug(segments: &[String]) -> Option<String> {
    let strip = |s: &String| s.strip_prefix(CATEGORY_PREFIX).unwrap_or(s).to_string();

    let prefixed = segments
        .iter()
        .find(|s| s.starts_with(CATEGORY_PREFIX))
        .map(strip)
        .filter(|s| !s.is_empty());

    let after_search = || {
        let idx = segments.iter().position(|s| s == SEARCH_SEGMENT)?;
        segments.get(idx + 1).map(strip).filter(|s| !s.is_empty())
    };

    let last = || segments.last().map(strip).filter(|s| !s.is_empty());

    let raw = prefixed.or_else(after_search).or_else(last)?;
    let slug = sanitize_slug(&raw);
    (!slug.is_empty()).then_some(slug)
}
