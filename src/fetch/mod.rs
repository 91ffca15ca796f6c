pub mod http;
pub mod proxy;

#[cfg(test)]
pub mod testing;

use crate::config::HarvestConfig;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpFetcher;
pub use proxy::KeyRotatingFetcher;

/// Fetch a URL and decode its body as JSON
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fails only after the implementation's own retries are spent
    async fn fetch_json(&self, url: &str) -> std::result::Result<Value, FetchError>;
}

#[async_trait]
impl<T: JsonFetcher + ?Sized> JsonFetcher for Box<T> {
    async fn fetch_json(&self, url: &str) -> std::result::Result<Value, FetchError> {
        (**self).fetch_json(url).await
    }
}

/// Build the fetcher described by the configuration: direct, or wrapped in
/// the key-rotating proxy when proxy keys are configured
pub fn build_fetcher(config: &HarvestConfig) -> Result<Box<dyn JsonFetcher>> {
    let direct = HttpFetcher::new(&config.http)?;

    match &config.proxy {
        Some(proxy) if !proxy.api_keys.is_empty() => {
            ::log::info!(
                "Routing requests through proxy with {} key(s)",
                proxy.api_keys.len()
            );
            Ok(Box::new(KeyRotatingFetcher::new(direct, proxy)))
        }
        _ => Ok(Box::new(direct)),
    }
}
