//! Key-rotating proxy wrapper.
//!
//! Wraps any [`JsonFetcher`] so that each request is first routed through a
//! scraping proxy, trying the configured credential tokens one after
//! another. Tokens the proxy refuses are retired for the lifetime of the
//! wrapper. When every token failed the request can still go out directly.

use crate::config::ProxyConfig;
use crate::endpoint::Endpoint;
use crate::error::FetchError;
use crate::fetch::JsonFetcher;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

/// Proxy decorator satisfying the same contract as the fetcher it wraps
pub struct KeyRotatingFetcher<F: JsonFetcher> {
    inner: F,
    endpoint: String,
    keys: Vec<String>,
    shuffle: bool,
    fallback_direct: bool,
    render_js: bool,
    /// Indexes into `keys` that answered permission-denied
    exhausted: Mutex<HashSet<usize>>,
}

impl<F: JsonFetcher> KeyRotatingFetcher<F> {
    /// Wrap `inner`; the same fetcher is used for proxied and direct requests
    pub fn new(inner: F, config: &ProxyConfig) -> Self {
        Self {
            inner,
            endpoint: config.endpoint.clone(),
            keys: config.api_keys.clone(),
            shuffle: config.shuffle,
            fallback_direct: config.fallback_direct,
            render_js: config.render_js,
            exhausted: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped fetcher
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Number of keys still in rotation
    pub fn live_keys(&self) -> usize {
        self.keys.len() - self.exhausted_keys().len()
    }

    /// Proxy request URL handing `target` over with the key at `idx`
    pub fn proxied_url(&self, idx: usize, target: &str) -> String {
        Endpoint::new(self.endpoint.as_str())
            .with_param("api_key", self.keys[idx].as_str())
            .with_param("url", target)
            .with_param("render_js", if self.render_js { "true" } else { "false" })
            .to_string()
    }

    fn exhausted_keys(&self) -> HashSet<usize> {
        self.exhausted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn retire(&self, idx: usize) {
        self.exhausted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(idx);
    }

    /// Live key indexes in the order they should be tried
    fn rotation(&self) -> Vec<usize> {
        let exhausted = self.exhausted_keys();
        let mut order: Vec<usize> = (0..self.keys.len())
            .filter(|idx| !exhausted.contains(idx))
            .collect();
        if self.shuffle {
            fastrand::shuffle(&mut order);
        }
        order
    }
}

#[async_trait]
impl<F: JsonFetcher> JsonFetcher for KeyRotatingFetcher<F> {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        for idx in self.rotation() {
            match self.inner.fetch_json(&self.proxied_url(idx, url)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_permission_denied() => {
                    ::log::warn!("Proxy key #{} refused, retiring it: {}", idx + 1, e);
                    self.retire(idx);
                }
                Err(e) => {
                    ::log::warn!("Proxy key #{} failed for {}: {}", idx + 1, url, e);
                }
            }
        }

        if self.fallback_direct {
            ::log::info!("All proxy keys failed, fetching {} directly", url);
            return self.inner.fetch_json(url).await;
        }

        Err(FetchError::KeysExhausted {
            url: url.to_string(),
        })
    }
}
