use crate::config::HttpConfig;
use crate::error::{FetchError, HarvestError};
use crate::fetch::JsonFetcher;
use crate::utils::redact_url;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Direct HTTP fetcher with a bounded number of attempts
pub struct HttpFetcher {
    client: reqwest::Client,
    attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| HarvestError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            attempts: config.retries.max(1),
            backoff: config.retry_backoff(),
        })
    }

    /// One request, no retries
    async fn attempt(&self, url: &str) -> Result<Value, FetchError> {
        let shown = redact_url(url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: shown.clone(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: shown,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: shown.clone(),
            message: e.without_url().to_string(),
        })?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: shown,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let shown = redact_url(url);
        with_retries(self.attempts, self.backoff, &shown, |_| self.attempt(url)).await
    }
}

/// Run `op` up to `attempts` times, pausing `backoff` between failures
///
/// The error of the final attempt is returned.
pub async fn with_retries<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    label: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        ::log::debug!("Attempt {}/{} for {}", attempt, attempts, label);
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                ::log::warn!("Giving up on {} after {} attempt(s): {}", label, attempts, e);
                return Err(e);
            }
            Err(e) => {
                ::log::warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
