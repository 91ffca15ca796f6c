//! Scripted fetcher for tests; never touches the network.

use crate::error::FetchError;
use crate::fetch::JsonFetcher;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Replays canned responses per exact URL
///
/// Each URL holds a queue of responses; the last one repeats once the queue
/// is down to a single entry. Unknown URLs answer HTTP 404.
#[derive(Default, Clone)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, Vec<Result<Value, FetchError>>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body for a URL
    pub fn with_json(self, url: impl Into<String>, body: Value) -> Self {
        self.push(url.into(), Ok(body));
        self
    }

    /// Queue a failure for a URL
    pub fn with_error(self, url: impl Into<String>, error: FetchError) -> Self {
        self.push(url.into(), Err(error));
        self
    }

    /// Queue an HTTP status failure for a URL
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        let error = FetchError::Status {
            url: url.clone(),
            status,
        };
        self.push(url, Err(error));
        self
    }

    /// Every URL requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn push(&self, url: String, response: Result<Value, FetchError>) {
        self.responses
            .write()
            .unwrap()
            .entry(url)
            .or_default()
            .push(response);
    }
}

#[async_trait]
impl JsonFetcher for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.write().unwrap().push(url.to_string());

        let mut responses = self.responses.write().unwrap();
        match responses.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
