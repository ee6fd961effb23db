//! In-memory fetcher for tests
//!
//! Responses are registered per URL; unknown URLs fail the same way a
//! 404 would. Every request is recorded for later assertions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{FeedError, MediaError, Result};
use crate::fetcher::Fetcher;
use crate::types::MediaBlob;

#[derive(Default, Clone)]
pub struct MockFetcher {
    feeds: HashMap<String, Vec<u8>>,
    media: HashMap<String, MediaBlob>,
    redirects: HashMap<String, String>,
    failing_probes: Vec<String>,
    /// URLs requested, in order
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.feeds.insert(url.to_string(), body.into());
        self
    }

    pub fn with_media(mut self, url: &str, bytes: &[u8], mime_type: &str) -> Self {
        self.media.insert(
            url.to_string(),
            MediaBlob {
                source_url: url.to_string(),
                bytes: bytes.to_vec(),
                mime_type: Some(mime_type.to_string()),
            },
        );
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Make the redirect probe for `url` fail with a network error
    pub fn with_failing_probe(mut self, url: &str) -> Self {
        self.failing_probes.push(url.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn log(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        self.log(url);
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| FeedError::Fetch(format!("HTTP 404 when fetching {}", url)).into())
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaBlob> {
        self.log(url);
        self.media
            .get(url)
            .cloned()
            .ok_or_else(|| MediaError::Fetch(format!("HTTP 404 when fetching {}", url)).into())
    }

    async fn probe_redirect(&self, url: &str) -> Result<Option<String>> {
        self.log(url);
        if self.failing_probes.iter().any(|u| u == url) {
            return Err(FeedError::Fetch(format!("link probe {}: connection refused", url)).into());
        }
        Ok(self.redirects.get(url).cloned())
    }
}
