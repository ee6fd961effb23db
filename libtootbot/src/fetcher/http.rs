//! reqwest-backed fetcher

use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};

use crate::error::{FeedError, MediaError, Result};
use crate::fetcher::Fetcher;
use crate::types::MediaBlob;

const USER_AGENT: &str = concat!("tootbot/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    /// Follows redirects; used for feeds and pictures
    client: Client,
    /// Never follows redirects; used to resolve short links
    probe: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedError::Fetch(format!("Failed to build HTTP client: {}", e)))?;
        let probe = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| FeedError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, probe })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("Fetching feed from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Fetch(format!("HTTP {} when fetching {}", status, url)).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Fetch(format!("{}: {}", url, e)))?;

        Ok(bytes.to_vec())
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaBlob> {
        tracing::debug!("Fetching media from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Fetch(format!("HTTP {} when fetching {}", status, url)).into());
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Fetch(format!("{}: {}", url, e)))?;

        Ok(MediaBlob {
            source_url: url.to_string(),
            bytes: bytes.to_vec(),
            mime_type,
        })
    }

    async fn probe_redirect(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .probe
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("link probe {}: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::FOUND {
            return Ok(None);
        }

        Ok(response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }
}
