//! HTTP access to the feed side: feeds, pictures and shortened links
//!
//! Everything the pipeline reads from the web goes through [`Fetcher`], so the
//! transformer and publisher can be driven by [`mock::MockFetcher`] in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MediaBlob;

pub mod http;

// Available in all builds so integration tests can use it
pub mod mock;

pub use http::HttpFetcher;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download a feed document
    ///
    /// # Errors
    ///
    /// `FeedError::Fetch` when the URL is unreachable or answers with a
    /// non-success status.
    async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>>;

    /// Download a picture together with its reported MIME type
    ///
    /// # Errors
    ///
    /// `MediaError::Fetch` on network failure or a non-success status.
    async fn fetch_media(&self, url: &str) -> Result<MediaBlob>;

    /// Request `url` without following redirects
    ///
    /// Returns the `Location` target when the answer is a 301 or 302, and
    /// `None` for any other status.
    async fn probe_redirect(&self, url: &str) -> Result<Option<String>>;
}
