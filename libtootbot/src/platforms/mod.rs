//! Social-service abstraction and implementations
//!
//! The publisher only needs three things from the target service: a session
//! check, media upload and status submission. [`Platform`] captures exactly
//! that so the pipeline can run against [`mock::MockPlatform`] in tests.
//!
//! ```no_run
//! use libtootbot::platforms::{mastodon::MastodonClient, Platform};
//! use libtootbot::types::PublishRequest;
//!
//! # async fn example() -> libtootbot::error::Result<()> {
//! let mut client = MastodonClient::new("https://mastodon.social".to_string(), "token".to_string())?;
//! client.authenticate().await?;
//!
//! let request = PublishRequest { text: "Hello".to_string(), media_ids: vec![] };
//! let post_id = client.post(&request).await?;
//! println!("Posted: {}", post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MediaBlob, PublishRequest};

pub mod mastodon;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Verify the session against the service
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the credentials are
    /// rejected.
    async fn authenticate(&mut self) -> Result<()>;

    /// Upload a media attachment and return its attachment id
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Upload` when the service refuses the file.
    async fn upload_media(&self, media: &MediaBlob) -> Result<String>;

    /// Submit a public, non-sensitive post with no reply target and no
    /// spoiler text, returning the id of the created post
    ///
    /// # Errors
    ///
    /// - `PlatformError::Posting` / `Validation` when the post is rejected
    /// - `PlatformError::Network` / `RateLimit` for transport problems
    /// - `PlatformError::Authentication` when the session is no longer valid
    async fn post(&self, request: &PublishRequest) -> Result<String>;

    /// Lowercase identifier, e.g. "mastodon"
    fn name(&self) -> &str;
}
