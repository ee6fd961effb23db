//! Mock platform implementation for testing
//!
//! Simulates the target service without network access. Behavior is set
//! through [`MockConfig`]; posted requests and uploaded media are kept in
//! shared buffers so tests can inspect them after the platform has been
//! handed to the publisher.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{MediaError, PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{MediaBlob, PublishRequest};

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Whether authentication should succeed
    pub auth_succeeds: bool,

    /// Whether posting should succeed
    pub post_succeeds: bool,

    /// Whether media uploads should succeed
    pub upload_succeeds: bool,

    /// Whether media uploads should fail as if the session had expired
    pub upload_session_expired: bool,

    /// Post texts that should be rejected even when posting succeeds
    pub rejected_texts: Vec<String>,

    /// Error to return on posting failure
    pub post_error: Option<String>,

    /// Number of times authenticate has been called
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Requests that were accepted, in order
    pub posted: Arc<Mutex<Vec<PublishRequest>>>,

    /// Source URLs of uploaded media, in order
    pub uploaded: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            post_succeeds: true,
            upload_succeeds: true,
            upload_session_expired: false,
            rejected_texts: Vec::new(),
            post_error: None,
            auth_call_count: Arc::new(Mutex::new(0)),
            posted: Arc::new(Mutex::new(Vec::new())),
            uploaded: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds, already authenticated
    pub fn success() -> Self {
        let mut platform = Self::new(MockConfig::default());
        platform.authenticated = true;
        platform
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure() -> Self {
        Self::new(MockConfig {
            auth_succeeds: false,
            ..Default::default()
        })
    }

    /// Create a mock platform whose posts are all rejected
    pub fn post_failure(error: &str) -> Self {
        let mut platform = Self::new(MockConfig {
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..Default::default()
        });
        platform.authenticated = true;
        platform
    }

    /// Create a mock platform whose media uploads fail
    pub fn upload_failure() -> Self {
        let mut platform = Self::new(MockConfig {
            upload_succeeds: false,
            ..Default::default()
        });
        platform.authenticated = true;
        platform
    }

    /// Create a mock platform whose session expires before the first upload
    pub fn upload_unauthorized() -> Self {
        let mut platform = Self::new(MockConfig {
            upload_session_expired: true,
            ..Default::default()
        });
        platform.authenticated = true;
        platform
    }

    /// Create a mock platform that rejects posts whose text contains `needle`
    pub fn rejecting(needle: &str) -> Self {
        let mut platform = Self::new(MockConfig {
            rejected_texts: vec![needle.to_string()],
            ..Default::default()
        });
        platform.authenticated = true;
        platform
    }

    pub fn auth_call_count(&self) -> usize {
        *self.config.auth_call_count.lock().unwrap()
    }

    pub fn posted(&self) -> Vec<PublishRequest> {
        self.config.posted.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.config.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self) -> Result<()> {
        *self.config.auth_call_count.lock().unwrap() += 1;

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            Err(PlatformError::Authentication("Mock authentication failed".to_string()).into())
        }
    }

    async fn upload_media(&self, media: &MediaBlob) -> Result<String> {
        if self.config.upload_session_expired {
            return Err(PlatformError::Authentication("HTTP 401 Unauthorized".to_string()).into());
        }
        if !self.config.upload_succeeds {
            return Err(MediaError::Upload(format!("mock refused {}", media.source_url)).into());
        }

        let mut uploaded = self.config.uploaded.lock().unwrap();
        uploaded.push(media.source_url.clone());
        Ok(format!("media-{}", uploaded.len()))
    }

    async fn post(&self, request: &PublishRequest) -> Result<String> {
        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        let rejected = self
            .config
            .rejected_texts
            .iter()
            .any(|needle| request.text.contains(needle.as_str()));

        if !self.config.post_succeeds || rejected {
            let error_msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            return Err(PlatformError::Posting(error_msg).into());
        }

        let mut posted = self.config.posted.lock().unwrap();
        posted.push(request.clone());
        Ok(format!("{}", 100 + posted.len()))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
