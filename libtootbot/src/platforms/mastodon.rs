//! Mastodon platform implementation
//!
//! Talks to any server implementing the Mastodon API through the megalodon
//! library.

use async_trait::async_trait;
use megalodon::entities::{StatusVisibility, UploadMedia};
use megalodon::megalodon::{PostStatusInputOptions, PostStatusOutput};
use megalodon::{Megalodon, SNS};
use std::io::Write;

use crate::error::{MediaError, PlatformError, Result, TootbotError};
use crate::platforms::Platform;
use crate::types::{MediaBlob, PublishRequest};

pub struct MastodonClient {
    client: Box<dyn Megalodon + Send + Sync>,

    /// The instance URL (e.g., "https://mastodon.social")
    instance_url: String,
}

impl MastodonClient {
    /// Create a client for `instance_url` authenticated with `access_token`
    ///
    /// No request is made until [`Platform::authenticate`] is called.
    pub fn new(instance_url: String, access_token: String) -> Result<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            None,
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client,
            instance_url,
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Stage a blob on disk; megalodon uploads from a file path
    fn stage(media: &MediaBlob) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("tootbot-media-")
            .suffix(&format!(".{}", media.extension()))
            .tempfile()
            .map_err(|e| MediaError::Upload(format!("Failed to stage media: {}", e)))?;
        file.write_all(&media.bytes)
            .and_then(|_| file.flush())
            .map_err(|e| MediaError::Upload(format!("Failed to stage media: {}", e)))?;
        Ok(file)
    }
}

#[async_trait]
impl Platform for MastodonClient {
    async fn authenticate(&mut self) -> Result<()> {
        self.client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "authenticate"))?;

        Ok(())
    }

    async fn upload_media(&self, media: &MediaBlob) -> Result<String> {
        let staged = Self::stage(media)?;
        let path = staged.path().to_string_lossy().to_string();

        let response = self
            .client
            .upload_media(path, None)
            .await
            .map_err(|e| upload_error(map_megalodon_error(e, "upload media"), &media.source_url))?;

        let media_id = match response.json {
            UploadMedia::Attachment(attachment) => attachment.id,
            UploadMedia::AsyncAttachment(attachment) => attachment.id,
        };

        tracing::debug!(
            "Uploaded {} ({}) as media {}",
            media.source_url,
            media.mime_type.as_deref().unwrap_or("unknown type"),
            media_id
        );
        Ok(media_id)
    }

    async fn post(&self, request: &PublishRequest) -> Result<String> {
        let options = PostStatusInputOptions {
            media_ids: if request.media_ids.is_empty() {
                None
            } else {
                Some(request.media_ids.clone())
            },
            in_reply_to_id: None,
            sensitive: Some(false),
            spoiler_text: None,
            visibility: Some(StatusVisibility::Public),
            ..Default::default()
        };

        let response = self
            .client
            .post_status(request.text.clone(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let post_id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };

        Ok(post_id)
    }

    fn name(&self) -> &str {
        "mastodon"
    }
}

/// An expired session stays an authentication error so the run aborts;
/// anything else only fails the media item.
fn upload_error(error: PlatformError, source_url: &str) -> TootbotError {
    match error {
        PlatformError::Authentication(_) => error.into(),
        other => MediaError::Upload(format!("{}: {}", source_url, other)).into(),
    }
}

/// Map megalodon errors to PlatformError
///
/// - HTTP 401/403 → `Authentication`
/// - HTTP 422 → `Validation`
/// - HTTP 429 → `RateLimit`
/// - HTTP 5xx and connection problems → `Network`
/// - unparseable responses → `Posting`
pub(crate) fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    classify_error_message(&error.to_string(), context)
}

fn classify_error_message(error_str: &str, context: &str) -> PlatformError {
    let error_lower = error_str.to_lowercase();

    match extract_http_status(error_str) {
        Some(401) | Some(403) => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}. \
                    Suggestion: run `tootbot --operation init` again to refresh the stored token.",
            context, error_str
        )),
        Some(422) => PlatformError::Validation(format!(
            "Mastodon validation failed ({}): {}",
            context, error_str
        )),
        Some(429) => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}. \
                    The entry stays unrecorded and is retried on the next run.",
            context, error_str
        )),
        Some(500..=599) => PlatformError::Network(format!(
            "Mastodon server error ({}): {}",
            context, error_str
        )),
        Some(_) => {
            PlatformError::Network(format!("Mastodon HTTP error ({}): {}", context, error_str))
        }
        None => {
            if error_lower.contains("unauthorized")
                || error_lower.contains("forbidden")
                || error_lower.contains("token")
            {
                PlatformError::Authentication(format!(
                    "Mastodon authentication failed ({}): {}",
                    context, error_str
                ))
            } else if error_lower.contains("parse")
                || error_lower.contains("json")
                || error_lower.contains("deserialize")
            {
                PlatformError::Posting(format!(
                    "Mastodon response parse error ({}): {}",
                    context, error_str
                ))
            } else if error_lower.contains("rate limit") || error_lower.contains("too many requests")
            {
                PlatformError::RateLimit(format!(
                    "Mastodon rate limit exceeded ({}): {}",
                    context, error_str
                ))
            } else {
                PlatformError::Network(format!("Mastodon error ({}): {}", context, error_str))
            }
        }
    }
}

/// Extract an HTTP status code from an error message
///
/// Recognizes "HTTP 401", "status 403", "code: 422" and bare "429:" forms.
fn extract_http_status(error_str: &str) -> Option<u16> {
    let prefixes = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in &prefixes {
        if let Some(pos) = error_str.find(prefix) {
            let after_prefix = &error_str[pos + prefix.len()..];
            if let Some(code) = after_prefix
                .get(0..3)
                .and_then(|code_str| code_str.parse::<u16>().ok())
                .filter(|code| (100..=599).contains(code))
            {
                return Some(code);
            }
        }
    }

    let bytes = error_str.as_bytes();
    for (i, window) in bytes.windows(4).enumerate() {
        let is_code = window[..3].iter().all(u8::is_ascii_digit)
            && (window[3] == b':' || window[3] == b' ')
            && (i == 0 || !bytes[i - 1].is_ascii_digit());
        if !is_code {
            continue;
        }
        if let Some(code) = std::str::from_utf8(&window[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .filter(|code| (100..=599).contains(code))
        {
            return Some(code);
        }
    }

    None
}
