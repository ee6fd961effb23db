//! Core types for Tootbot

use chrono::NaiveDateTime;

/// One item of a syndicated feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Stable identifier (guid / atom id, falling back to the link)
    pub id: String,
    pub title: String,
    /// HTML body (RSS description, Atom summary or content)
    pub summary: String,
    /// Author as published by the feed, e.g. `@bob` or `(@bob)`
    pub author: String,
    /// Publication time, converted to UTC and stripped of its offset
    pub published: NaiveDateTime,
    pub link: String,
}

impl FeedEntry {
    /// Bare account handle of the author: no parentheses, whitespace or `@`
    pub fn author_handle(&self) -> &str {
        self.author
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim()
            .trim_start_matches('@')
    }
}

/// Where entries come from: a literal feed URL or an account on the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Url(String),
    Account(String),
}

impl SourceSpec {
    pub fn parse(specifier: &str) -> Self {
        if specifier.starts_with("http") {
            SourceSpec::Url(specifier.to_string())
        } else {
            SourceSpec::Account(specifier.to_string())
        }
    }

    /// Feed URL to fetch, given the gateway base URL
    pub fn feed_url(&self, gateway: &str) -> String {
        match self {
            SourceSpec::Url(url) => url.clone(),
            SourceSpec::Account(handle) => format!("{}/{}/rss", gateway, handle),
        }
    }

    /// The bound source account, absent for literal feed URLs
    pub fn account(&self) -> Option<&str> {
        match self {
            SourceSpec::Url(_) => None,
            SourceSpec::Account(handle) => Some(handle),
        }
    }

    /// Value stored in the ledger's source column: the specifier as given
    pub fn as_ledger_key(&self) -> &str {
        match self {
            SourceSpec::Url(url) => url,
            SourceSpec::Account(handle) => handle,
        }
    }
}

/// One row of the dedup ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub entry_id: String,
    pub post_id: String,
    pub source_account: String,
    pub publishing_account: String,
    pub publishing_instance: String,
}

/// Text and uploaded media for one post submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    pub text: String,
    pub media_ids: Vec<String>,
}

/// Downloaded media waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// URL the media was fetched from
    pub source_url: String,
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any
    pub mime_type: Option<String>,
}

impl MediaBlob {
    /// File extension to use when staging the blob on disk
    pub fn extension(&self) -> &'static str {
        self.mime_type
            .as_deref()
            .and_then(ImageMimeType::from_mime_str)
            .map(|mime| mime.extension())
            .unwrap_or("bin")
    }
}

/// Image MIME types the gateway serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse a `Content-Type` value, ignoring parameters such as `charset`
    pub fn from_mime_str(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}
