//! Entry transformer: feed entry → post text and uploaded media
//!
//! Steps run in a fixed order:
//!
//! 1. retweet attribution (bound source account only)
//! 2. picture extraction and upload
//! 3. first-link de-shortening
//! 4. trash removal
//! 5. source footer (literal feed URLs only)
//! 6. tag suffix

use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::platforms::Platform;
use crate::types::{FeedEntry, PublishRequest};

static FIRST_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http[^ \x{a0}]*").expect("valid link pattern"));

static TWITTER_PIC_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pic\.twitter\.com[^ \x{a0}]*").expect("valid pic pattern"));

/// Truncation artifacts left by the gateway, including the mis-decoded form
const ELLIPSIS_ARTIFACTS: [&str; 2] = ["\u{a0}\u{2026}", "\u{a0}\u{e2}\u{20ac}\u{a6}"];

pub struct EntryTransformer<'a> {
    fetcher: &'a dyn Fetcher,
    platform: &'a dyn Platform,
    gateway: String,
    picture_pattern: Regex,
    /// Bound source account, `None` for literal feed URLs
    source_account: Option<String>,
    /// Pre-joined tag block, `"\n#a #b"` or empty
    tag_block: String,
}

impl<'a> EntryTransformer<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        platform: &'a dyn Platform,
        gateway: &str,
        source_account: Option<String>,
        tags: &[String],
    ) -> Self {
        let gateway = gateway.trim_end_matches('/').to_string();
        let picture_pattern = Regex::new(&format!(
            r#"{}/pic/[^ \x{{a0}}"]*"#,
            regex::escape(&gateway)
        ))
        .expect("escaped gateway always forms a valid pattern");

        Self {
            fetcher,
            platform,
            gateway,
            picture_pattern,
            source_account,
            tag_block: tag_block(tags),
        }
    }

    /// Produce the post for `entry`
    ///
    /// # Errors
    ///
    /// A picture that cannot be fetched or uploaded fails the whole entry;
    /// no post is made with some of its pictures missing.
    pub async fn transform(&self, entry: &FeedEntry) -> Result<PublishRequest> {
        let mut text = self.attribute_retweet(entry);

        let media_ids = self.upload_pictures(&entry.summary).await?;

        text = self.resolve_first_link(text).await;
        text = remove_trash(&text);

        if self.source_account.is_none() {
            text = format!("{}\nSource: {}\n\n{}", text, entry.author, entry.link);
        }

        text.push_str(&self.tag_block);

        Ok(PublishRequest { text, media_ids })
    }

    /// Prefix entries authored by someone other than the bound account
    pub fn attribute_retweet(&self, entry: &FeedEntry) -> String {
        match &self.source_account {
            Some(account) if !entry.author_handle().eq_ignore_ascii_case(account) => format!(
                "RT {}/{}\n{}",
                self.gateway,
                entry.author_handle(),
                entry.title
            ),
            _ => entry.title.clone(),
        }
    }

    /// Gateway picture URLs in `summary`, in textual order
    pub fn picture_urls<'s>(&self, summary: &'s str) -> Vec<&'s str> {
        self.picture_pattern
            .find_iter(summary)
            .map(|m| m.as_str())
            .collect()
    }

    async fn upload_pictures(&self, summary: &str) -> Result<Vec<String>> {
        let mut media_ids = Vec::new();
        for url in self.picture_urls(summary) {
            let media = self.fetcher.fetch_media(url).await?;
            let media_id = self.platform.upload_media(&media).await?;
            media_ids.push(media_id);
        }
        Ok(media_ids)
    }

    /// Replace the first link with its redirect target, if it redirects
    ///
    /// A failed probe leaves the text as it was.
    async fn resolve_first_link(&self, text: String) -> String {
        let Some(link) = FIRST_LINK.find(&text).map(|m| m.as_str().to_string()) else {
            return text;
        };

        match self.fetcher.probe_redirect(&link).await {
            Ok(Some(target)) => {
                tracing::debug!("Resolved {} -> {}", link, target);
                text.replace(&link, &target)
            }
            Ok(None) => text,
            Err(e) => {
                tracing::warn!("Could not resolve {}: {}", link, e);
                text
            }
        }
    }
}

/// Strip image short links and the gateway's truncation ellipsis
pub fn remove_trash(text: &str) -> String {
    let mut cleaned = match TWITTER_PIC_LINK.find(text) {
        Some(m) => text.replace(m.as_str(), " "),
        None => text.to_string(),
    };

    for artifact in ELLIPSIS_ARTIFACTS {
        cleaned = cleaned.replace(artifact, " ");
    }

    cleaned
}

/// Join tags into the block appended to every post
pub fn tag_block(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!("\n{}", tags.join(" "))
    }
}
