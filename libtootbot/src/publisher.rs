//! Publish run orchestration
//!
//! For each entry, oldest first: check the ledger, check the age window,
//! transform, post, record. Entry-scoped failures (a picture that cannot be
//! fetched, a post the service rejects) leave the entry unrecorded so the
//! next run retries it; anything else aborts the run.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::config::{instance_base_url, Config};
use crate::credentials;
use crate::eligibility::AgeWindow;
use crate::error::Result;
use crate::feed::FeedReader;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::ledger::Ledger;
use crate::platforms::Platform;
use crate::transform::EntryTransformer;
use crate::types::{FeedEntry, LedgerRecord, SourceSpec};

/// Everything one publish run needs to know, passed in explicitly
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub source: SourceSpec,
    /// Publishing account
    pub username: String,
    /// Publishing instance, as given on the command line
    pub instance: String,
    pub window: AgeWindow,
    pub tags: Vec<String>,
    /// Feed gateway base URL
    pub gateway: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    OutsideWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Skipped(SkipReason),
    Posted { post_id: String },
    Failed { reason: String },
}

/// Counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub posted: usize,
    pub already_processed: usize,
    pub outside_window: usize,
    pub failed: usize,
}

impl RunReport {
    fn add(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Skipped(SkipReason::AlreadyProcessed) => self.already_processed += 1,
            EntryOutcome::Skipped(SkipReason::OutsideWindow) => self.outside_window += 1,
            EntryOutcome::Posted { .. } => self.posted += 1,
            EntryOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.posted + self.already_processed + self.outside_window + self.failed
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} posted, {} already processed, {} outside window, {} failed",
            self.posted, self.already_processed, self.outside_window, self.failed
        )
    }
}

pub struct Publisher<'a> {
    ledger: &'a Ledger,
    platform: &'a dyn Platform,
    fetcher: &'a dyn Fetcher,
    settings: PublishSettings,
}

impl<'a> Publisher<'a> {
    pub fn new(
        ledger: &'a Ledger,
        platform: &'a dyn Platform,
        fetcher: &'a dyn Fetcher,
        settings: PublishSettings,
    ) -> Self {
        Self {
            ledger,
            platform,
            fetcher,
            settings,
        }
    }

    /// Fetch the source feed and publish every eligible entry
    ///
    /// # Errors
    ///
    /// Feed, ledger and authentication failures abort the run.
    pub async fn run(&self, now: NaiveDateTime) -> Result<RunReport> {
        let reader = FeedReader::new(self.fetcher, &self.settings.gateway);
        let (entries, source_account) = reader.fetch(&self.settings.source).await?;

        self.publish_entries(&entries, source_account, now).await
    }

    /// Publish `entries` in the given order
    pub async fn publish_entries(
        &self,
        entries: &[FeedEntry],
        source_account: Option<String>,
        now: NaiveDateTime,
    ) -> Result<RunReport> {
        let transformer = EntryTransformer::new(
            self.fetcher,
            self.platform,
            &self.settings.gateway,
            source_account,
            &self.settings.tags,
        );

        let mut report = RunReport::default();
        for entry in entries {
            let outcome = self.publish_entry(&transformer, entry, now).await?;
            report.add(&outcome);
        }

        info!("Run finished: {}", report);
        Ok(report)
    }

    async fn publish_entry(
        &self,
        transformer: &EntryTransformer<'_>,
        entry: &FeedEntry,
        now: NaiveDateTime,
    ) -> Result<EntryOutcome> {
        let source_key = self.settings.source.as_ledger_key();

        if self
            .ledger
            .is_processed(
                &entry.id,
                source_key,
                &self.settings.username,
                &self.settings.instance,
            )
            .await?
        {
            return Ok(EntryOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        if !self.settings.window.contains(entry.published, now) {
            return Ok(EntryOutcome::Skipped(SkipReason::OutsideWindow));
        }

        let request = match transformer.transform(entry).await {
            Ok(request) => request,
            Err(e) if e.is_entry_scoped() => {
                warn!("Skipping entry {}: {}", entry.id, e);
                return Ok(EntryOutcome::Failed {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let post_id = match self.platform.post(&request).await {
            Ok(post_id) => post_id,
            Err(e) if e.is_entry_scoped() => {
                warn!("Failed to post entry {}: {}", entry.id, e);
                return Ok(EntryOutcome::Failed {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if post_id.is_empty() {
            warn!("Service returned no post id for entry {}", entry.id);
            return Ok(EntryOutcome::Failed {
                reason: "response carried no post id".to_string(),
            });
        }

        self.ledger
            .record(&LedgerRecord {
                entry_id: entry.id.clone(),
                post_id: post_id.clone(),
                source_account: source_key.to_string(),
                publishing_account: self.settings.username.clone(),
                publishing_instance: self.settings.instance.clone(),
            })
            .await?;

        info!("Published entry {} as post {}", entry.id, post_id);
        Ok(EntryOutcome::Posted { post_id })
    }
}

/// Run the whole publish pipeline once against the live services
///
/// Credentials are loaded first so a bad session aborts before anything
/// else is touched.
pub async fn toot(config: &Config, settings: PublishSettings) -> Result<RunReport> {
    let instance_url = instance_base_url(&settings.instance);
    let paths = config.credential_paths(&settings.instance, &settings.username);
    let client = credentials::load(&paths, &instance_url).await?;

    let fetcher = HttpFetcher::new()?;
    let ledger = Ledger::open(&config.storage.database_path()).await?;

    let now = chrono::Local::now().naive_local();
    let result = Publisher::new(&ledger, &client, &fetcher, settings)
        .run(now)
        .await;

    ledger.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::MockFetcher;
    use crate::platforms::mock::MockPlatform;
    use chrono::{NaiveDate, TimeDelta};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn settings(source: &str) -> PublishSettings {
        PublishSettings {
            source: SourceSpec::parse(source),
            username: "alicebot".to_string(),
            instance: "mastodon.social".to_string(),
            window: AgeWindow::new(1, 0),
            tags: vec![],
            gateway: "https://nitter.net".to_string(),
        }
    }

    fn entry(id: &str, hours_old: i64) -> FeedEntry {
        FeedEntry {
            id: id.to_string(),
            title: format!("post {}", id),
            summary: String::new(),
            author: "@alice".to_string(),
            published: now() - TimeDelta::hours(hours_old),
            link: format!("https://nitter.net/alice/status/{}#m", id),
        }
    }

    #[tokio::test]
    async fn test_posts_and_records_eligible_entries() {
        let ledger = Ledger::in_memory().await.unwrap();
        let platform = MockPlatform::success();
        let fetcher = MockFetcher::new();
        let publisher = Publisher::new(&ledger, &platform, &fetcher, settings("alice"));

        let entries = vec![entry("1", 2), entry("2", 30)];
        let report = publisher
            .publish_entries(&entries, Some("alice".to_string()), now())
            .await
            .unwrap();

        assert_eq!(report.posted, 1);
        assert_eq!(report.outside_window, 1);
        assert!(ledger
            .is_processed("1", "alice", "alicebot", "mastodon.social")
            .await
            .unwrap());
        assert!(!ledger
            .is_processed("2", "alice", "alicebot", "mastodon.social")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_rejected_post_is_not_recorded() {
        let ledger = Ledger::in_memory().await.unwrap();
        let platform = MockPlatform::rejecting("post 1");
        let fetcher = MockFetcher::new();
        let publisher = Publisher::new(&ledger, &platform, &fetcher, settings("alice"));

        let entries = vec![entry("1", 2), entry("2", 3)];
        let report = publisher
            .publish_entries(&entries, Some("alice".to_string()), now())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.posted, 1);
        assert!(!ledger
            .is_processed("1", "alice", "alicebot", "mastodon.social")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_aborts_run() {
        let ledger = Ledger::in_memory().await.unwrap();
        // Never authenticated: every post fails with an authentication error
        let platform = MockPlatform::new(Default::default());
        let fetcher = MockFetcher::new();
        let publisher = Publisher::new(&ledger, &platform, &fetcher, settings("alice"));

        let result = publisher
            .publish_entries(&[entry("1", 2)], Some("alice".to_string()), now())
            .await;

        assert_eq!(result.unwrap_err().exit_code(), 2);
    }

    #[tokio::test]
    async fn test_expired_session_during_upload_aborts_run() {
        let ledger = Ledger::in_memory().await.unwrap();
        let platform = MockPlatform::upload_unauthorized();
        let picture = "https://nitter.net/pic/media%2Fa.jpg";
        let fetcher = MockFetcher::new().with_media(picture, b"jpg", "image/jpeg");
        let publisher = Publisher::new(&ledger, &platform, &fetcher, settings("alice"));

        let mut with_picture = entry("1", 3);
        with_picture.summary = format!(r#"<img src="{}" />"#, picture);
        let entries = vec![with_picture, entry("2", 2)];

        let result = publisher
            .publish_entries(&entries, Some("alice".to_string()), now())
            .await;

        assert_eq!(result.unwrap_err().exit_code(), 2);
        assert!(platform.posted().is_empty());
    }

    #[tokio::test]
    async fn test_generic_feed_records_url_as_source() {
        let ledger = Ledger::in_memory().await.unwrap();
        let platform = MockPlatform::success();
        let fetcher = MockFetcher::new();
        let url = "https://blog.example.org/feed.xml";
        let publisher = Publisher::new(&ledger, &platform, &fetcher, settings(url));

        publisher
            .publish_entries(&[entry("1", 2)], None, now())
            .await
            .unwrap();

        let records = ledger.records_for("alicebot", "mastodon.social").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_account, url);
        assert_eq!(records[0].post_id, "101");
    }

    #[test]
    fn test_run_report_display() {
        let report = RunReport {
            posted: 2,
            already_processed: 3,
            outside_window: 1,
            failed: 0,
        };
        assert_eq!(report.total(), 6);
        assert_eq!(
            report.to_string(),
            "2 posted, 3 already processed, 1 outside window, 0 failed"
        );
    }
}
