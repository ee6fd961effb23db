//! End-to-end publish runs against the mock fetcher and mock platform
//!
//! These tests cover:
//! - oldest-first publishing with retweet attribution and media
//! - idempotent reruns against a persisted ledger
//! - entries that fail (rejected post, missing picture) staying unrecorded
//! - literal feed URLs getting a source footer

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use libtootbot::fetcher::mock::MockFetcher;
use libtootbot::platforms::mock::MockPlatform;
use libtootbot::{AgeWindow, Ledger, PublishSettings, Publisher, RunReport, SourceSpec};
use tempfile::TempDir;

const FEED_URL: &str = "https://nitter.net/alice/rss";
const PICTURE: &str = "https://nitter.net/pic/media%2FFx1.jpg";

/// Newest first, as the gateway serves it
const NITTER_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:dc="http://purl.org/dc/elements/1.1/" version="2.0">
  <channel>
    <title>alice / Twitter</title>
    <link>https://nitter.net/alice</link>
    <item>
      <title>morning update</title>
      <dc:creator>@alice</dc:creator>
      <description><![CDATA[<p>morning update</p><img src="https://nitter.net/pic/media%2FFx1.jpg" style="max-width:250px;" />]]></description>
      <pubDate>Sun, 18 Oct 2026 11:00:00 GMT</pubDate>
      <guid>https://nitter.net/alice/status/3#m</guid>
      <link>https://nitter.net/alice/status/3#m</link>
    </item>
    <item>
      <title>bob says hi</title>
      <dc:creator>@bob</dc:creator>
      <description><![CDATA[<p>bob says hi</p>]]></description>
      <pubDate>Sun, 18 Oct 2026 09:00:00 GMT</pubDate>
      <guid>https://nitter.net/bob/status/2#m</guid>
      <link>https://nitter.net/bob/status/2#m</link>
    </item>
    <item>
      <title>old news</title>
      <dc:creator>@alice</dc:creator>
      <description><![CDATA[<p>old news</p>]]></description>
      <pubDate>Fri, 16 Oct 2026 12:00:00 GMT</pubDate>
      <guid>https://nitter.net/alice/status/1#m</guid>
      <link>https://nitter.net/alice/status/1#m</link>
    </item>
  </channel>
</rss>"#;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn settings(source: &str, tags: &[&str]) -> PublishSettings {
    PublishSettings {
        source: SourceSpec::parse(source),
        username: "alicebot".to_string(),
        instance: "mastodon.social".to_string(),
        window: AgeWindow::new(1, 0),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        gateway: "https://nitter.net".to_string(),
    }
}

fn nitter_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_feed(FEED_URL, NITTER_FEED)
        .with_media(PICTURE, b"\xff\xd8\xff\xe0", "image/jpeg")
}

async fn create_ledger() -> Result<(TempDir, Ledger)> {
    let temp_dir = TempDir::new()?;
    let ledger = Ledger::open(&temp_dir.path().join("tootbot.db")).await?;
    Ok((temp_dir, ledger))
}

#[tokio::test]
async fn test_publishes_oldest_first_with_attribution_and_media() -> Result<()> {
    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = nitter_fetcher();
    let platform = MockPlatform::success();

    let report = Publisher::new(&ledger, &platform, &fetcher, settings("alice", &["#bot"]))
        .run(now())
        .await?;

    assert_eq!(
        report,
        RunReport {
            posted: 2,
            already_processed: 0,
            outside_window: 1,
            failed: 0,
        }
    );

    let posted = platform.posted();
    assert_eq!(posted.len(), 2);
    assert_eq!(posted[0].text, "RT https://nitter.net/bob\nbob says hi\n#bot");
    assert!(posted[0].media_ids.is_empty());
    assert_eq!(posted[1].text, "morning update\n#bot");
    assert_eq!(posted[1].media_ids, vec!["media-1"]);
    assert_eq!(platform.uploaded(), vec![PICTURE]);

    let records = ledger.records_for("alicebot", "mastodon.social").await?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.source_account == "alice"));

    Ok(())
}

#[tokio::test]
async fn test_second_run_posts_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("tootbot.db");
    let fetcher = nitter_fetcher();

    let ledger = Ledger::open(&db_path).await?;
    let first = MockPlatform::success();
    Publisher::new(&ledger, &first, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;
    ledger.close().await;

    // Fresh connection, same file
    let ledger = Ledger::open(&db_path).await?;
    let second = MockPlatform::success();
    let report = Publisher::new(&ledger, &second, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;

    assert_eq!(report.posted, 0);
    assert_eq!(report.already_processed, 2);
    assert_eq!(report.outside_window, 1);
    assert!(second.posted().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_other_publishing_account_is_not_deduplicated() -> Result<()> {
    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = nitter_fetcher();

    let platform = MockPlatform::success();
    Publisher::new(&ledger, &platform, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;

    let mut other = settings("alice", &[]);
    other.username = "mirrorbot".to_string();
    let platform = MockPlatform::success();
    let report = Publisher::new(&ledger, &platform, &fetcher, other)
        .run(now())
        .await?;

    assert_eq!(report.posted, 2);

    Ok(())
}

#[tokio::test]
async fn test_rejected_post_is_retried_next_run() -> Result<()> {
    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = nitter_fetcher();

    let platform = MockPlatform::rejecting("bob says hi");
    let report = Publisher::new(&ledger, &platform, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;
    assert_eq!(report.failed, 1);
    assert_eq!(report.posted, 1);

    let platform = MockPlatform::success();
    let report = Publisher::new(&ledger, &platform, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;
    assert_eq!(report.posted, 1);
    assert_eq!(report.already_processed, 1);
    assert!(platform.posted()[0].text.contains("bob says hi"));

    Ok(())
}

#[tokio::test]
async fn test_missing_picture_skips_entry_and_run_continues() -> Result<()> {
    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = MockFetcher::new().with_feed(FEED_URL, NITTER_FEED);
    let platform = MockPlatform::success();

    let report = Publisher::new(&ledger, &platform, &fetcher, settings("alice", &[]))
        .run(now())
        .await?;

    assert_eq!(report.posted, 1);
    assert_eq!(report.failed, 1);
    assert!(platform.uploaded().is_empty());
    assert!(
        !ledger
            .is_processed(
                "https://nitter.net/alice/status/3#m",
                "alice",
                "alicebot",
                "mastodon.social"
            )
            .await?
    );

    Ok(())
}

#[tokio::test]
async fn test_unreachable_feed_aborts_run() -> Result<()> {
    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = MockFetcher::new();
    let platform = MockPlatform::success();

    let result = Publisher::new(&ledger, &platform, &fetcher, settings("alice", &[]))
        .run(now())
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("404"));
    assert!(platform.posted().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_literal_feed_url_gets_source_footer() -> Result<()> {
    const BLOG_FEED: &str = "https://blog.example.org/atom.xml";
    let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example blog</title>
  <entry>
    <title>Release 2.0</title>
    <id>tag:blog.example.org,2026:release-2</id>
    <link rel="alternate" href="https://blog.example.org/release-2"/>
    <author><name>Carol</name></author>
    <published>2026-10-18T08:30:00Z</published>
    <summary>Everything is new.</summary>
  </entry>
</feed>"#;

    let (_temp_dir, ledger) = create_ledger().await?;
    let fetcher = MockFetcher::new().with_feed(BLOG_FEED, atom);
    let platform = MockPlatform::success();

    let report = Publisher::new(
        &ledger,
        &platform,
        &fetcher,
        settings(BLOG_FEED, &["#release", "#example"]),
    )
    .run(now())
    .await?;

    assert_eq!(report.posted, 1);
    assert_eq!(
        platform.posted()[0].text,
        "Release 2.0\nSource: Carol\n\nhttps://blog.example.org/release-2\n#release #example"
    );

    let records = ledger.records_for("alicebot", "mastodon.social").await?;
    assert_eq!(records[0].source_account, BLOG_FEED);
    assert_eq!(records[0].entry_id, "tag:blog.example.org,2026:release-2");

    Ok(())
}
