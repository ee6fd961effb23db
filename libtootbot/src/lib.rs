//! Tootbot - republish feed entries to Mastodon
//!
//! This library reads an RSS/Atom feed (a literal URL or a Twitter account
//! mirrored through a Nitter gateway), filters entries by age and by a
//! local ledger of what was already posted, and publishes the rest.

pub mod config;
pub mod credentials;
pub mod eligibility;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod ledger;
pub mod logging;
pub mod platforms;
pub mod publisher;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use eligibility::AgeWindow;
pub use error::{Result, TootbotError};
pub use ledger::Ledger;
pub use publisher::{EntryOutcome, PublishSettings, Publisher, RunReport, SkipReason};
pub use types::{FeedEntry, LedgerRecord, PublishRequest, SourceSpec};
