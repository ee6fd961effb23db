//! tootbot - republish RSS or Nitter feed entries to a Mastodon account
//!
//! `--operation init` provisions credentials once; `--operation toot` runs
//! the publish pipeline a single time and exits, which makes it a good fit
//! for cron.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use libtootbot::config::instance_base_url;
use libtootbot::logging::{LogFormat, LoggingConfig};
use libtootbot::publisher::{self, PublishSettings};
use libtootbot::{credentials, AgeWindow, Config, Result, SourceSpec, TootbotError};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Register the app and store an access token
    Init,
    /// Publish eligible feed entries once
    Toot,
}

#[derive(Parser, Debug)]
#[command(name = "tootbot")]
#[command(version)]
#[command(about = "Republish RSS or Nitter feed entries to Mastodon", long_about = None)]
struct Cli {
    /// What to do
    #[arg(long, value_enum)]
    operation: Operation,

    /// Publishing account name
    #[arg(long)]
    username: String,

    /// Publishing instance, e.g. mastodon.social
    #[arg(long)]
    instance: String,

    /// Twitter handle (read through the gateway) or a feed URL starting with http
    #[arg(long)]
    source: Option<String>,

    /// Only publish entries younger than this many days
    #[arg(long, default_value_t = 1)]
    days: u32,

    /// Tags appended to every post, used verbatim
    #[arg(long, num_args = 1..)]
    tags: Vec<String>,

    /// Only publish entries older than this many days
    #[arg(long, default_value_t = 0)]
    delay: u32,

    /// Configuration file (default: ~/.config/tootbot/config.toml)
    #[arg(long, env = "TOOTBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format (text, json, pretty)
    #[arg(long, env = "TOOTBOT_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "TOOTBOT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(cli.log_format, cli.log_level.clone(), cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.operation {
        Operation::Init => {
            // Provisioning problems are reported but do not fail the command
            if let Err(e) = init(&config, &cli.instance, &cli.username).await {
                eprintln!("Error: {:#}", e);
            }
            Ok(())
        }
        Operation::Toot => toot(&config, cli).await,
    }
}

async fn init(config: &Config, instance: &str, username: &str) -> anyhow::Result<()> {
    let instance_url = instance_base_url(instance);
    let paths = config.credential_paths(instance, username);

    credentials::provision(&instance_url, username, &paths)
        .await
        .with_context(|| format!("Could not set up {} on {}", username, instance_url))?;

    println!(
        "Credentials stored in {} and {}",
        paths.app.display(),
        paths.account.display()
    );
    Ok(())
}

async fn toot(config: &Config, cli: Cli) -> Result<()> {
    let source = cli.source.ok_or_else(|| {
        TootbotError::InvalidInput("--source is required for --operation toot".to_string())
    })?;

    let settings = PublishSettings {
        source: SourceSpec::parse(&source),
        username: cli.username,
        instance: cli.instance,
        window: AgeWindow::new(cli.days, cli.delay),
        tags: cli.tags,
        gateway: config.gateway.base_url().to_string(),
    };

    let report = publisher::toot(config, settings).await?;
    println!("{}", report);

    Ok(())
}
