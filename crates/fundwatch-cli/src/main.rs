//! fundwatch - fund net worth reports and receiver notifications.
//!
//! Run once per invocation (scheduling is left to cron or similar):
//!
//! - `fundwatch report` scrapes the configured funds and writes `records.json`
//! - `fundwatch notify` sends each portal receiver the net worth of its funds
//! - `fundwatch token` resolves a portal token and reports where it came from
//!   (`--clear` drops the cached one)

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fundwatch_core::api::client::build_client;
use fundwatch_core::auth::{CredentialCache, LoginManager, TokenOrigin};
use fundwatch_core::config::{Config, CONFIG_FILE};
use fundwatch_core::notify::LineNotifier;
use fundwatch_core::receivers;
use fundwatch_core::report::{self, RECORDS_FILE, SOURCES_FILE, USER_DATA_FILE};
use fundwatch_core::scraper::FundPageScraper;

/// Subdirectory of the cache dir holding log files
const LOG_DIR: &str = "logs";

#[derive(Parser)]
#[command(name = "fundwatch", version, about)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, short, global = true, env = "FUNDWATCH_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape fund net worth and write the dividend report
    Report {
        #[arg(long, default_value = SOURCES_FILE)]
        sources: PathBuf,
        #[arg(long, default_value = USER_DATA_FILE)]
        user_data: PathBuf,
        #[arg(long, short, default_value = RECORDS_FILE)]
        output: PathBuf,
    },
    /// Notify every portal receiver of its funds' net worth
    Notify,
    /// Resolve a portal token (cached or fresh)
    Token {
        /// Log in even if the cached token is still valid
        #[arg(long, conflicts_with = "clear")]
        refresh: bool,
        /// Remove the cached token without logging in
        #[arg(long)]
        clear: bool,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(cache_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("fundwatch")
        .filename_suffix("log")
        .build(cache_dir.join(LOG_DIR));

    match file_appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            error!(error = %e, "File logging disabled");
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load_with_env(&cli.config)?;
    let _guard = init_tracing(&config.cache_dir());
    info!("fundwatch starting");

    let result = run(cli.command, &config).await;
    if let Err(ref e) = result {
        let message = format!("{:#}", e);
        error!(error = %message, "fundwatch failed");
    }
    result
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let client = build_client()?;

    match command {
        Command::Report {
            sources,
            user_data,
            output,
        } => {
            let scraper = FundPageScraper::new(client);
            let records = report::generate_report(&scraper, &sources, &user_data, &output).await?;
            println!("Wrote {} records to {}", records.len(), output.display());
        }
        Command::Notify => {
            let scraper = FundPageScraper::new(client.clone());
            let notifier = LineNotifier::new(client.clone());
            let summary = receivers::run(config, &client, &scraper, &notifier).await?;
            println!("Notified {} receivers ({} failed)", summary.sent, summary.failed);
        }
        Command::Token { clear: true, .. } => {
            let cache = CredentialCache::new(config.cache_dir());
            cache.clear()?;
            println!("Removed cached token ({})", cache.path().display());
        }
        Command::Token { refresh, .. } => {
            let login = LoginManager::new(
                client,
                &config.portal_server()?,
                config.cache_dir(),
                config.login_credentials(),
            );
            let origin = if refresh {
                login.login().await?;
                TokenOrigin::Login
            } else {
                login.resolve().await?.1
            };
            let source = match origin {
                TokenOrigin::Cache => "cache",
                TokenOrigin::Login => "fresh login",
            };
            println!("Token from {} ({})", source, login.cache().path().display());
        }
    }
    Ok(())
}
