//! redreader - scheduled feed ingestion daemon
//!
//! ## Commands
//!
//! - `run`: Start the scheduler and ingest until Ctrl-C (default)
//! - `once`: Run a single ingestion cycle and print its summary
//! - `add-feed`: Register a feed
//! - `list-feeds`: Show registered feeds

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use redreader::store::FeedRepository;
use redreader::{
    Config, Database, FeedStore, HttpSyndicationSource, IngestCoordinator, NewFeed, ReaderError,
    Result, Scheduler, SyndicationSource,
};

#[derive(Parser)]
#[command(name = "redreader")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scheduled RSS/Atom and Hacker News ingestion", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion scheduler until interrupted
    Run,

    /// Run one ingestion cycle and exit
    Once,

    /// Register a feed
    AddFeed {
        /// Feed URL
        url: String,

        /// Display title (fetched from the feed when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Feed description
        #[arg(short, long)]
        description: Option<String>,

        /// Mark as a default source
        #[arg(long)]
        default: bool,
    },

    /// List registered feeds
    ListFeeds,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    let command = cli.command.unwrap_or(Commands::Run);
    if matches!(command, Commands::Run) {
        if let Err(e) = redreader::logging::init(&config.logging) {
            eprintln!("Failed to initialize logging: {e}");
            redreader::logging::init_console_only(&config.logging.level);
        }
    } else {
        redreader::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    config.validate()?;
    let db = Database::open(&config.database.path).await?;

    let result = match command {
        Commands::Run => serve(&config, &db).await,
        Commands::Once => once(&config, &db).await,
        Commands::AddFeed {
            url,
            title,
            description,
            default,
        } => add_feed(&config, &db, url, title, description, default).await,
        Commands::ListFeeds => list_feeds(&db).await,
    };

    db.close().await;
    result
}

async fn serve(config: &Config, db: &Database) -> Result<()> {
    info!("redreader starting (database: {})", config.database.path);

    let coordinator = Arc::new(IngestCoordinator::from_config(config, db)?);
    let scheduler = Scheduler::new(coordinator, config.ingest.interval())
        .with_run_on_start(config.ingest.run_on_start);
    scheduler.start()?;

    let signal = tokio::signal::ctrl_c().await;
    info!("Shutting down");
    scheduler.stop().await;

    signal.map_err(ReaderError::Io)
}

async fn once(config: &Config, db: &Database) -> Result<()> {
    let coordinator = IngestCoordinator::from_config(config, db)?;
    let report = coordinator.run_cycle().await?;

    for outcome in report.feeds.iter().chain(report.aggregator.iter()) {
        match &outcome.error {
            Some(e) => println!("{}  error: {}", outcome.url, e),
            None => println!(
                "{}  seen {}, new {}, skipped {}, failed {}",
                outcome.url, outcome.seen, outcome.created, outcome.skipped, outcome.failed
            ),
        }
    }
    println!("{} new articles", report.total_created());
    Ok(())
}

async fn add_feed(
    config: &Config,
    db: &Database,
    url: String,
    title: Option<String>,
    description: Option<String>,
    default: bool,
) -> Result<()> {
    let mut new_feed = NewFeed::new(url);

    match title {
        Some(title) => new_feed = new_feed.with_title(title),
        None => {
            let source = HttpSyndicationSource::new(&config.fetch)?;
            let parsed = source.fetch(&new_feed.url).await?;
            new_feed = new_feed
                .with_title(parsed.title)
                .with_description(parsed.description);
        }
    }
    if let Some(description) = description {
        new_feed = new_feed.with_description(description);
    }
    if default {
        new_feed = new_feed.as_default();
    }

    let feed = FeedRepository::new(db.pool().clone()).create(&new_feed).await?;
    println!("Added feed {} ({})", feed.id, feed.title);
    Ok(())
}

async fn list_feeds(db: &Database) -> Result<()> {
    let feeds = FeedRepository::new(db.pool().clone()).list_all().await?;
    if feeds.is_empty() {
        println!("No feeds registered");
        return Ok(());
    }

    for feed in feeds {
        let fetched = feed
            .last_fetched
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let marker = if feed.is_default { "*" } else { " " };
        println!("{} {}  {}  {}  (last fetched: {})", marker, feed.id, feed.title, feed.url, fetched);
    }
    Ok(())
}
