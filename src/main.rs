//! CLI entry point for the GBFS zone counter.
//!
//! Provides subcommands for running a single refresh cycle, refreshing on an
//! interval, and checking what each configured feed publishes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gbfs_zones::{
    Engine,
    config::EngineConfig,
    discovery::discover,
    fetch::{BasicClient, QueryParams},
    output::{log_summary, print_json, print_pretty},
    zones::ZoneIndex,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gbfs_zones")]
#[command(about = "Count GBFS vehicles and stations per zone", long_about = None)]
struct Cli {
    /// Feed and zone configuration file
    #[arg(short, long, global = true, default_value = "config/feeds.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle and log the zone table
    Refresh {
        /// Also log the full snapshot as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Refresh repeatedly on a fixed interval
    Watch {
        /// Seconds between the start of one cycle and the next
        #[arg(short, long, default_value_t = 60)]
        interval: u64,

        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        cycles: usize,
    },
    /// Resolve every feed's gbfs.json and list the sub-feeds it publishes
    Discover,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gbfs_zones.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gbfs_zones.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(&cli.config)?;
    info!(
        config = %cli.config,
        feeds = config.feeds.len(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Refresh { json } => {
            let engine = build_engine(config)?;
            let snapshot = engine.refresh().await?;

            log_summary(&snapshot);
            print_pretty(&snapshot);
            if json {
                print_json(&snapshot)?;
            }
        }
        Commands::Watch { interval, cycles } => {
            watch(build_engine(config)?, interval, cycles).await;
        }
        Commands::Discover => {
            let client = BasicClient::with_timeout(config.fetch_timeout())?;

            for feed in &config.feeds {
                let client = QueryParams::new(&client, &feed.url_params);
                match discover(&client, feed, config.fetch_timeout()).await {
                    Ok(urls) => {
                        info!(feed = %feed.name, resolved = urls.len(), "Feed discovered");
                        for (logical, url) in urls.iter() {
                            info!(feed = %feed.name, sub_feed = logical, url, "Sub-feed");
                        }
                    }
                    Err(e) => error!(feed = %feed.name, error = %e, "Feed discovery failed"),
                }
            }
        }
    }

    Ok(())
}

/// Loads the zones and wires an engine over a real HTTP client.
fn build_engine(config: EngineConfig) -> Result<Engine<BasicClient>> {
    let zones = ZoneIndex::load(&config.zones)?;
    let client = BasicClient::with_timeout(config.fetch_timeout())?;
    Ok(Engine::new(config, zones, client))
}

/// Refreshes every `interval` seconds until `cycles` have run (0 = forever).
#[tracing::instrument(skip(engine))]
async fn watch(engine: Engine<BasicClient>, interval: u64, cycles: usize) {
    if cycles == 0 {
        info!(interval, "Refreshing indefinitely. Press Ctrl+C to stop.");
    }

    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(interval.max(1)));
    let mut completed = 0;

    loop {
        if cycles > 0 && completed >= cycles {
            break;
        }
        ticker.tick().await;

        match engine.refresh().await {
            Ok(snapshot) => log_summary(&snapshot),
            Err(e) => error!(error = %e, "Refresh skipped"),
        }
        completed += 1;
    }

    info!(completed, "Finished refreshing");
}
