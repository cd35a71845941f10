//! CLI entry point for the GTFS-RT arrival board.
//!
//! Provides subcommands for running the polling board, checking a
//! configuration against the live feeds, and bootstrapping config files for
//! known transit systems.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use gtfs_rt_board::bootstrap::nyc;
use gtfs_rt_board::config::BoardConfig;
use gtfs_rt_board::coordinator::{Coordinator, Snapshot, command_channel};
use gtfs_rt_board::diagnostics::config_entry_diagnostics;
use gtfs_rt_board::entity::{EntityRegistry, subscribe_informed_entities};
use gtfs_rt_board::fetch::{ApiKeyHeader, BasicClient, HttpClient, Throttle, UrlParamKey};
use gtfs_rt_board::hub::RealtimeHub;
use gtfs_rt_board::output::{append_records, board_lines, records_from_snapshot};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_board")]
#[command(about = "Transit arrival board and alert monitor over GTFS-realtime feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling board
    Run {
        /// Path to the board config JSON
        #[arg(short, long)]
        config: String,

        /// CSV file to append per-poll arrival observations to
        #[arg(long)]
        record: Option<String>,

        /// Poll once, print the board, and exit
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Validate a config and verify the configured feeds are reachable
    Check {
        /// Path to the board config JSON
        #[arg(short, long)]
        config: String,
    },
    /// Generate a config file for a named transit system
    Bootstrap {
        /// Transit system to bootstrap
        #[arg(value_enum)]
        feed: BootstrapFeed,

        /// Stops to check for arrivals and alerts
        #[arg(short, long, num_args = 0..)]
        stops: Vec<String>,

        /// Routes to check for alerts
        #[arg(short, long, num_args = 0..)]
        routes: Vec<String>,

        /// API key from the GTFS provider
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        /// Directory of route icons
        #[arg(short = 'i', long)]
        route_icons: Option<String>,

        /// Write the config here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BootstrapFeed {
    NycSubway,
}

type BoardClient = Throttle<Box<dyn HttpClient>>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_board.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_board.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            record,
            once,
        } => {
            run_board(&config, record, once).await?;
        }
        Commands::Check { config } => {
            check_board(&config).await?;
        }
        Commands::Bootstrap {
            feed,
            stops,
            routes,
            api_key,
            route_icons,
            output,
        } => {
            let config = match feed {
                BootstrapFeed::NycSubway => {
                    nyc::subway(&routes, &stops, api_key, route_icons).await
                }
            };
            match output {
                Some(path) => {
                    config.save(&path)?;
                    info!(path = %path, "Config written");
                }
                None => println!("{}", serde_json::to_string_pretty(&config)?),
            }
        }
    }

    Ok(())
}

/// Loads, migrates, and validates a config file. Migrations are persisted
/// back so old files only migrate once.
fn load_config(path: &str) -> Result<BoardConfig> {
    let mut config = BoardConfig::load(path)?;
    if config.migrate()? {
        info!(path = %path, "Config migrated; saving");
        config.save(path)?;
    }
    config.validate()?;
    Ok(config)
}

/// Builds the coordinator stack for a validated config: throttled,
/// API-key-authenticated HTTP client, hub with all configured stops and
/// routes subscribed, coordinator with per-source static intervals.
fn build_coordinator(config: &BoardConfig) -> Coordinator<BoardClient> {
    let auth: Box<dyn HttpClient> = match (&config.api_key, &config.api_key_param) {
        (Some(key), Some(param)) => Box::new(UrlParamKey::new(
            BasicClient::new(),
            param.clone(),
            key.clone(),
        )),
        (key, _) => Box::new(ApiKeyHeader::api_key(BasicClient::new(), key.clone())),
    };
    let client = Throttle::per_second(auth, 1);
    let mut hub = RealtimeHub::new(config.url_endpoints.clone(), client);
    subscribe_informed_entities(&mut hub, config);
    Coordinator::new(hub, config)
}

/// Verifies the configured feeds and loads static data, then either polls
/// once or enters the watch loop, logging the board every poll.
#[tracing::instrument(skip(record, once), fields(config = %config_path))]
async fn run_board(config_path: &str, record: Option<String>, once: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut coordinator = build_coordinator(&config);

    // Fail fast on unreachable feeds before the loop starts.
    coordinator
        .hub()
        .verify()
        .await
        .context("realtime feed verification failed")?;
    coordinator.update_static(false, Utc::now()).await?;

    let (handle, commands) = command_channel();
    let mut registry = EntityRegistry::from_config(&config, &coordinator.schedule(), handle);
    info!(entities = registry.len(), "Entities registered");

    if once {
        let snapshot = coordinator.update_data(Utc::now()).await;
        registry.update_all(&snapshot);
        print_board(&registry, &snapshot, record.as_deref())?;
        return Ok(());
    }

    let initial = Snapshot {
        station_stops: HashMap::new(),
        route_statuses: HashMap::new(),
        schedule: coordinator.schedule(),
        feeds_ok: 0,
        feeds_failed: 0,
        updated_at: Utc::now(),
    };
    let (snapshot_tx, mut snapshot_rx) = watch::channel(initial);
    tokio::spawn(coordinator.run(commands, snapshot_tx));

    while snapshot_rx.changed().await.is_ok() {
        let snapshot = snapshot_rx.borrow_and_update().clone();
        registry.update_all(&snapshot);
        if let Err(e) = print_board(&registry, &snapshot, record.as_deref()) {
            warn!(error = %e, "Failed to record board state");
        }
    }
    Ok(())
}

fn print_board(
    registry: &EntityRegistry,
    snapshot: &Snapshot,
    record: Option<&str>,
) -> Result<()> {
    info!(
        feeds_ok = snapshot.feeds_ok,
        feeds_failed = snapshot.feeds_failed,
        "Board updated"
    );
    for line in board_lines(registry) {
        info!("{line}");
    }
    if let Some(path) = record {
        append_records(path, &records_from_snapshot(snapshot))?;
    }
    Ok(())
}

/// Validates the config, performs one verification poll, and prints
/// diagnostics as JSON.
#[tracing::instrument(fields(config = %config_path))]
async fn check_board(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let mut coordinator = build_coordinator(&config);

    coordinator
        .hub()
        .verify()
        .await
        .context("realtime feed verification failed")?;
    coordinator.update_static(false, Utc::now()).await?;
    let snapshot = coordinator.update_data(Utc::now()).await;

    info!(
        feeds_ok = snapshot.feeds_ok,
        feeds_failed = snapshot.feeds_failed,
        stops = snapshot.station_stops.len(),
        routes = snapshot.route_statuses.len(),
        "Configuration verified"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&config_entry_diagnostics(&config, &coordinator))?
    );
    Ok(())
}
