//! Spread Harvester - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use spread_harvester::config::Config;
use spread_harvester::persistence::SnapshotStore;
use spread_harvester::strategy::{
    static_quote_table, ExecutionCoordinator, LedgerSnapshot, OpportunityScanner, StrategyService,
};
use spread_harvester::venue::{MarketData, MockVenue, PrismClient, QuillClient, VenueAdapter};
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Spread Harvester CLI
#[derive(Parser)]
#[command(name = "spread-harvester")]
#[command(version, about = "Cross-venue spread harvesting on Quill and Prism")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy loop
    Run {
        /// Trade against mock venues instead of real ones
        #[arg(long)]
        paper: bool,
    },

    /// Show positions and receipts from the persisted snapshot
    Status {
        /// Path to the snapshot file (default: from config)
        #[arg(short, long)]
        file: Option<String>,

        /// Show individual receipts
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_tracing() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "spread-harvester.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    guard
}

/// Build the two live venue adapters.
fn live_venues(config: &Config) -> Result<(Arc<dyn VenueAdapter>, Arc<dyn VenueAdapter>)> {
    let prism: Arc<dyn VenueAdapter> = Arc::new(PrismClient::new(&config.prism)?);
    let quill: Arc<dyn VenueAdapter> = Arc::new(QuillClient::new(&config.quill)?);
    Ok((prism, quill))
}

/// Build mock venues with a small static edge so the full pipeline runs.
async fn paper_venues(config: &Config) -> (Arc<dyn VenueAdapter>, Arc<dyn VenueAdapter>) {
    let trade = &config.trade;

    let primary = Arc::new(MockVenue::new("Prism"));
    primary
        .set_market_data(MarketData::available(static_quote_table(
            &trade.symbols,
            &trade.input_values,
            &trade.rough_prices,
            dec!(0),
            true,
        )))
        .await;

    let secondary = Arc::new(MockVenue::new("Quill"));
    secondary
        .set_market_data(MarketData::available(static_quote_table(
            &trade.symbols,
            &trade.input_values,
            &trade.rough_prices,
            dec!(0.01),
            false,
        )))
        .await;

    let primary: Arc<dyn VenueAdapter> = primary;
    let secondary: Arc<dyn VenueAdapter> = secondary;
    (primary, secondary)
}

async fn run(config: Config, paper: bool) -> Result<()> {
    let (primary, secondary) = if paper {
        warn!("Paper mode: trading against mock venues");
        paper_venues(&config).await
    } else {
        live_venues(&config)?
    };

    let scanner = OpportunityScanner::new(
        Arc::clone(&primary),
        Arc::clone(&secondary),
        config.trade.clone(),
    );
    let coordinator = ExecutionCoordinator::new(vec![primary, secondary], &config.execution);
    let store = SnapshotStore::new(&config.persistence.data_file);

    let service =
        StrategyService::init(scanner, coordinator, store, config.trade.cycle_secs).await;

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.notify_one();
        }
    });

    service.run_until_shutdown(shutdown).await;
    Ok(())
}

async fn status(config: Config, file: Option<String>, verbose: bool) -> Result<()> {
    let path = file.unwrap_or(config.persistence.data_file);
    let store = SnapshotStore::new(&path);
    let snapshot: LedgerSnapshot = store.load(LedgerSnapshot::default()).await;

    println!("Snapshot: {path}");
    println!(
        "Positions: {} | Receipts: {}",
        snapshot.positions.len(),
        snapshot.receipts.len()
    );

    for position in snapshot.positions.values() {
        println!(
            "  position {} [{:?}] {} venue leg(s)",
            position.id,
            position.status,
            position.internal_positions.len()
        );
        for internal in &position.internal_positions {
            println!(
                "    {} on {} ({:?}) order {}",
                internal.instrument, internal.venue, internal.status, internal.id
            );
        }
    }

    if verbose {
        let mut receipts: Vec<_> = snapshot.receipts.values().collect();
        receipts.sort_by_key(|r| r.created_at);
        for receipt in receipts {
            println!(
                "  receipt {} [{:?}] at {} - {}",
                receipt.id, receipt.status, receipt.created_at, receipt.description
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;
    config.validate()?;

    match cli.command {
        Some(Commands::Status { file, verbose }) => status(config, file, verbose).await,
        Some(Commands::Run { paper }) => {
            info!("Starting spread harvester");
            run(config, paper).await
        }
        None => {
            info!("Starting spread harvester");
            run(config, false).await
        }
    }
}
