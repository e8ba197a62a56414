use chrono::Utc;
use clap::{Parser, Subcommand};
use gigledger::application::engine::MarketplaceEngine;
use gigledger::application::settlement::SettlementScheduler;
use gigledger::config::EngineConfig;
use gigledger::domain::ports::LedgerStoreBox;
use gigledger::infrastructure::clock::{ManualClock, SystemClock};
use gigledger::infrastructure::in_memory::InMemoryLedgerStore;
#[cfg(feature = "storage-rocksdb")]
use gigledger::infrastructure::rocksdb::RocksDbLedgerStore;
use gigledger::infrastructure::tracing_sink::TracingSink;
use gigledger::interfaces::csv::wallet_writer::WalletWriter;
use gigledger::interfaces::script::command_reader::CommandReader;
use gigledger::interfaces::script::replay::Replayer;
use gigledger::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (JSON). Built-in defaults apply when omitted.
    #[arg(long, global = true, env = "GIGLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Replay a JSON-lines command script on a simulated clock and print
    /// every wallet summary as CSV.
    Replay {
        script: PathBuf,

        /// Overrides the configured withdrawal holding window.
        #[arg(long)]
        holding_window_secs: Option<u64>,
    },
    /// Run the settlement scheduler against the store until Ctrl-C.
    Settle {
        /// Overrides the configured sweep interval.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path).into_diagnostic(),
        None => Ok(EngineConfig::default()),
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbLedgerStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
            );
            Ok(Box::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

async fn replay(
    script: PathBuf,
    store: LedgerStoreBox,
    config: EngineConfig,
) -> Result<()> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = MarketplaceEngine::new(store, clock.clone(), Arc::new(TracingSink), config);
    let mut replayer = Replayer::new(Arc::new(engine), clock);

    let file = File::open(script).into_diagnostic()?;
    for command in CommandReader::new(BufReader::new(file)).commands() {
        match command {
            Ok(command) => {
                if let Err(e) = replayer.apply(command).await {
                    warn!(code = e.code(), error = %e, "command rejected");
                }
            }
            Err(e) => warn!(code = e.code(), error = %e, "error reading command"),
        }
    }

    let engine = replayer.engine();
    let mut wallets = Vec::new();
    for freelancer in engine.wallet_ids().await.into_diagnostic()? {
        let summary = engine
            .get_wallet_summary(&freelancer)
            .await
            .into_diagnostic()?;
        wallets.push((freelancer, summary));
    }

    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer
        .write_wallets(wallets.iter().map(|(id, summary)| (id, summary)))
        .into_diagnostic()?;
    Ok(())
}

async fn settle(store: LedgerStoreBox, config: EngineConfig) -> Result<()> {
    let engine = Arc::new(MarketplaceEngine::new(
        store,
        Arc::new(SystemClock),
        Arc::new(TracingSink),
        config,
    ));
    let handle = SettlementScheduler::new(engine).spawn();
    info!("settlement scheduler running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    handle.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = match cli.command {
        Mode::Replay { .. } => "warn",
        Mode::Settle { .. } => "info",
    };
    telemetry::init_tracing(default_directive);

    let mut config = load_config(cli.config)?;
    match &cli.command {
        Mode::Replay {
            holding_window_secs: Some(secs),
            ..
        } => config.holding_window_secs = *secs,
        Mode::Settle {
            interval_secs: Some(secs),
        } => config.settlement_interval_secs = *secs,
        _ => {}
    }
    config.validate().into_diagnostic()?;

    let store = open_store(cli.db_path)?;
    match cli.command {
        Mode::Replay { script, .. } => replay(script, store, config).await,
        Mode::Settle { .. } => settle(store, config).await,
    }
}
