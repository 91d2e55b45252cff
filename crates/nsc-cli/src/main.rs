mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{config_path, load_config, NscConfig};
use nsc_core::sync_contracts::{triage_treatments, BatchHandle};
use nsc_storage::TreatmentStore;
use nsc_sync::{RemovalPorts, RemovalWorker};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nsc")]
#[command(about = "Apply Nightscout treatment removals to the local store", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, env = "NSC_CONFIG_PATH")]
    config: Option<PathBuf>,
    /// SQLite database, overrides the config file
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a downloaded treatments array and park its removals as a batch
    Enqueue { file: PathBuf },
    /// Run the removal worker for a parked batch
    Remove {
        handle: i64,
        /// Treat this install as an NSClient build for this run
        #[arg(long, default_value_t = false)]
        nsclient: bool,
    },
    /// Print the audit trail
    Entries,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = load_config(&config_path(cli.config.as_deref()))?;
    if let Some(db) = cli.db.clone() {
        config.database_path = Some(db);
    }
    init_logging(cli.debug, &config);

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store = TreatmentStore::open(&db_path)
        .with_context(|| format!("failed to open store {}", db_path.display()))?;

    match cli.command {
        Commands::Enqueue { file } => enqueue(&store, &config, file),
        Commands::Remove { handle, nsclient } => {
            let mut policy = config.acceptance;
            policy.nsclient_build |= nsclient;
            let run =
                RemovalWorker::new(RemovalPorts::from_store(&policy, &store)).run(BatchHandle(handle));
            println!("{}", serde_json::to_string_pretty(&run)?);
            Ok(if run.outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Entries => {
            for entry in store.user_entries()? {
                println!("{}", serde_json::to_string(&entry)?);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn enqueue(store: &TreatmentStore, config: &NscConfig, file: PathBuf) -> Result<ExitCode> {
    let content = fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let treatments: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let triage = triage_treatments(&treatments, Utc::now(), config.removal_window()?);
    let handle = if triage.removed.is_empty() {
        None
    } else {
        Some(store.store_batch(&triage.removed)?)
    };
    info!(
        event = "treatments_triaged",
        received = treatments.len(),
        removed = triage.removed.len(),
        added_or_updated = triage.added_or_updated.len(),
    );

    println!(
        "{}",
        json!({
            "handle": handle,
            "removed": triage.removed.len(),
            "added_or_updated": triage.added_or_updated.len(),
        })
    );
    Ok(ExitCode::SUCCESS)
}

fn init_logging(debug: bool, config: &NscConfig) {
    let level = if debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("NSC_LOG_LEVEL") {
        level
    } else {
        config
            .log_level
            .clone()
            .unwrap_or_else(|| "info".to_string())
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("nsc: logging already initialized");
    }
}
