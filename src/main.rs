use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use budgetbuddy::config::{default_config_path, ResolvedConfig};
use budgetbuddy::storage::JsonFileStorage;
use budgetbuddy::sync::{BunqClient, SyncOrchestrator, SyncStats};

#[derive(Parser)]
#[command(name = "budgetbuddy")]
#[command(about = "Personal budget tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync bunq payments into the local store
    Sync {
        /// Account status filter (exact match); overrides the configured one
        #[arg(long)]
        status: Option<String>,
    },
    /// Show current configuration
    Config,
}

fn print_summary(stats: &SyncStats) {
    println!("{}", "=".repeat(50));
    println!("SYNC SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Payments fetched from bunq: {}", stats.fetched);
    println!("New transactions inserted:  {}", stats.inserted);
    println!("Duplicates skipped:         {}", stats.skipped);
    println!("{}", "=".repeat(50));
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Some(Command::Sync { status }) => {
            let client = BunqClient::from_config(&config.bunq)?;
            let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
            let orchestrator =
                SyncOrchestrator::new(client, storage).with_page_size(config.sync.page_size);

            let status = status.unwrap_or_else(|| config.sync.status_filter.clone());
            let stats = orchestrator.sync_all(Some(&status)).await?;
            print_summary(&stats);
        }
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
        }
        None => {
            println!("Budgetbuddy - Personal Budget Tracker");
            println!("=====================================\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  sync      Sync bunq payments into the local store");
            println!("  config    Show current configuration\n");
            println!("Run 'budgetbuddy --help' for more options.");
        }
    }

    Ok(())
}
