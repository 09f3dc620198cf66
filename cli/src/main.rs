//! Offline driver for the timeline engine
//!
//! Replays captured event streams through the fight state machine and
//! validates duty descriptors without touching the game or the network;
//! `fetch`/`upload` talk to the configured record service endpoints.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raidline")]
#[command(about = "Duty timeline engine driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a duty descriptor JSON file
    Check {
        /// Path to the descriptor
        #[arg(short, long)]
        duty: PathBuf,
    },

    /// Replay a JSONL event capture through the engine
    Replay {
        /// Path to the duty descriptor JSON file
        #[arg(short, long)]
        duty: PathBuf,

        /// Path to the capture, one JSON event per line
        #[arg(short, long)]
        events: PathBuf,

        /// Only print the finalized record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Feed decoded events from stdin through a live engine
    Run,

    /// Fetch a zone's descriptor from the configured endpoints
    Fetch {
        /// Zone id to look up
        #[arg(short, long)]
        zone: u32,
    },

    /// Upload a fight record JSON file to the record service
    Upload {
        /// Path to the record JSON file
        #[arg(short, long)]
        record: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { duty } => commands::check(&duty),
        Commands::Replay { duty, events, json } => commands::replay(&duty, &events, json),
        Commands::Run => commands::run().await,
        Commands::Fetch { zone } => commands::fetch(zone).await,
        Commands::Upload { record } => commands::upload(&record).await,
    }
}
