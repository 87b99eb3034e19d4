// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - webhook ingestion and conversation-state synchronization.
//!
//! This is the binary entry point for the Parley service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod serve;

/// Parley - webhook ingestion and conversation-state synchronization.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Path to a specific config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and ingestion pipeline.
    Serve,
    /// Re-run a previously stored delivery by id.
    Reprocess {
        /// The delivery id to re-run.
        delivery_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => parley_config::load_config_from_path(path),
        None => parley_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("parley: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run_serve(config).await,
        Some(Commands::Reprocess { delivery_id }) => {
            serve::run_reprocess(config, &delivery_id).await
        }
    };

    if let Err(e) = result {
        eprintln!("parley: {e}");
        std::process::exit(1);
    }
}
