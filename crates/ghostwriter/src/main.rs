// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ghostwriter - answers Telegram conversations with an LLM on a schedule.
//!
//! This is the binary entry point for the Ghostwriter relay.

mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ghostwriter - answers Telegram conversations with an LLM on a schedule.
#[derive(Parser, Debug)]
#[command(name = "ghostwriter", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the relay (default).
    Serve,
    /// Validate configuration and report which backends would be used.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ghostwriter_config::load_and_validate_path(path),
        None => ghostwriter_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ghostwriter_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Check => check::run_check(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
