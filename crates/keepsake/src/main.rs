//! Keepsake CLI - curate a messy photo and video folder into a clean archive.
//!
//! Keepsake deletes corrupt, oversized, low-resolution and near-duplicate
//! media from a folder in place, converts HEIC/WebP and legacy video
//! containers to PNG and MP4, then copies what is left into a
//! `Photos/<year>/<Month>` and `Videos/<year>/<Month>` archive.
//!
//! # Usage
//!
//! ```bash
//! # Curate a folder and copy the result to ~/Memories
//! keepsake curate ~/Downloads/phone-dump
//!
//! # Curate only, and keep a record of every decision
//! keepsake curate ./dump --skip-organize --report decisions.jsonl --report-format jsonl
//!
//! # View configuration
//! keepsake config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Keepsake - curate a photo and video folder into a clean, dated archive.
#[derive(Parser, Debug)]
#[command(name = "keepsake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "KEEPSAKE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean a folder in place, then copy the survivors into a dated archive
    Curate(cli::curate::CurateArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let loaded = cli::load_config(cli.config.as_deref());
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `keepsake config path`."
            );
            keepsake_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Keepsake v{}", keepsake_core::VERSION);

    match cli.command {
        // Curation never runs on fallback defaults.
        Commands::Curate(args) => cli::curate::execute(args, loaded?).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
