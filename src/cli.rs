//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// adtrack - event tracking and revenue attribution service
#[derive(Parser)]
#[command(name = "adtrack")]
#[command(version)]
#[command(about = "Event tracking, deduplication and revenue attribution service", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Generate an example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Rebuild daily revenue stats for one day from raw events
    Reaggregate {
        /// Day to rebuild (YYYY-MM-DD, UTC)
        #[arg(long)]
        date: String,
    },
}
