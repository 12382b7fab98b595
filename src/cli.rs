//! CLI definitions for autoheal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// autoheal CLI.
#[derive(Parser)]
#[command(name = "autoheal")]
#[command(about = "Self-healing browser step runner")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "AUTOHEAL_CONFIG",
        default_value = "config/default.toml",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Execute an instruction file and write its results
    Run {
        /// JSON or YAML instruction file
        instructions: PathBuf,

        /// Results file (default: results.json in the run's artifacts directory)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Browser remote debugging endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Serve the HTTP control surface
    Serve {
        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(long)]
        port: Option<u16>,

        /// Browser remote debugging endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// List actionable elements of the focused browser window
    Elements {
        /// Browser remote debugging endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the configuration
    CheckConfig,
}

impl Commands {
    /// Whether the command writes log files.
    pub(crate) fn logs_to_file(&self) -> bool {
        !matches!(self, Commands::CheckConfig)
    }
}
