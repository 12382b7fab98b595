//! autoheal - self-healing browser step runner.
//!
//! Main entry point for the CLI and control server.

mod cli;
mod commands;
mod logging;
mod server;

use clap::Parser;
use tracing::warn;

use autoheal_config::{Config, ConfigLoader};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(&cli.config)?;
    config.artifacts.dir = ConfigLoader::expand_dir(&config.artifacts.dir);

    let logs = logging::init_tracing(&config.logging, cli.command.logs_to_file())?;
    if !cli.config.exists() {
        warn!("{} not found, using defaults", cli.config.display());
    }

    match cli.command {
        Commands::Run {
            instructions,
            results,
            endpoint,
        } => {
            with_endpoint(&mut config, endpoint);
            commands::run_file(config, &instructions, results).await
        }
        Commands::Serve {
            host,
            port,
            endpoint,
        } => {
            with_endpoint(&mut config, endpoint);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config, logs).await
        }
        Commands::Elements { endpoint, json } => {
            with_endpoint(&mut config, endpoint);
            commands::list_elements(config, json).await
        }
        Commands::CheckConfig => commands::check_config(&config, &cli.config),
    }
}

fn with_endpoint(config: &mut Config, endpoint: Option<String>) {
    if let Some(endpoint) = endpoint {
        config.browser.endpoint = endpoint;
    }
}
