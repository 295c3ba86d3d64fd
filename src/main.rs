//! pixgate CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use pixgate::commands;
use pixgate::config::{Config, ValidationScope};
use pixgate::constants::DEFAULT_CONFIG_FILE;
use pixgate::logging::init_tracing;

#[derive(Parser)]
#[command(name = "pixgate")]
#[command(about = "Prompt-to-image proxy with object storage and retention sweeping")]
#[command(version)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the generate endpoint and run scheduled sweeps
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Don't schedule retention sweeps in this process
        #[arg(long)]
        no_sweep: bool,
    },
    /// Run one retention sweep and exit
    Sweep,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, no_sweep } => {
            let config = load_config(&cli.config, ValidationScope::Serve)?;
            commands::serve::execute(&config, port, no_sweep).await
        },
        Commands::Sweep => {
            let config = load_config(&cli.config, ValidationScope::Sweep)?;
            commands::sweep::execute(&config).await
        },
        Commands::Validate => commands::validate::execute(&cli.config),
    }
}

/// Load the config, validate the sections `scope` uses, then install
/// logging from it.
fn load_config(path: &Path, scope: ValidationScope) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    let validation = config.validate_for(scope)?;
    init_tracing(&config.logging);

    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }
    Ok(config)
}
