//! Stowage CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod github;
mod handlers;
mod outputs;


use commands::{Commands, LogFormat};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(author, version, about = "S3-backed CI cache", long_about = None)]
struct Cli {
    /// Configuration file with store and compression defaults
    #[arg(long, global = true, env = "STOWAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Restore(args) => handlers::restore(args, &config).await?,
        Commands::Save(args) => handlers::save(args, &config).await?,
    }

    Ok(())
}
