//! File Server
//!
//! Serves one directory tree read-only over HTTP.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use server::config::{Config, EnvOverride};
use server::logging::init_logging;
use server::{build_router, shutdown_signal, AppState, HttpServer, ServeRoot};
use tokio_util::sync::CancellationToken;

/// File Server - read-only HTTP access to a directory tree.
#[derive(Parser, Debug)]
#[command(name = "file-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root directory to serve
    #[arg(value_name = "DIRECTORY", required_unless_present = "print_config")]
    pub directory: Option<PathBuf>,

    /// Host to bind to (default: 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: 8080)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Overlay command-line values onto the configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(log_file) = &self.log_file {
            config.logging.file = Some(log_file.clone());
        }
    }

    /// Layer defaults, the config file, the environment and the command line.
    fn load_config(&self) -> anyhow::Result<(Config, Vec<EnvOverride>)> {
        let mut config = match &self.config {
            Some(config_path) => Config::load(config_path)?,
            None => Config::load_default()?,
        };
        let overrides = config.apply_env_overrides();
        self.apply_to(&mut config);
        config.validate()?;
        Ok((config, overrides))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        let (config, _) = cli.load_config()?;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Root problems are reported ahead of any config error.
    let directory = cli.directory.as_deref().context("DIRECTORY is required")?;
    let root = match ServeRoot::new(directory) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let (config, overrides) = cli.load_config()?;

    let _log_guard = init_logging(
        &config.logging.level,
        config.logging.file.as_deref(),
        cli.verbose,
    )?;
    for entry in &overrides {
        entry.log();
    }

    let addr = config.bind_addr()?;

    tracing::info!("Starting {}", server::SERVICE_NAME);
    tracing::info!("Serving directory: {}", root.path().display());
    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    }

    let router = build_router(AppState::new(root, config.transfer.chunk_size));
    let server = HttpServer::bind(addr).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    server.serve(router, shutdown).await?;

    Ok(())
}
