//! Mirage server binary.
//!
//! Usage:
//!   mirage --config mirage.yaml [OPTIONS]

use anyhow::Context;
use clap::Parser;
use mirage_http::admin_api::{AdminApiServer, AppState};
use mirage_http::config::Config;
use mirage_http::emulator::Emulator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Mirage - programmable HTTP test double
#[derive(Parser, Debug)]
#[command(name = "mirage")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "MIRAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen host (overrides the config file)
    #[arg(long, env = "MIRAGE_HOST")]
    host: Option<String>,

    /// Listen port (overrides the config file)
    #[arg(short, long, env = "MIRAGE_PORT")]
    port: Option<u16>,

    /// Health and metrics port (overrides the config file)
    #[arg(long, env = "MIRAGE_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Directory of preset response rules (overrides the config file)
    #[arg(long, env = "MIRAGE_PRESETS_DIR")]
    presets_dir: Option<PathBuf>,

    /// Requests kept per request type (overrides the config file)
    #[arg(long, env = "MIRAGE_HISTORY_CAPACITY")]
    history_capacity: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<Config, anyhow::Error> {
        let mut config = match self.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(host) = self.host {
            config.listen.host = host;
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(port) = self.metrics_port {
            config.metrics.port = port;
        }
        if let Some(dir) = self.presets_dir {
            config.presets.directory = Some(dir);
        }
        if let Some(capacity) = self.history_capacity {
            config.history.capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let emulator = Arc::new(Emulator::new(config.history.capacity));

    if let Some(ref dir) = config.presets.directory {
        let loaded = emulator
            .load_presets(dir)
            .context("Failed to load preset responses")?;
        info!("Loaded {} preset responses from {}", loaded, dir.display());
    }

    let server = AdminApiServer::bind(
        config.listen.socket_addr()?,
        AppState {
            emulator: Arc::clone(&emulator),
            uri_override_header: config.uri_override_header.clone(),
        },
    )
    .await
    .context("Failed to bind listener")?;

    let monitoring = AdminApiServer::bind_monitoring(config.metrics_addr()?, server.state())
        .await
        .context("Failed to bind metrics listener")?;
    tokio::spawn(async move {
        if let Err(e) = monitoring.run().await {
            warn!("Metrics listener stopped: {}", e);
        }
    });

    let signal_emulator = Arc::clone(&emulator);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt signal");
                signal_emulator.shutdown();
            }
            Err(e) => warn!("Failed to listen for interrupt signal: {}", e),
        }
    });

    server.run().await
}
