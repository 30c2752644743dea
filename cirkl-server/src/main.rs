use std::sync::Arc;

use clap::Parser;
use cirkl_core::CirklConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use cirkl_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config file; defaults apply when it does not exist
    #[arg(short, long, default_value = "cirkl.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience, production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match CirklConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    tracing::info!(
        service = %config.service.name,
        addr = %config.http.bind_addr(),
        "Starting"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState::new(config));
    http::start_http_server(Arc::clone(&state), tx.subscribe()).await?;

    tracing::info!(
        users = state.store.user_count().unwrap_or(0),
        connections = state.store.total_connections().unwrap_or(0),
        "In-memory connections discarded on exit"
    );

    Ok(())
}
