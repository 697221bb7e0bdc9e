//! linekv - An In-Memory Key-Value Database
//!
//! This is the main entry point for the linekv server.
//! It reads configuration, sets up logging, binds the listener and runs the
//! accept loop until Ctrl+C, then drains open connections.

use anyhow::Context;
use clap::Parser;
use linekv::config::{Cli, ServerConfig};
use linekv::server::Server;
use linekv::storage::StorageEngine;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig, addr: std::net::SocketAddr) {
    println!(
        r#"
linekv v{} - In-Memory Key-Value Database
──────────────────────────────────────────────────────────────
Server started on {}
Max connections: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        linekv::VERSION,
        addr,
        config.max_connections
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level '{}'", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let config = cli.server_config()?;

    // Create the storage engine (shared across all connections)
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized");

    let server = Arc::new(Server::new(config.clone(), Arc::clone(&storage)));
    let addr = server.bind().await?;

    print_banner(&config, addr);

    let runner = Arc::clone(&server);
    let accept_loop = tokio::spawn(async move { runner.run().await });

    signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    info!("Shutdown signal received, stopping server...");

    server.stop().await;
    if let Err(e) = accept_loop.await? {
        warn!(error = %e, "Accept loop ended with error");
    }

    let stats = storage.stats();
    info!(
        keys = stats.keys,
        gets = stats.get_ops,
        sets = stats.set_ops,
        dels = stats.del_ops,
        handled = server.clients_handled(),
        discarded = server.clients_discarded(),
        "Server shutdown complete"
    );
    Ok(())
}
