//! amqp-route-proxy - Credential-aware AMQP 0-9-1 intercepting proxy
//!
//! This binary wires the routing directory, the update subscriber, and the
//! listener together and runs until SIGTERM/Ctrl+C.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use amqp_route_proxy::{
    config, ControlPlaneClient, InvalidationSubscriber, Listener, RedisRouteStore, Result,
    RoutingDirectory,
};

#[derive(Parser)]
#[command(name = "amqp-route-proxy")]
#[command(version)]
#[command(about = "Credential-aware AMQP 0-9-1 routing proxy")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Override listen address
    #[arg(long)]
    listen_address: Option<String>,

    /// Override listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: --verbose flag, then RUST_LOG env var, then config default
    let mut config = config::load_config(&cli.config)?;
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone())
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .init();

    info!("Starting amqp-route-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {:?}", cli.config);

    // Apply CLI overrides
    if let Some(addr) = cli.listen_address {
        config.server.listen_address = addr;
    }
    if let Some(port) = cli.listen_port {
        config.server.listen_port = port;
    }

    let config = Arc::new(config);

    // Routing collaborators are constructed once here and shared by
    // reference; nothing initializes lazily behind a global.
    let store = Arc::new(RedisRouteStore::connect(&config.redis.url).await?);
    let control_plane = ControlPlaneClient::new(
        &config.control_plane.base_url,
        &config.control_plane.auth_token,
    );
    let directory = Arc::new(RoutingDirectory::new(store, control_plane));

    let subscriber_client = redis::Client::open(config.redis.url.as_str())?;
    let subscriber = InvalidationSubscriber::new(
        subscriber_client,
        &config.redis.update_channel,
        Arc::clone(&directory),
    );
    let _subscriber_handle = subscriber.spawn_supervised();

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let listener = Listener::bind(Arc::clone(&config), Arc::clone(&directory), shutdown_rx).await?;
    let stats = listener.stats();

    info!(
        "Proxy ready: listening on {}:{} (control plane: {})",
        config.server.listen_address, config.server.listen_port, config.control_plane.base_url
    );

    // Spawn the listener task
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            error!("Listener error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Send shutdown signal
    let _ = shutdown_tx.send(());

    // Wait for listener to finish
    let _ = listener_handle.await;

    info!(
        "Shutdown complete. Total connections handled: {}",
        stats
            .connections_accepted
            .load(std::sync::atomic::Ordering::Relaxed)
    );

    Ok(())
}
