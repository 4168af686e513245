//! TCP listener for incoming client connections

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};

use crate::config::Config;
use crate::error::Result;
use crate::routing::RoutingDirectory;

use super::connection::Connection;

/// Listener statistics
#[derive(Debug, Default)]
pub struct ListenerStats {
    /// Total connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub connections_active: AtomicU64,
    /// Connections rejected due to limit
    pub connections_rejected: AtomicU64,
}

/// TCP listener that accepts incoming client connections and spawns one
/// task per connection.
pub struct Listener {
    listener: TcpListener,
    config: Arc<Config>,
    directory: Arc<RoutingDirectory>,
    stats: Arc<ListenerStats>,
    shutdown_rx: broadcast::Receiver<()>,
    /// Connection limit semaphore (None = unlimited)
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(
        config: Arc<Config>,
        directory: Arc<RoutingDirectory>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let addr = format!(
            "{}:{}",
            config.server.listen_address, config.server.listen_port
        );

        let listener = TcpListener::bind(&addr).await?;

        let connection_semaphore = if config.server.max_connections > 0 {
            info!(
                "Listening on {} (max {} connections)",
                addr, config.server.max_connections
            );
            Some(Arc::new(Semaphore::new(config.server.max_connections)))
        } else {
            info!("Listening on {} (unlimited connections)", addr);
            None
        };

        Ok(Self {
            listener,
            config,
            directory,
            stats: Arc::new(ListenerStats::default()),
            shutdown_rx,
            connection_semaphore,
        })
    }

    /// Get listener statistics
    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Get the local address the listener is bound to.
    ///
    /// Useful when binding to port 0 to get an OS-assigned port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until shutdown.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let permit = if let Some(ref semaphore) = self.connection_semaphore {
                                match semaphore.clone().try_acquire_owned() {
                                    Ok(permit) => Some(permit),
                                    Err(_) => {
                                        warn!(
                                            "Connection from {} rejected: max connections ({}) reached",
                                            addr,
                                            self.config.server.max_connections
                                        );
                                        self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                                        drop(stream);
                                        continue;
                                    }
                                }
                            } else {
                                None
                            };

                            debug!("Accepted connection from {}", addr);
                            self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let config = Arc::clone(&self.config);
                            let directory = Arc::clone(&self.directory);
                            let stats = Arc::clone(&self.stats);

                            tokio::spawn(async move {
                                let connection = Connection::new(stream, addr, config, directory);
                                if let Err(e) = connection.handle().await {
                                    warn!("Connection from {} ended with error: {}", addr, e);
                                }
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                drop(permit);
                            });
                        }
                        Err(e) => {
                            warn!("Accept error: {}", e);
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }
        Ok(())
    }
}
