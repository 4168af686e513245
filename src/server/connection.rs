//! Per-connection orchestration
//!
//! One task owns the whole lifetime of a client connection: downstream
//! handshake, routing resolution, backend dial, upstream handshake, relay.
//! Failure handling follows the cross-leg contract: routing denials and
//! backend failures are reported to the downstream peer as a 403 Close;
//! transport and credential-extraction failures tear the connection down
//! silently.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::handshake::{DownstreamHandshake, UpstreamHandshake};
use crate::protocol::constants::{
    REASON_ACCESS_REFUSED, REASON_CONNECTION_ERROR, REPLY_ACCESS_REFUSED,
};
use crate::routing::RoutingDirectory;

use super::relay;

/// A single proxied client connection.
pub struct Connection<C = TcpStream> {
    stream: C,
    peer_addr: SocketAddr,
    config: Arc<Config>,
    directory: Arc<RoutingDirectory>,
    id: Uuid,
}

impl<C> Connection<C>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        stream: C,
        peer_addr: SocketAddr,
        config: Arc<Config>,
        directory: Arc<RoutingDirectory>,
    ) -> Self {
        Self {
            stream,
            peer_addr,
            config,
            directory,
            id: Uuid::new_v4(),
        }
    }

    /// Drive the connection from accept to relay teardown.
    pub async fn handle(self) -> Result<()> {
        let Connection {
            stream,
            peer_addr,
            config,
            directory,
            id,
        } = self;

        let handshake_deadline = Duration::from_secs(config.server.handshake_timeout_secs);
        let mut downstream = DownstreamHandshake::new(stream);

        // Downstream leg, part one: header through credential capture.
        // Failures here get no Close; there is nothing safe to say yet.
        let credentials = match timeout(handshake_deadline, downstream.read_preamble(&config.amqp))
            .await
        {
            Err(_) => {
                return Err(ProxyError::Timeout(format!(
                    "client {peer_addr} stalled before Start-Ok"
                )))
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(credentials)) => credentials,
        };
        debug!(
            "connection {}: captured credentials for user {}",
            id,
            credentials.username()
        );

        // Routing decides whether this client may proceed at all.
        let resolved = match directory
            .resolve(credentials.username(), credentials.password())
            .await
        {
            Ok(addr) => addr,
            Err(e) => {
                warn!(
                    "connection {}: routing refused user {}: {}",
                    id,
                    credentials.username(),
                    e
                );
                let _ = downstream
                    .reject(REPLY_ACCESS_REFUSED, REASON_ACCESS_REFUSED)
                    .await;
                return Err(e);
            }
        };

        // With an override configured, resolution is an access check only.
        let backend_addr = match config.routing.backend_override {
            Some(ref fixed) => fixed.clone(),
            None => resolved,
        };

        // Downstream leg, part two: Tune through Open-Ok.
        match timeout(handshake_deadline, downstream.negotiate(&config.amqp)).await {
            Err(_) => {
                return Err(ProxyError::Timeout(format!(
                    "client {peer_addr} stalled during negotiation"
                )))
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(())) => {}
        }
        debug!("connection {}: downstream handshake complete", id);

        // Upstream leg. From here on, failures surface to the client as a
        // protocol-level Close, never a silent drop.
        let connect_deadline = Duration::from_secs(config.server.connect_timeout_secs);
        let backend = match timeout(connect_deadline, TcpStream::connect(&backend_addr)).await {
            Err(_) => {
                let _ = downstream
                    .reject(REPLY_ACCESS_REFUSED, REASON_CONNECTION_ERROR)
                    .await;
                return Err(ProxyError::Timeout(format!(
                    "dial to backend {backend_addr} timed out"
                )));
            }
            Ok(Err(e)) => {
                let _ = downstream
                    .reject(REPLY_ACCESS_REFUSED, REASON_CONNECTION_ERROR)
                    .await;
                return Err(ProxyError::Connection(format!(
                    "failed to dial backend {backend_addr}: {e}"
                )));
            }
            Ok(Ok(backend)) => backend,
        };

        let mut upstream = UpstreamHandshake::new(backend);
        match timeout(
            handshake_deadline,
            upstream.run(&config.service_credentials, &config.amqp),
        )
        .await
        {
            Err(_) => {
                let _ = downstream
                    .reject(REPLY_ACCESS_REFUSED, REASON_CONNECTION_ERROR)
                    .await;
                return Err(ProxyError::Timeout(format!(
                    "backend {backend_addr} stalled during handshake"
                )));
            }
            Ok(Err(e)) => {
                let _ = downstream
                    .reject(REPLY_ACCESS_REFUSED, REASON_CONNECTION_ERROR)
                    .await;
                return Err(e);
            }
            Ok(Ok(())) => {}
        }

        info!(
            "connection {}: handshakes complete for user {}, relaying to {}",
            id,
            credentials.username(),
            backend_addr
        );

        // Both legs succeeded; the pair now belongs to the relay.
        let (sent, received) = relay::splice(downstream.into_inner(), upstream.into_inner()).await?;
        info!(
            "connection {}: session ended ({} bytes up, {} bytes down)",
            id, sent, received
        );
        Ok(())
    }
}
