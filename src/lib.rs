//! amqp-route-proxy - Credential-aware AMQP 0-9-1 intercepting proxy
//!
//! This library provides the core functionality for a proxy that:
//! - Speaks the AMQP server role toward downstream clients long enough to
//!   capture their SASL PLAIN credentials
//! - Resolves credentials to a backend broker through a multi-tier routing
//!   directory (local table, distributed store, control plane)
//! - Speaks the AMQP client role toward the resolved backend with its own
//!   service credentials
//! - Relays all traffic transparently once both handshakes complete

#[macro_use]
mod logging;

pub mod config;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod routing;
pub mod server;

pub use config::Config;
pub use error::{ProxyError, Result};
pub use handshake::{DownstreamHandshake, UpstreamHandshake};
pub use protocol::Credentials;
pub use routing::{
    ControlPlaneClient, InvalidationSubscriber, RedisRouteStore, RouteStore, RouteUpdate,
    RoutingDirectory,
};
pub use server::{Connection, Listener, ListenerStats};
