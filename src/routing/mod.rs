//! Credential-based backend routing
//!
//! Three lookup tiers (local table, distributed store, control plane) and
//! a pub/sub subscriber that keeps the local tier fresh. Every collaborator
//! is constructed explicitly at startup and passed by reference; there are
//! no process-global handles.

mod control_plane;
mod directory;
mod store;
mod subscriber;

pub use control_plane::ControlPlaneClient;
pub use directory::{RouteUpdate, RoutingDirectory};
pub use store::{RedisRouteStore, RouteStore};
pub use subscriber::InvalidationSubscriber;
