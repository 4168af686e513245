//! Listener, per-connection tasks, and the post-handshake relay

mod connection;
mod listener;
pub mod relay;

pub use connection::Connection;
pub use listener::{Listener, ListenerStats};
