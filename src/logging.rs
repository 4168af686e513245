//! Logging macros that set target to "amqp_route_proxy" for all log calls.
//!
//! Without an explicit target, tracing uses the full module path
//! (e.g., "amqp_route_proxy::routing::directory"), so operators would have
//! to enumerate modules in RUST_LOG. These macros keep every log line under
//! a single "amqp_route_proxy" target so `RUST_LOG=amqp_route_proxy=debug`
//! covers the whole proxy.

macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "amqp_route_proxy", $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "amqp_route_proxy", $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!(target: "amqp_route_proxy", $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!(target: "amqp_route_proxy", $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!(target: "amqp_route_proxy", $($arg)*) };
}
