//! Dual-role handshake state machine
//!
//! One server-side leg toward the downstream client, one client-side leg
//! toward the resolved backend. The legs run strictly in sequence per
//! connection; routing resolution happens between credential capture and
//! the downstream Tune.

mod downstream;
mod upstream;

pub use downstream::DownstreamHandshake;
pub use upstream::UpstreamHandshake;
