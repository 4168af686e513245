//! AMQP 0-9-1 wire protocol support
//!
//! Only the Connection class handshake methods are modeled; everything
//! after Open-Ok is relayed untouched.

pub mod constants;
pub mod frame;
pub mod methods;

pub use frame::{encode_frame, read_frame, write_method_frame, Frame, FrameType};
pub use methods::Credentials;
