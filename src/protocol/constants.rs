//! AMQP 0-9-1 wire constants
//!
//! Reference: <https://www.rabbitmq.com/resources/specs/amqp0-9-1.pdf>

/// Protocol header sent/expected before any frame traffic.
pub const PROTOCOL_HEADER: [u8; 8] = *b"AMQP\x00\x00\x09\x01";

/// Frame end sentinel byte. Terminates every frame.
pub const FRAME_END: u8 = 0xCE;

/// Frame type octets
pub const FRAME_TYPE_METHOD: u8 = 1;
pub const FRAME_TYPE_HEADER: u8 = 2;
pub const FRAME_TYPE_BODY: u8 = 3;
pub const FRAME_TYPE_HEARTBEAT: u8 = 8;

/// Connection class id. The only class this proxy interprets.
pub const CLASS_CONNECTION: u16 = 10;

/// Connection class method ids
pub const METHOD_START: u16 = 10;
pub const METHOD_START_OK: u16 = 11;
pub const METHOD_TUNE: u16 = 30;
pub const METHOD_TUNE_OK: u16 = 31;
pub const METHOD_OPEN: u16 = 40;
pub const METHOD_OPEN_OK: u16 = 41;
pub const METHOD_CLOSE: u16 = 50;

/// Reply code sent with Connection.Close on authorization/connectivity failures.
pub const REPLY_ACCESS_REFUSED: u16 = 403;

/// Close reason when routing resolution denies the client.
pub const REASON_ACCESS_REFUSED: &str = "ACCESS_REFUSED";

/// Close reason when the backend leg cannot be established.
pub const REASON_CONNECTION_ERROR: &str = "CONNECTION_ERROR";

/// SASL mechanism advertised and accepted.
pub const MECHANISM_PLAIN: &str = "PLAIN";

/// Maximum length of a short string field (1-byte length prefix).
pub const SHORT_STR_MAX: usize = 255;
