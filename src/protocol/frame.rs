//! AMQP frame codec (read/write)
//!
//! A frame on the wire is `[type:1][channel:2 BE][length:4 BE][payload][0xCE]`.
//! This layer enforces that the payload matches the declared length; it does
//! not bound payload size (frame-max is a handshake concern) and it consumes
//! the trailing end octet without checking its value.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProxyError, Result};

use super::constants::*;

/// Frame type octet, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Method,
    Header,
    Body,
    Heartbeat,
}

impl FrameType {
    /// Wire representation of this frame type.
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::Method => FRAME_TYPE_METHOD,
            FrameType::Header => FRAME_TYPE_HEADER,
            FrameType::Body => FRAME_TYPE_BODY,
            FrameType::Heartbeat => FRAME_TYPE_HEARTBEAT,
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ProxyError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            FRAME_TYPE_METHOD => Ok(FrameType::Method),
            FRAME_TYPE_HEADER => Ok(FrameType::Header),
            FRAME_TYPE_BODY => Ok(FrameType::Body),
            FRAME_TYPE_HEARTBEAT => Ok(FrameType::Heartbeat),
            other => Err(ProxyError::Protocol(format!(
                "unknown frame type octet: {other:#04x}"
            ))),
        }
    }
}

/// A decoded frame. Transient: built, written, discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub channel: u16,
    pub payload: Vec<u8>,
}

/// Read one complete frame from the stream.
///
/// Reads exactly 7 header bytes, then `length + 1` bytes (payload plus the
/// end octet). A stream that closes or truncates before the declared length
/// is satisfied yields an I/O error.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
    let mut header = [0u8; 7];
    reader.read_exact(&mut header).await?;

    let frame_type = FrameType::try_from(header[0])?;
    let channel = u16::from_be_bytes([header[1], header[2]]);
    let length = u32::from_be_bytes([header[3], header[4], header[5], header[6]]) as usize;

    // Payload plus the trailing end octet. The octet is consumed here but
    // deliberately not validated.
    let mut body = vec![0u8; length + 1];
    reader.read_exact(&mut body).await?;
    body.truncate(length);

    trace!(
        "frame in: type={:?} channel={} len={}",
        frame_type,
        channel,
        length
    );

    Ok(Frame {
        frame_type,
        channel,
        payload: body,
    })
}

/// Encode a frame into its wire form.
pub fn encode_frame(frame_type: FrameType, channel: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(7 + payload.len() + 1);
    frame.push(frame_type.as_u8());
    frame.extend_from_slice(&channel.to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.push(FRAME_END);
    frame
}

/// Write a method frame carrying the given payload.
pub async fn write_method_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    channel: u16,
    payload: &[u8],
) -> Result<()> {
    let frame = encode_frame(FrameType::Method, channel, payload);
    trace!("frame out: {}", hex::encode(&frame));
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Append a short string (1-byte length prefix). Callers pre-truncate to
/// 255 bytes; this helper does not truncate.
pub fn put_short_str(buf: &mut Vec<u8>, s: &str) {
    debug_assert!(s.len() <= SHORT_STR_MAX);
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

/// Append a long string (4-byte BE length prefix).
pub fn put_long_str(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

/// Append an empty field table (4-byte length prefix over zero bytes).
pub fn put_empty_table(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&0u32.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let payload = vec![0u8, 10, 0, 11, 1, 2, 3, 4];
        let encoded = encode_frame(FrameType::Method, 7, &payload);

        let decoded = read_frame(&mut &encoded[..]).await.unwrap();
        assert_eq!(decoded.frame_type, FrameType::Method);
        assert_eq!(decoded.channel, 7);
        assert_eq!(decoded.payload, payload);
    }

    #[tokio::test]
    async fn test_empty_payload_round_trip() {
        let encoded = encode_frame(FrameType::Heartbeat, 0, &[]);
        assert_eq!(encoded.len(), 8);

        let decoded = read_frame(&mut &encoded[..]).await.unwrap();
        assert_eq!(decoded.frame_type, FrameType::Heartbeat);
        assert!(decoded.payload.is_empty());
    }

    #[tokio::test]
    async fn test_encoded_layout() {
        let encoded = encode_frame(FrameType::Method, 0x0102, &[0xAA, 0xBB]);
        assert_eq!(encoded[0], FRAME_TYPE_METHOD);
        assert_eq!(&encoded[1..3], &[0x01, 0x02]);
        assert_eq!(&encoded[3..7], &[0, 0, 0, 2]);
        assert_eq!(&encoded[7..9], &[0xAA, 0xBB]);
        assert_eq!(encoded[9], FRAME_END);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_error() {
        let encoded = encode_frame(FrameType::Method, 0, &[1, 2, 3, 4, 5]);
        // Cut the stream short of the declared length.
        let short = &encoded[..encoded.len() - 3];
        let err = read_frame(&mut &short[..]).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }

    #[tokio::test]
    async fn test_end_octet_not_validated() {
        let mut encoded = encode_frame(FrameType::Method, 0, &[9, 9]);
        let last = encoded.len() - 1;
        encoded[last] = 0x00;
        // Decode succeeds: the end octet is consumed, not checked.
        let decoded = read_frame(&mut &encoded[..]).await.unwrap();
        assert_eq!(decoded.payload, vec![9, 9]);
    }

    #[tokio::test]
    async fn test_unknown_frame_type_rejected() {
        let mut encoded = encode_frame(FrameType::Method, 0, &[1]);
        encoded[0] = 0x42;
        let err = read_frame(&mut &encoded[..]).await.unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_write_method_frame() {
        let mut out = std::io::Cursor::new(Vec::new());
        write_method_frame(&mut out, 3, &[0xDE, 0xAD]).await.unwrap();
        assert_eq!(
            out.into_inner(),
            encode_frame(FrameType::Method, 3, &[0xDE, 0xAD])
        );
    }

    #[test]
    fn test_string_helpers() {
        let mut buf = Vec::new();
        put_short_str(&mut buf, "PLAIN");
        assert_eq!(buf, [&[5u8][..], b"PLAIN"].concat());

        let mut buf = Vec::new();
        put_long_str(&mut buf, b"hello");
        assert_eq!(buf, [&[0u8, 0, 0, 5][..], b"hello"].concat());

        let mut buf = Vec::new();
        put_empty_table(&mut buf);
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }
}
