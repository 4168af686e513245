//! Connection-class method payloads
//!
//! Builders for the seven Connection methods this proxy speaks (Start
//! through Open-Ok, plus Close), and extraction of SASL PLAIN credentials
//! from a Start-Ok payload. Every other class and method passes through
//! the relay as opaque bytes.

use zeroize::Zeroizing;

use crate::error::{ProxyError, Result};

use super::constants::*;
use super::frame::{put_empty_table, put_long_str, put_short_str};

/// Credentials captured from a client's Start-Ok.
///
/// The password is zeroized on drop and redacted from Debug output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Composite routing key, `username:password`.
    pub fn route_key(&self) -> String {
        format!("{}:{}", self.username, *self.password)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Parse the leading class-id/method-id pair of a method payload.
pub fn parse_class_method(payload: &[u8]) -> Result<(u16, u16)> {
    if payload.len() < 4 {
        return Err(ProxyError::Protocol(format!(
            "method payload too short: {} bytes",
            payload.len()
        )));
    }
    let class_id = u16::from_be_bytes([payload[0], payload[1]]);
    let method_id = u16::from_be_bytes([payload[2], payload[3]]);
    Ok((class_id, method_id))
}

fn put_class_method(buf: &mut Vec<u8>, method_id: u16) {
    buf.extend_from_slice(&CLASS_CONNECTION.to_be_bytes());
    buf.extend_from_slice(&method_id.to_be_bytes());
}

/// Connection.Start: version 0-9, empty server properties, PLAIN mechanism.
pub fn start(locale: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_START);
    payload.push(0); // version-major
    payload.push(9); // version-minor
    put_empty_table(&mut payload); // server-properties
    put_long_str(&mut payload, MECHANISM_PLAIN.as_bytes());
    put_long_str(&mut payload, locale.as_bytes());
    payload
}

/// Connection.Start-Ok carrying a PLAIN response of `\0username\0password`.
pub fn start_ok(username: &str, password: &str, locale: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_START_OK);
    put_empty_table(&mut payload); // client-properties

    put_short_str(&mut payload, MECHANISM_PLAIN);

    let mut response = Vec::with_capacity(2 + username.len() + password.len());
    response.push(0);
    response.extend_from_slice(username.as_bytes());
    response.push(0);
    response.extend_from_slice(password.as_bytes());
    put_long_str(&mut payload, &response);

    put_short_str(&mut payload, locale);
    payload
}

/// Connection.Tune advertising our limits.
pub fn tune(channel_max: u16, frame_max: u32, heartbeat: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_TUNE);
    payload.extend_from_slice(&channel_max.to_be_bytes());
    payload.extend_from_slice(&frame_max.to_be_bytes());
    payload.extend_from_slice(&heartbeat.to_be_bytes());
    payload
}

/// Connection.Tune-Ok accepting (or overriding downward) the peer's limits.
pub fn tune_ok(channel_max: u16, frame_max: u32, heartbeat: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_TUNE_OK);
    payload.extend_from_slice(&channel_max.to_be_bytes());
    payload.extend_from_slice(&frame_max.to_be_bytes());
    payload.extend_from_slice(&heartbeat.to_be_bytes());
    payload
}

/// Connection.Open for the given virtual host.
pub fn open(vhost: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_OPEN);
    put_short_str(&mut payload, vhost);
    payload.push(0); // reserved-1 (empty short string)
    payload.push(0); // insist = false
    payload
}

/// Connection.Open-Ok.
pub fn open_ok() -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_OPEN_OK);
    payload.push(0); // reserved-1
    payload
}

/// Connection.Close with a reply code and reason.
///
/// The reason is capped at 255 bytes before encoding (short-string limit);
/// the failing class/method fields are zero.
pub fn close(reply_code: u16, reason: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    put_class_method(&mut payload, METHOD_CLOSE);
    payload.extend_from_slice(&reply_code.to_be_bytes());

    let reason = reason.as_bytes();
    let reason = &reason[..reason.len().min(SHORT_STR_MAX)];
    payload.push(reason.len() as u8);
    payload.extend_from_slice(reason);

    payload.extend_from_slice(&0u16.to_be_bytes()); // failing class-id
    payload.extend_from_slice(&0u16.to_be_bytes()); // failing method-id
    payload
}

/// Extract PLAIN credentials from a Start-Ok method payload.
///
/// Locates the PLAIN mechanism marker, then scans forward for a long
/// string whose contents split into at least three NUL-separated segments
/// (authzid, username, password). The authzid is discarded.
pub fn extract_plain_credentials(payload: &[u8]) -> Result<Credentials> {
    let marker = payload
        .windows(MECHANISM_PLAIN.len())
        .position(|w| w == MECHANISM_PLAIN.as_bytes())
        .ok_or_else(|| {
            ProxyError::Auth(format!(
                "no PLAIN mechanism found in payload (dump={})",
                hex::encode(payload)
            ))
        })?;

    let mut off = marker + MECHANISM_PLAIN.len();
    while off + 4 < payload.len() {
        let len =
            u32::from_be_bytes([payload[off], payload[off + 1], payload[off + 2], payload[off + 3]])
                as usize;
        let start = off + 4;
        let end = start + len;
        if end > payload.len() {
            off += 1;
            continue;
        }

        let parts: Vec<&[u8]> = payload[start..end].splitn(3, |&b| b == 0).collect();
        if parts.len() >= 3 {
            let username = std::str::from_utf8(parts[1])
                .map_err(|_| ProxyError::Auth("username is not valid UTF-8".into()))?;
            let password = std::str::from_utf8(parts[2])
                .map_err(|_| ProxyError::Auth("password is not valid UTF-8".into()))?;
            return Ok(Credentials::new(username, password));
        }
        off = end;
    }

    Err(ProxyError::Auth(format!(
        "no SASL response with NUL-separated username/password found (dump={})",
        hex::encode(payload)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_payload_layout() {
        let payload = start("en_US");
        assert_eq!(&payload[0..4], &[0, 10, 0, 10]);
        assert_eq!(&payload[4..6], &[0, 9]); // version 0-9
        assert_eq!(&payload[6..10], &[0, 0, 0, 0]); // empty server-properties
        assert_eq!(&payload[10..14], &[0, 0, 0, 5]); // mechanisms longstr
        assert_eq!(&payload[14..19], b"PLAIN");
    }

    #[test]
    fn test_tune_payload_layout() {
        let payload = tune(1024, 131072, 60);
        assert_eq!(&payload[0..4], &[0, 10, 0, 30]);
        assert_eq!(u16::from_be_bytes([payload[4], payload[5]]), 1024);
        assert_eq!(
            u32::from_be_bytes([payload[6], payload[7], payload[8], payload[9]]),
            131072
        );
        assert_eq!(u16::from_be_bytes([payload[10], payload[11]]), 60);
    }

    #[test]
    fn test_open_payload_layout() {
        let payload = open("/");
        assert_eq!(&payload[0..4], &[0, 10, 0, 40]);
        assert_eq!(payload[4], 1);
        assert_eq!(payload[5], b'/');
        assert_eq!(&payload[6..8], &[0, 0]); // reserved-1 + insist
    }

    #[test]
    fn test_close_payload_layout() {
        let payload = close(403, "ACCESS_REFUSED");
        let (class_id, method_id) = parse_class_method(&payload).unwrap();
        assert_eq!((class_id, method_id), (10, 50));
        assert_eq!(u16::from_be_bytes([payload[4], payload[5]]), 403);
        assert_eq!(payload[6] as usize, "ACCESS_REFUSED".len());
        assert_eq!(&payload[7..21], b"ACCESS_REFUSED");
        // failing class/method are zero
        assert_eq!(&payload[21..25], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_close_reason_truncated_to_255_bytes() {
        let long_reason = "x".repeat(300);
        let payload = close(403, &long_reason);
        assert_eq!(payload[6], 255);
        assert_eq!(&payload[7..262], &long_reason.as_bytes()[..255]);
        // nothing of the reason past 255 bytes
        assert_eq!(payload.len(), 4 + 2 + 1 + 255 + 4);
    }

    #[test]
    fn test_extract_from_built_start_ok() {
        let payload = start_ok("guest", "s3cret", "en_US");
        let creds = extract_plain_credentials(&payload).unwrap();
        assert_eq!(creds.username(), "guest");
        assert_eq!(creds.password(), "s3cret");
        assert_eq!(creds.route_key(), "guest:s3cret");
    }

    #[test]
    fn test_extract_with_authzid() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0, 10, 0, 11]);
        put_empty_table(&mut payload);
        put_short_str(&mut payload, "PLAIN");
        put_long_str(&mut payload, b"admin\0user\0pass");
        put_short_str(&mut payload, "en_US");

        let creds = extract_plain_credentials(&payload).unwrap();
        assert_eq!(creds.username(), "user");
        assert_eq!(creds.password(), "pass");
    }

    #[test]
    fn test_extract_missing_mechanism_fails() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0, 10, 0, 11]);
        put_empty_table(&mut payload);
        put_short_str(&mut payload, "AMQPLAI"); // not PLAIN
        let err = extract_plain_credentials(&payload).unwrap_err();
        assert!(matches!(err, ProxyError::Auth(_)));
    }

    #[test]
    fn test_extract_too_few_segments_fails() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0, 10, 0, 11]);
        put_empty_table(&mut payload);
        put_short_str(&mut payload, "PLAIN");
        put_long_str(&mut payload, b"\0useronly");
        put_short_str(&mut payload, "en_US");

        let err = extract_plain_credentials(&payload).unwrap_err();
        assert!(matches!(err, ProxyError::Auth(_)));
    }

    #[test]
    fn test_extract_password_keeps_embedded_nul() {
        // The third segment is the remainder: embedded NULs stay in the password.
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0, 10, 0, 11]);
        put_empty_table(&mut payload);
        put_short_str(&mut payload, "PLAIN");
        put_long_str(&mut payload, b"\0user\0pa\0ss");
        put_short_str(&mut payload, "en_US");

        let creds = extract_plain_credentials(&payload).unwrap();
        assert_eq!(creds.password(), "pa\0ss");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("user", "hunter2");
        let debug_output = format!("{creds:?}");
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("user"));
    }
}
