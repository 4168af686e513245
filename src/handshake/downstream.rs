//! Server-side handshake leg (client -> proxy)
//!
//! The proxy impersonates an AMQP server just long enough to collect the
//! client's SASL PLAIN credentials, then finishes the negotiation once
//! routing has admitted the connection:
//!
//! 1. Receive protocol header
//! 2. Send Connection.Start
//! 3. Receive Connection.Start-Ok, extract credentials
//!    (caller resolves routing here, rejecting with Close on failure)
//! 4. Send Connection.Tune
//! 5. Receive Connection.Tune-Ok
//! 6. Receive Connection.Open (vhost not validated; single default routing)
//! 7. Send Connection.Open-Ok

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::config::AmqpConfig;
use crate::error::{ProxyError, Result};
use crate::protocol::constants::*;
use crate::protocol::frame::{read_frame, write_method_frame};
use crate::protocol::methods::{self, Credentials};

/// Server-side leg of the handshake, owning the client stream.
pub struct DownstreamHandshake<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> DownstreamHandshake<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Run the leg up to credential capture: header, Start, Start-Ok.
    pub async fn read_preamble(&mut self, amqp: &AmqpConfig) -> Result<Credentials> {
        let mut header = [0u8; 8];
        self.stream.read_exact(&mut header).await?;
        if header != PROTOCOL_HEADER {
            return Err(ProxyError::Protocol(format!(
                "unexpected protocol header: {}",
                hex::encode(header)
            )));
        }
        debug!("client sent protocol header");

        write_method_frame(&mut self.stream, 0, &methods::start(&amqp.locale)).await?;

        let frame = read_frame(&mut self.stream).await?;
        if let Ok((class_id, method_id)) = methods::parse_class_method(&frame.payload) {
            if (class_id, method_id) != (CLASS_CONNECTION, METHOD_START_OK) {
                warn!(
                    "expected Start-Ok ({},{}) got ({},{}); inspecting payload anyway",
                    CLASS_CONNECTION, METHOD_START_OK, class_id, method_id
                );
            }
        }

        methods::extract_plain_credentials(&frame.payload)
    }

    /// Finish the leg after routing admits the client: Tune through Open-Ok.
    pub async fn negotiate(&mut self, amqp: &AmqpConfig) -> Result<()> {
        write_method_frame(
            &mut self.stream,
            0,
            &methods::tune(amqp.channel_max, amqp.frame_max, amqp.heartbeat),
        )
        .await?;

        // Tune-Ok: contents are not interpreted beyond a successful decode.
        let _tune_ok = read_frame(&mut self.stream).await?;
        debug!("client sent Tune-Ok");

        // Open: vhost argument is not validated.
        let _open = read_frame(&mut self.stream).await?;
        debug!("client sent Open");

        write_method_frame(&mut self.stream, 0, &methods::open_ok()).await?;
        Ok(())
    }

    /// Send a Connection.Close with the given reply code and reason.
    pub async fn reject(&mut self, reply_code: u16, reason: &str) -> Result<()> {
        write_method_frame(&mut self.stream, 0, &methods::close(reply_code, reason)).await?;
        info!("sent Connection.Close to client: {} {}", reply_code, reason);
        Ok(())
    }

    /// Hand the stream back once the handshake is done.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
