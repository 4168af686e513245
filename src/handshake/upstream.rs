//! Client-side handshake leg (proxy -> backend broker)
//!
//! The proxy authenticates to the resolved backend with its own configured
//! service credentials, never the downstream client's:
//!
//! 1. Send protocol header
//! 2. Receive Connection.Start
//! 3. Send Connection.Start-Ok (service credentials)
//! 4. Receive Connection.Tune
//! 5. Send Connection.Tune-Ok (configured limits)
//! 6. Send Connection.Open (configured vhost)
//! 7. Receive Connection.Open-Ok
//!
//! Any failure here must be reported to the downstream peer as a
//! protocol-level Close; that is the caller's job.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::{AmqpConfig, ServiceCredentials};
use crate::error::Result;
use crate::protocol::constants::PROTOCOL_HEADER;
use crate::protocol::frame::{read_frame, write_method_frame};
use crate::protocol::methods;

/// Client-side leg of the handshake, owning the backend stream.
pub struct UpstreamHandshake<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> UpstreamHandshake<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Run the whole leg against the backend.
    pub async fn run(&mut self, service: &ServiceCredentials, amqp: &AmqpConfig) -> Result<()> {
        self.stream.write_all(&PROTOCOL_HEADER).await?;
        self.stream.flush().await?;
        debug!("sent protocol header to backend");

        // Start: the advertised mechanisms are not interpreted; PLAIN is assumed.
        let _start = read_frame(&mut self.stream).await?;
        debug!("backend sent Start");

        write_method_frame(
            &mut self.stream,
            0,
            &methods::start_ok(&service.username, &service.password, &amqp.locale),
        )
        .await?;

        let _tune = read_frame(&mut self.stream).await?;
        debug!("backend sent Tune");

        write_method_frame(
            &mut self.stream,
            0,
            &methods::tune_ok(amqp.channel_max, amqp.frame_max, amqp.heartbeat),
        )
        .await?;

        write_method_frame(&mut self.stream, 0, &methods::open(&amqp.vhost)).await?;

        let _open_ok = read_frame(&mut self.stream).await?;
        debug!("backend sent Open-Ok");

        Ok(())
    }

    /// Hand the stream back once the handshake is done.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use crate::protocol::constants::*;
    use crate::protocol::frame::encode_frame;
    use crate::protocol::FrameType;

    #[tokio::test]
    async fn test_full_upstream_leg() {
        let (proxy_side, mut backend_side) = duplex(4096);
        let service = ServiceCredentials {
            username: "proxy-svc".into(),
            password: "svc-pass".into(),
        };
        let amqp = AmqpConfig::default();

        let task = tokio::spawn(async move {
            let mut hs = UpstreamHandshake::new(proxy_side);
            hs.run(&service, &amqp).await
        });

        let mut header = [0u8; 8];
        backend_side.read_exact(&mut header).await.unwrap();
        assert_eq!(header, PROTOCOL_HEADER);

        backend_side
            .write_all(&encode_frame(FrameType::Method, 0, &methods::start("en_US")))
            .await
            .unwrap();

        let start_ok = read_frame(&mut backend_side).await.unwrap();
        let (class_id, method_id) = methods::parse_class_method(&start_ok.payload).unwrap();
        assert_eq!((class_id, method_id), (CLASS_CONNECTION, METHOD_START_OK));
        // The injected credentials are the service ones.
        let creds = methods::extract_plain_credentials(&start_ok.payload).unwrap();
        assert_eq!(creds.username(), "proxy-svc");
        assert_eq!(creds.password(), "svc-pass");

        backend_side
            .write_all(&encode_frame(
                FrameType::Method,
                0,
                &methods::tune(0, 131072, 0),
            ))
            .await
            .unwrap();

        let tune_ok = read_frame(&mut backend_side).await.unwrap();
        let (class_id, method_id) = methods::parse_class_method(&tune_ok.payload).unwrap();
        assert_eq!((class_id, method_id), (CLASS_CONNECTION, METHOD_TUNE_OK));

        let open = read_frame(&mut backend_side).await.unwrap();
        let (class_id, method_id) = methods::parse_class_method(&open.payload).unwrap();
        assert_eq!((class_id, method_id), (CLASS_CONNECTION, METHOD_OPEN));
        assert_eq!(open.payload[4], 1);
        assert_eq!(open.payload[5], b'/');

        backend_side
            .write_all(&encode_frame(FrameType::Method, 0, &methods::open_ok()))
            .await
            .unwrap();

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_backend_hangup_is_error() {
        let (proxy_side, mut backend_side) = duplex(4096);
        let service = ServiceCredentials {
            username: "svc".into(),
            password: "pw".into(),
        };
        let amqp = AmqpConfig::default();

        let task = tokio::spawn(async move {
            let mut hs = UpstreamHandshake::new(proxy_side);
            hs.run(&service, &amqp).await
        });

        let mut header = [0u8; 8];
        backend_side.read_exact(&mut header).await.unwrap();
        drop(backend_side); // hang up before Start

        assert!(task.await.unwrap().is_err());
    }
}
