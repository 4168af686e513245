//! Transparent bidirectional relay
//!
//! After both handshake legs succeed the connection pair belongs to the
//! relay: two copy tasks, one per direction, each half-closing its
//! destination when its source ends. The caller gets control back only
//! once both directions have finished.

use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProxyError, Result};

/// Splice two streams together until both directions close.
///
/// Returns the byte counts (a->b, b->a). Bytes pass through unmodified,
/// unbounded in size and duration.
pub async fn splice<A, B>(a: A, b: B) -> Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (a_read, a_write) = split(a);
    let (b_read, b_write) = split(b);

    let a_to_b = tokio::spawn(copy_half(a_read, b_write, "client->backend"));
    let b_to_a = tokio::spawn(copy_half(b_read, a_write, "backend->client"));

    match tokio::try_join!(a_to_b, b_to_a) {
        Ok((sent, received)) => Ok((sent?, received?)),
        Err(e) => Err(ProxyError::Connection(format!("relay task failed: {e}"))),
    }
}

/// Copy one direction until EOF or error, then half-close the destination
/// so the peer observes end-of-stream.
async fn copy_half<R, W>(mut reader: R, mut writer: W, direction: &'static str) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; 8192];
    let mut total = 0u64;

    let result = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("{}: EOF after {} bytes", direction, total);
                break Ok(());
            }
            Ok(n) => n,
            Err(e) => break Err(e),
        };

        if let Err(e) = writer.write_all(&buf[..n]).await {
            break Err(e);
        }
        if let Err(e) = writer.flush().await {
            break Err(e);
        }
        total += n as u64;
        trace!("{}: {} bytes", direction, n);
    };

    // Half-close regardless of how the copy ended.
    let _ = writer.shutdown().await;

    result.map(|_| total)
}
