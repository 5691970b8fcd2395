//! Byte-stream primitives shared by every request: send everything, receive exactly N.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{PeerError, Result};

/// Write all of `bytes`, looping over short writes. A write that makes no
/// progress is reported as `PartialSend` with the count that did go out.
pub async fn send_all<W>(w: &mut W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut sent = 0;
    while sent < bytes.len() {
        let n = match w.write(&bytes[sent..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(sent, expected = bytes.len(), error = %e, "send failed");
                return Err(e.into());
            }
        };
        if n == 0 {
            return Err(PeerError::PartialSend {
                sent,
                expected: bytes.len(),
            });
        }
        sent += n;
    }
    w.flush().await?;
    tracing::trace!(bytes = sent, "sent");
    Ok(())
}

/// Fill `buf` completely, summing partial reads. EOF, reset or abort before
/// the buffer is full is `ConnectionClosed`.
pub async fn recv_exact<R>(r: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut received = 0;
    while received < buf.len() {
        let n = match r.read(&mut buf[received..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if closed_by_peer(e.kind()) => {
                tracing::debug!(received, error = %e, "connection dropped during receive");
                0
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Err(PeerError::ConnectionClosed {
                received,
                expected: buf.len(),
            });
        }
        received += n;
    }
    Ok(())
}

fn closed_by_peer(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    matches!(kind, ConnectionReset | ConnectionAborted | UnexpectedEof)
}
