//! Best-effort consumption of HTTP response bodies.
//!
//! Drains read a body to its end so the connection can be released cleanly.
//! Mid-read I/O errors are logged and swallowed; the reader is dropped (and
//! therefore closed) on every path.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

const CHUNK_SIZE: usize = 8192;

async fn pump<R>(reader: Option<R>, mut on_chunk: impl FnMut(&[u8]))
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => on_chunk(&chunk[..n]),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "error reading response body");
                break;
            }
        }
    }
}

/// Reads `reader` to its end and returns exactly `size` bytes.
///
/// The first `size` bytes of the stream land in the buffer. A short stream
/// leaves the tail zero-filled; bytes beyond `size` are read and discarded.
/// An absent reader yields a zero-filled buffer.
pub async fn drain_sized<R>(reader: Option<R>, size: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; size];
    let mut filled = 0usize;
    pump(reader, |chunk| {
        if filled < size {
            let take = chunk.len().min(size - filled);
            buf[filled..filled + take].copy_from_slice(&chunk[..take]);
            filled += take;
        }
    })
    .await;
    buf
}

/// Reads `reader` to its end, keeping at most `limit` bytes.
///
/// Used when the body length is not declared up front. Returns the kept
/// bytes and whether anything past `limit` was discarded.
pub async fn drain_capped<R>(reader: Option<R>, limit: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut truncated = false;
    pump(reader, |chunk| {
        let room = limit.saturating_sub(buf.len());
        if chunk.len() > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    })
    .await;
    (buf, truncated)
}

/// Reads `reader` to its end and discards everything.
///
/// Used to clear redirect and error bodies before the next request.
pub async fn drain_discard<R>(reader: Option<R>)
where
    R: AsyncRead + Unpin,
{
    pump(reader, |_| {}).await;
}
