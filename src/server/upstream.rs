//! Upstream read loop
//!
//! Reads the raw correction stream, reassembles frames and broadcasts each one
//! before reading again, so subscribers see frames in upstream order.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::protocol::FrameBuffer;
use crate::registry::Broadcaster;
use crate::stats::{FrameStats, RelayCounters};

/// Relay every frame from `reader` until it ends
///
/// Returns when the upstream reaches end of stream or a read fails; neither
/// is treated as an error of the relay itself. Broadcast failures are logged
/// and counted, never fatal.
pub async fn relay_frames<R, W>(
    reader: &mut R,
    broadcaster: &Broadcaster<W>,
    read_buffer_size: usize,
    counters: &RelayCounters,
) -> FrameStats
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut frames = FrameBuffer::new();
    let mut block = vec![0u8; read_buffer_size.max(1)];

    loop {
        let n = match reader.read(&mut block).await {
            Ok(0) => {
                tracing::info!("Upstream closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Read error from upstream");
                break;
            }
        };

        frames.push(&block[..n]);

        while let Some(frame) = frames.next_frame() {
            counters.frame_relayed();
            if let Err(e) = broadcaster.broadcast(&frame).await {
                counters.broadcast_failed(e.failures.len());
                tracing::warn!(error = %e, "Unable to send frame to some or all subscribers");
            }
        }
    }

    let stats = frames.stats().clone();
    tracing::info!(
        frames = stats.frames,
        bytes = stats.bytes_received,
        discarded = stats.discarded_bytes,
        checksum_failures = stats.checksum_failures,
        "Upstream relay finished"
    );
    stats
}
