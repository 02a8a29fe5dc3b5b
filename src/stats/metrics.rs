//! Statistics for stream reassembly and frame delivery

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Reassembly statistics, owned by a single [`FrameBuffer`](crate::protocol::FrameBuffer)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Total bytes pushed into the buffer
    pub bytes_received: u64,
    /// Validated frames extracted
    pub frames: u64,
    /// Bytes belonging to validated frames
    pub frame_bytes: u64,
    /// Bytes dropped while resynchronizing
    pub discarded_bytes: u64,
    /// Marker candidates rejected by the checksum
    pub checksum_failures: u64,
}

impl FrameStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of received bytes that ended up in a validated frame
    pub fn efficiency(&self) -> f64 {
        if self.bytes_received > 0 {
            self.frame_bytes as f64 / self.bytes_received as f64
        } else {
            0.0
        }
    }
}

/// Delivery counters shared between the upstream loop and the accept loop
#[derive(Debug)]
pub struct RelayCounters {
    started_at: Instant,
    frames_relayed: AtomicU64,
    broadcast_failures: AtomicU64,
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
}

impl RelayCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_relayed: AtomicU64::new(0),
            broadcast_failures: AtomicU64::new(0),
            connections_accepted: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
        }
    }

    /// Record one frame handed to the broadcaster
    pub fn frame_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record individual subscriber failures from one broadcast
    pub fn broadcast_failed(&self, failures: usize) {
        self.broadcast_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
    }

    /// Record a registered connection
    pub fn connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused connection (duplicate, limit or closed relay)
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot
    pub fn snapshot(&self, subscribers: usize) -> RelayStats {
        RelayStats {
            uptime: self.started_at.elapsed(),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            subscribers,
        }
    }
}

impl Default for RelayCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time relay statistics
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Time since the relay was created
    pub uptime: Duration,
    /// Frames handed to the broadcaster
    pub frames_relayed: u64,
    /// Individual subscriber send failures
    pub broadcast_failures: u64,
    /// Connections registered as subscribers
    pub connections_accepted: u64,
    /// Connections refused
    pub connections_rejected: u64,
    /// Currently registered subscribers
    pub subscribers: usize,
}
