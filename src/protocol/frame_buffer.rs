//! Frame reassembly from the raw upstream byte stream
//!
//! Upstream reads arrive in arbitrary chunks: a read may end in the middle of
//! a frame, carry several frames, or contain bytes that are not part of any
//! frame at all. [`FrameBuffer`] accumulates the chunks and hands back one
//! validated [`Frame`] at a time.
//!
//! The decision about what to do with the buffered bytes is made by [`scan`],
//! a pure function of the buffer contents:
//!
//! ```text
//!  no marker           -> Garbage(len)      drop everything
//!  marker at n > 0     -> Garbage(n)        drop up to the marker
//!  < 6 bytes           -> Incomplete        wait for more input
//!  < length + 6 bytes  -> Incomplete        wait for more input
//!  CRC mismatch        -> BadChecksum       drop exactly one byte
//!  CRC match           -> Frame             emit length + 6 bytes
//! ```
//!
//! Dropping a single byte on a checksum mismatch (rather than the whole
//! claimed frame) lets the parser recover a genuine frame whose marker sits
//! inside the corrupted region.

use bytes::{Buf, BytesMut};

use super::constants::{
    CHECKSUM_SIZE, FRAME_MARKER, HEADER_SIZE, LENGTH_MASK, MAX_FRAME_SIZE, MIN_FRAME_SIZE,
};
use super::crc::{crc24q, read_u24};
use super::frame::Frame;
use crate::stats::FrameStats;

/// Outcome of inspecting the front of the stream buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A valid frame of `size` bytes starts at offset 0
    Frame {
        /// Total frame size including header and trailer
        size: usize,
        /// Checksum carried (and verified) in the trailer
        checksum: u32,
    },
    /// The first `n` bytes can never start a frame
    Garbage(usize),
    /// A marker at offset 0 was followed by a checksum mismatch
    BadChecksum {
        /// Value found in the trailer
        expected: u32,
        /// Value computed over header and payload
        actual: u32,
    },
    /// More bytes are needed before a decision can be made
    Incomplete,
}

impl Scan {
    /// Number of bytes the caller should remove from the front of the buffer
    pub fn consumed(&self) -> usize {
        match *self {
            Scan::Frame { size, .. } => size,
            Scan::Garbage(n) => n,
            Scan::BadChecksum { .. } => 1,
            Scan::Incomplete => 0,
        }
    }
}

/// Decide what to do with the bytes at the front of `buf`
pub fn scan(buf: &[u8]) -> Scan {
    match buf.iter().position(|&b| b == FRAME_MARKER) {
        None if buf.is_empty() => return Scan::Incomplete,
        None => return Scan::Garbage(buf.len()),
        Some(0) => {}
        Some(n) => return Scan::Garbage(n),
    }

    if buf.len() < MIN_FRAME_SIZE {
        return Scan::Incomplete;
    }

    let length = (u16::from_be_bytes([buf[1], buf[2]]) & LENGTH_MASK) as usize;
    let size = length + MIN_FRAME_SIZE;
    if buf.len() < size {
        return Scan::Incomplete;
    }

    let body = HEADER_SIZE + length;
    let expected = read_u24(&buf[body..body + CHECKSUM_SIZE]);
    let actual = crc24q(&buf[..body]);

    if expected == actual {
        Scan::Frame {
            size,
            checksum: expected,
        }
    } else {
        Scan::BadChecksum { expected, actual }
    }
}

/// Stream buffer that turns upstream reads into validated frames
///
/// The buffer never holds more than one partial frame plus the most recent
/// read: garbage is dropped as soon as it is seen, and a pending frame is at
/// most [`MAX_FRAME_SIZE`] bytes.
pub struct FrameBuffer {
    buffer: BytesMut,
    stats: FrameStats,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::with_capacity(MAX_FRAME_SIZE * 2)
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            stats: FrameStats::default(),
        }
    }

    /// Append newly read bytes
    pub fn push(&mut self, data: &[u8]) {
        self.stats.bytes_received += data.len() as u64;
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next validated frame, if the buffer holds one
    ///
    /// Garbage and spurious markers in front of the frame are discarded.
    /// Returns `None` once the remaining bytes are an incomplete frame (or
    /// nothing at all); those bytes stay buffered for the next read.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let decision = scan(&self.buffer);
            match decision {
                Scan::Frame { size, checksum } => {
                    let frame = Frame::validated(self.buffer.split_to(size).freeze());
                    self.stats.frames += 1;
                    self.stats.frame_bytes += size as u64;
                    tracing::debug!(length = frame.payload_len(), "Frame {:06x}", checksum);
                    return Some(frame);
                }
                Scan::Garbage(n) => {
                    self.stats.discarded_bytes += n as u64;
                    tracing::trace!(bytes = n, "Discarded bytes before frame marker");
                }
                Scan::BadChecksum { expected, actual } => {
                    self.stats.checksum_failures += 1;
                    self.stats.discarded_bytes += 1;
                    tracing::trace!(
                        "Invalid frame checksum: trailer {:06x}, computed {:06x}",
                        expected,
                        actual
                    );
                }
                Scan::Incomplete => return None,
            }
            self.buffer.advance(decision.consumed());
        }
    }

    /// Iterate over every frame currently extractable from the buffer
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { buffer: self }
    }

    /// Number of buffered, not yet consumed bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if no bytes are buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reassembly statistics so far
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of frames extracted from a [`FrameBuffer`]
///
/// Finite: ends as soon as the buffered bytes no longer hold a whole frame.
pub struct Frames<'a> {
    buffer: &'a mut FrameBuffer,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.buffer.next_frame()
    }
}
