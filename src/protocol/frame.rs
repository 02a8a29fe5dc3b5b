//! Validated RTCM 3 frame

use bytes::Bytes;

use super::constants::{CHECKSUM_SIZE, HEADER_SIZE};
use super::crc::read_u24;
use super::frame_buffer::{scan, Scan};

/// One complete, checksum-validated frame
///
/// Holds the exact bytes read from upstream (marker, length field, payload
/// and CRC trailer). Cheap to clone: the bytes are reference counted and
/// shared by every delivery task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Wrap bytes that the reassembler already validated
    pub(crate) fn validated(data: Bytes) -> Self {
        Self { data }
    }

    /// Validate `data` as exactly one frame
    ///
    /// Returns `None` unless `data` starts with a frame whose checksum
    /// matches and which spans the whole input.
    pub fn decode(data: Bytes) -> Option<Self> {
        match scan(&data) {
            Scan::Frame { size, .. } if size == data.len() => Some(Self::validated(data)),
            _ => None,
        }
    }

    /// Payload length from the 10-bit length field
    pub fn payload_len(&self) -> usize {
        self.data.len() - HEADER_SIZE - CHECKSUM_SIZE
    }

    /// Payload bytes (between the length field and the trailer)
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_SIZE..self.data.len() - CHECKSUM_SIZE]
    }

    /// The 24-bit checksum carried in the trailer
    pub fn checksum(&self) -> u32 {
        read_u24(&self.data[self.data.len() - CHECKSUM_SIZE..])
    }

    /// Total size on the wire
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame holds no bytes
    ///
    /// Never true for a decoded frame, which carries at least the 3-byte
    /// header and the 3-byte trailer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw frame bytes
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the frame, returning its raw bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
