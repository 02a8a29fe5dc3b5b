//! RTCM 3 framing constants

/// Preamble byte that starts every RTCM 3 frame
pub const FRAME_MARKER: u8 = 0xD3;

/// Marker byte plus the two length bytes
pub const HEADER_SIZE: usize = 3;

/// Size of the big-endian CRC-24Q trailer
pub const CHECKSUM_SIZE: usize = 3;

/// Smallest possible frame (empty payload)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Only the low 10 bits of the length field carry the payload length
pub const LENGTH_MASK: u16 = 0x03FF;

/// Largest payload the 10-bit length field can describe
pub const MAX_PAYLOAD_SIZE: usize = LENGTH_MASK as usize;

/// Largest possible frame on the wire
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + MIN_FRAME_SIZE;

/// CRC-24Q generator polynomial, including the implicit x^24 term
pub const CRC24Q_POLY: u32 = 0x0186_4CFB;

/// Default number of bytes requested per upstream read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 80 * 1024;
