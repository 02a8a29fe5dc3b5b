//! RTCM 3 stream framing
//!
//! This module provides:
//! - CRC-24Q checksum computation
//! - Frame validation and access to the length, payload and checksum fields
//! - Reassembly of frames from an arbitrarily chunked byte stream
//!
//! # Frame Format
//!
//! ```text
//! +--------+-------------------------+-----------------+-----------+
//! | 0xD3   | 6 reserved | 10-bit len | payload (len B) | CRC-24Q   |
//! | 1 byte | 2 bytes                 |                 | 3 bytes BE|
//! +--------+-------------------------+-----------------+-----------+
//! ```
//!
//! The checksum covers everything before it. Frames are never built or
//! altered here, only validated and passed on byte for byte.

pub mod constants;
pub mod crc;
pub mod frame;
pub mod frame_buffer;

pub use crc::crc24q;
pub use frame::Frame;
pub use frame_buffer::{scan, FrameBuffer, Frames, Scan};
