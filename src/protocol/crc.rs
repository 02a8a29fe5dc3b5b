//! CRC-24Q checksum
//!
//! RTCM 3 protects every frame with the Qualcomm 24-bit CRC: polynomial
//! `0x864CFB`, zero initial value, no reflection and no final XOR. The
//! checksum covers the marker, the length field and the payload, and is
//! transmitted as the last three bytes of the frame, most significant first.

use super::constants::CRC24Q_POLY;

/// Lookup table indexed by the top byte of the running CRC xor the input byte
const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24Q_POLY;
            }
            bit += 1;
        }
        table[i] = crc & 0x00FF_FFFF;
        i += 1;
    }
    table
}

/// Compute the CRC-24Q of `data`
///
/// The result occupies the low 24 bits; the top byte is always zero.
pub fn crc24q(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &byte| {
        let index = ((crc >> 16) as u8 ^ byte) as usize;
        ((crc << 8) & 0x00FF_FFFF) ^ TABLE[index]
    })
}

/// Read a 24-bit big-endian value from the first three bytes of `bytes`
///
/// The caller guarantees at least three bytes are present.
pub fn read_u24(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}
