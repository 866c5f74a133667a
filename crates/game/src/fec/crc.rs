//! CRC-32 over the generator polynomial `0x04C11DB7`.
//!
//! Initial value is all-ones and there is no final XOR. Because the
//! checksum is the raw polynomial remainder, a buffer with its own
//! big-endian checksum appended hashes to zero, which is how
//! [`decode_package`](super::decode_package) verifies integrity.

const POLY: u32 = 0x04C11DB7;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut value = (byte as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000_0000 != 0 {
                (value << 1) ^ POLY
            } else {
                value << 1
            };
            bit += 1;
        }
        table[byte] = value;
        byte += 1;
    }
    table
}

static TABLE: [u32; 256] = build_table();

/// CRC-32 of `data`, one table lookup per byte.
pub fn checksum(data: &[u8]) -> u32 {
    let mut result = u32::MAX;
    for &byte in data {
        result = (result << 8) ^ TABLE[(byte ^ (result >> 24) as u8) as usize];
    }
    result
}
