//! MSB-first conversion between byte buffers and bit sequences.

/// Unpacks bytes into bits, most significant bit of each byte first.
pub fn bytes_to_bits(data: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1 != 0);
        }
    }
    bits
}

/// Packs bits back into bytes, MSB-first. A final partial byte is padded
/// with trailing zero bits.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit {
                byte |= 0x80 >> i;
            }
        }
        bytes.push(byte);
    }
    bytes
}
