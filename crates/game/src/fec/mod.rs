//! Forward error correction for datagrams.
//!
//! Outgoing payloads get a CRC-32 trailer and are then expanded with
//! Hamming SECDED parity bits, so a receiver can repair any single flipped
//! bit and reject anything worse.

pub mod bits;
pub mod crc;
pub mod hamming;

pub use bits::{bits_to_bytes, bytes_to_bits};
pub use crc::checksum;

/// Failure while protecting or recovering a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FecError {
    #[error("payload too large to protect")]
    TooLarge,
    #[error("uncorrectable corruption detected")]
    Uncorrectable,
    #[error("checksum mismatch after correction")]
    ChecksumMismatch,
}

/// Protects `payload` for transmission: appends its big-endian CRC-32 and
/// Hamming-encodes the whole buffer at the bit level.
pub fn encode_package(payload: &[u8]) -> Result<Vec<u8>, FecError> {
    let mut framed = Vec::with_capacity(payload.len() + 4);
    framed.extend_from_slice(payload);
    framed.extend_from_slice(&checksum(payload).to_be_bytes());

    let encoded = hamming::encode(&bytes_to_bits(&framed))?;
    Ok(bits_to_bytes(&encoded))
}

/// Recovers the original payload from a received datagram, repairing a
/// single flipped bit if present. The CRC trailer must hash the repaired
/// buffer to zero before it is stripped.
pub fn decode_package(datagram: &[u8]) -> Result<Vec<u8>, FecError> {
    let repaired = hamming::decode(&bytes_to_bits(datagram))?;
    let mut framed = bits_to_bytes(&repaired);
    if framed.len() < 4 || checksum(&framed) != 0 {
        return Err(FecError::ChecksumMismatch);
    }
    framed.truncate(framed.len() - 4);
    Ok(framed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for payload in [&b""[..], b"x", b"hello", &[0u8; 64]] {
            let datagram = encode_package(payload).unwrap();
            assert_eq!(decode_package(&datagram).unwrap(), payload);
        }
    }

    #[test]
    fn test_recovers_from_any_single_bit_flip() {
        let payload = b"position update 42";
        let datagram = encode_package(payload).unwrap();
        // skip the final pad bits, which carry no information
        let used_bits = hamming::encode(&bytes_to_bits(
            &[payload.as_slice(), &checksum(payload).to_be_bytes()].concat(),
        ))
        .unwrap()
        .len();
        for bit in 0..used_bits {
            let mut corrupted = datagram.clone();
            corrupted[bit / 8] ^= 0x80 >> (bit % 8);
            assert_eq!(
                decode_package(&corrupted).unwrap(),
                payload,
                "flip at bit {bit}"
            );
        }
    }

    #[test]
    fn test_rejects_double_flip() {
        let payload = b"two flips is one too many";
        let mut corrupted = encode_package(payload).unwrap();
        corrupted[1] ^= 0x81;
        assert!(decode_package(&corrupted).is_err());
    }

    #[test]
    fn test_rejects_forged_trailer() {
        // a structurally valid Hamming sequence whose checksum does not
        // cancel must still be refused
        let payload = b"payload";
        let mut framed = payload.to_vec();
        framed.extend_from_slice(&(checksum(payload) ^ 1).to_be_bytes());
        let encoded = hamming::encode(&bytes_to_bits(&framed)).unwrap();
        let datagram = bits_to_bytes(&encoded);
        assert_eq!(decode_package(&datagram), Err(FecError::ChecksumMismatch));
    }

    #[test]
    fn test_rejects_short_datagram() {
        assert!(decode_package(&[]).is_err());
        assert!(decode_package(&[0x00]).is_err());
    }
}
