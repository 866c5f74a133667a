//! Hamming SECDED codec over bit sequences.
//!
//! Parity bits sit at every power-of-two position (1-indexed) so that the
//! XOR of all 1-valued bit positions is zero for an intact sequence; the
//! recomputed XOR (the syndrome) then points directly at a single flipped
//! bit. One leading global even-parity bit distinguishes a correctable
//! single flip from an uncorrectable double flip.

use super::FecError;

/// Smallest `r` such that `2^r >= data_size + r + 1`.
pub fn redundant_bit_count(data_size: usize) -> Result<usize, FecError> {
    if data_size as u64 > u64::MAX - 1 {
        return Err(FecError::TooLarge);
    }
    let mut r = 0usize;
    while (1u128 << r) < data_size as u128 + r as u128 + 1 {
        r += 1;
    }
    Ok(r)
}

/// Expands `data` with `r` parity bits plus the leading global parity bit.
/// Output length is `data.len() + r + 1`.
pub fn encode(data: &[bool]) -> Result<Vec<bool>, FecError> {
    let r = redundant_bit_count(data.len())?;
    let total = data.len() + r;

    // lay the data bits out around the reserved parity slots
    let mut body = Vec::with_capacity(total);
    let mut source = data.iter().copied();
    let mut next_power = 1usize;
    for position in 1..=total {
        if position == next_power {
            body.push(false);
            next_power <<= 1;
        } else {
            body.push(source.next().unwrap_or(false));
        }
    }

    let mut syndrome = 0usize;
    for (i, &bit) in body.iter().enumerate() {
        if bit {
            syndrome ^= i + 1;
        }
    }

    // each parity slot zeroes exactly one syndrome bit
    let mut power = 1usize;
    while power <= total {
        if syndrome & power != 0 {
            body[power - 1] = true;
        }
        power <<= 1;
    }

    let ones = body.iter().filter(|&&b| b).count();
    let mut out = Vec::with_capacity(total + 1);
    out.push(ones % 2 == 0);
    out.extend(body);
    Ok(out)
}

/// Recovers the data bits from an encoded sequence, correcting at most one
/// flipped bit. Parity bits and the trailing pad bits added for byte
/// alignment are stripped from the result.
pub fn decode(bits: &[bool]) -> Result<Vec<bool>, FecError> {
    let Some((&expect_even, body)) = bits.split_first() else {
        return Err(FecError::Uncorrectable);
    };

    let mut data = Vec::with_capacity(body.len());
    let mut syndrome = 0usize;
    let mut ones = 0usize;
    let mut next_power = 1usize;
    for (i, &bit) in body.iter().enumerate() {
        let position = i + 1;
        if bit {
            syndrome ^= position;
            ones += 1;
        }
        if position == next_power {
            next_power <<= 1;
        } else {
            data.push(bit);
        }
    }

    if syndrome != 0 {
        let parity_consistent = (ones % 2 == 0) == expect_even;
        if parity_consistent || syndrome > body.len() {
            // two flipped bits cancel in the global parity but not in the
            // syndrome; an out-of-range syndrome is equally unrepairable
            return Err(FecError::Uncorrectable);
        }
        if !syndrome.is_power_of_two() {
            let parity_slots = (usize::BITS - syndrome.leading_zeros()) as usize;
            let index = syndrome - parity_slots - 1;
            data[index] = !data[index];
        }
        // a flipped parity bit leaves the data intact
    }

    // drop the pad bits added when the encoded sequence was byte-packed
    data.truncate(data.len() - data.len() % 8);
    Ok(data)
}
