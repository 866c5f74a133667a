//! Fixed big-endian binary layouts for [`Package`] and [`Answer`].
//!
//! Every variant starts with a one-byte discriminant followed by a payload
//! of exactly the size that discriminant implies. Decoding rejects any
//! datagram whose length does not match, before reading a single field.

use glam::DVec2;

use super::protocol::{Answer, FinishReport, Kinematics, OtherSnapshot, Package};

const PKG_LOGIN: u8 = 0;
const PKG_MESSAGE: u8 = 1;
const PKG_GET_OTHER: u8 = 2;
const PKG_FINISH: u8 = 3;
const PKG_BREAK_SESSION: u8 = 4;

const ANS_ERROR_VALUE_INCORRECT: i8 = -2;
const ANS_BAD_FORMED: i8 = -1;
const ANS_REGISTERED: i8 = 0;
const ANS_ACKNOWLEDGE: i8 = 1;
const ANS_OTHER: i8 = 2;
const ANS_FINISH: i8 = 3;
const ANS_BREAK_SESSION: i8 = 4;

/// Serialized size of a [`Kinematics`]: six doubles plus the timestamp.
pub const KINEMATICS_SIZE: usize = 6 * 8 + 8;

/// Serialized size of one [`OtherSnapshot`]: the per-response id plus the
/// kinematic state.
pub const OTHER_ENTRY_SIZE: usize = 8 + KINEMATICS_SIZE;

// discriminant + echoed request id + entry count
const OTHER_HEADER_SIZE: usize = 1 + 8 + 8;

/// Rejection while decoding a datagram into a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown discriminant {0}")]
    UnknownDiscriminant(i8),
    #[error("datagram length {got} does not match discriminant {discriminant}")]
    BadLength { discriminant: i8, got: usize },
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_vec2(out: &mut Vec<u8>, value: DVec2) {
    put_f64(out, value.x);
    put_f64(out, value.y);
}

fn put_kinematics(out: &mut Vec<u8>, state: &Kinematics) {
    put_vec2(out, state.position);
    put_vec2(out, state.velocity);
    put_vec2(out, state.acceleration);
    put_u64(out, state.time);
}

// Field readers assume the caller already checked the buffer length
// against the discriminant, so fixed offsets are always in range.

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(raw)
}

fn read_f64(buf: &[u8], offset: usize) -> f64 {
    f64::from_bits(read_u64(buf, offset))
}

fn read_vec2(buf: &[u8], offset: usize) -> DVec2 {
    DVec2::new(read_f64(buf, offset), read_f64(buf, offset + 8))
}

fn read_kinematics(buf: &[u8], offset: usize) -> Kinematics {
    Kinematics {
        position: read_vec2(buf, offset),
        velocity: read_vec2(buf, offset + 16),
        acceleration: read_vec2(buf, offset + 32),
        time: read_u64(buf, offset + 48),
    }
}

fn check_length(discriminant: i8, got: usize, expected: usize) -> Result<(), WireError> {
    if got == expected {
        Ok(())
    } else {
        Err(WireError::BadLength { discriminant, got })
    }
}

impl Package {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Package::Login => vec![PKG_LOGIN],
            Package::Message { id, state } => {
                let mut out = Vec::with_capacity(1 + 8 + KINEMATICS_SIZE);
                out.push(PKG_MESSAGE);
                put_u64(&mut out, *id);
                put_kinematics(&mut out, state);
                out
            }
            Package::GetOther { id } => {
                let mut out = Vec::with_capacity(1 + 8);
                out.push(PKG_GET_OTHER);
                put_u64(&mut out, *id);
                out
            }
            Package::Finish { id, state } => {
                let mut out = Vec::with_capacity(1 + 8 + KINEMATICS_SIZE);
                out.push(PKG_FINISH);
                put_u64(&mut out, *id);
                put_kinematics(&mut out, state);
                out
            }
            Package::BreakSession => vec![PKG_BREAK_SESSION],
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Package, WireError> {
        let Some((&discriminant, _)) = buf.split_first() else {
            return Err(WireError::Empty);
        };
        match discriminant {
            PKG_LOGIN => {
                check_length(discriminant as i8, buf.len(), 1)?;
                Ok(Package::Login)
            }
            PKG_MESSAGE => {
                check_length(discriminant as i8, buf.len(), 1 + 8 + KINEMATICS_SIZE)?;
                Ok(Package::Message {
                    id: read_u64(buf, 1),
                    state: read_kinematics(buf, 9),
                })
            }
            PKG_GET_OTHER => {
                check_length(discriminant as i8, buf.len(), 1 + 8)?;
                Ok(Package::GetOther {
                    id: read_u64(buf, 1),
                })
            }
            PKG_FINISH => {
                check_length(discriminant as i8, buf.len(), 1 + 8 + KINEMATICS_SIZE)?;
                Ok(Package::Finish {
                    id: read_u64(buf, 1),
                    state: read_kinematics(buf, 9),
                })
            }
            PKG_BREAK_SESSION => {
                check_length(discriminant as i8, buf.len(), 1)?;
                Ok(Package::BreakSession)
            }
            other => Err(WireError::UnknownDiscriminant(other as i8)),
        }
    }
}

impl Answer {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Answer::ErrorValueIncorrect => vec![ANS_ERROR_VALUE_INCORRECT as u8],
            Answer::BadFormed => vec![ANS_BAD_FORMED as u8],
            Answer::Registered => vec![ANS_REGISTERED as u8],
            Answer::Acknowledge { id } => {
                let mut out = Vec::with_capacity(1 + 8);
                out.push(ANS_ACKNOWLEDGE as u8);
                put_u64(&mut out, *id);
                out
            }
            Answer::Other { id, players } => {
                let mut out =
                    Vec::with_capacity(OTHER_HEADER_SIZE + players.len() * OTHER_ENTRY_SIZE);
                out.push(ANS_OTHER as u8);
                put_u64(&mut out, *id);
                put_u64(&mut out, players.len() as u64);
                for player in players {
                    put_u64(&mut out, player.id);
                    put_kinematics(&mut out, &player.state);
                }
                out
            }
            Answer::Finish(report) => {
                let mut out = Vec::with_capacity(1 + 3 * 8 + 1);
                out.push(ANS_FINISH as u8);
                put_u64(&mut out, report.x);
                put_u64(&mut out, report.y);
                put_u64(&mut out, report.time);
                out.push(report.has_finished as u8);
                out
            }
            Answer::BreakSession => vec![ANS_BREAK_SESSION as u8],
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Answer, WireError> {
        let Some((&first, _)) = buf.split_first() else {
            return Err(WireError::Empty);
        };
        let discriminant = first as i8;
        match discriminant {
            ANS_ERROR_VALUE_INCORRECT => {
                check_length(discriminant, buf.len(), 1)?;
                Ok(Answer::ErrorValueIncorrect)
            }
            ANS_BAD_FORMED => {
                check_length(discriminant, buf.len(), 1)?;
                Ok(Answer::BadFormed)
            }
            ANS_REGISTERED => {
                check_length(discriminant, buf.len(), 1)?;
                Ok(Answer::Registered)
            }
            ANS_ACKNOWLEDGE => {
                check_length(discriminant, buf.len(), 1 + 8)?;
                Ok(Answer::Acknowledge {
                    id: read_u64(buf, 1),
                })
            }
            ANS_OTHER => {
                if buf.len() < OTHER_HEADER_SIZE {
                    return Err(WireError::BadLength {
                        discriminant,
                        got: buf.len(),
                    });
                }
                let id = read_u64(buf, 1);
                let count = read_u64(buf, 9);
                let expected = usize::try_from(count)
                    .ok()
                    .and_then(|n| n.checked_mul(OTHER_ENTRY_SIZE))
                    .and_then(|n| n.checked_add(OTHER_HEADER_SIZE))
                    .ok_or(WireError::BadLength {
                        discriminant,
                        got: buf.len(),
                    })?;
                check_length(discriminant, buf.len(), expected)?;

                let mut players = Vec::with_capacity(count as usize);
                let mut offset = OTHER_HEADER_SIZE;
                for _ in 0..count {
                    players.push(OtherSnapshot {
                        id: read_u64(buf, offset),
                        state: read_kinematics(buf, offset + 8),
                    });
                    offset += OTHER_ENTRY_SIZE;
                }
                Ok(Answer::Other { id, players })
            }
            ANS_FINISH => {
                check_length(discriminant, buf.len(), 1 + 3 * 8 + 1)?;
                Ok(Answer::Finish(FinishReport {
                    x: read_u64(buf, 1),
                    y: read_u64(buf, 9),
                    time: read_u64(buf, 17),
                    has_finished: buf[25] != 0,
                }))
            }
            ANS_BREAK_SESSION => {
                check_length(discriminant, buf.len(), 1)?;
                Ok(Answer::BreakSession)
            }
            other => Err(WireError::UnknownDiscriminant(other)),
        }
    }
}
