//! Message types exchanged between client and server.

use glam::DVec2;

/// UDP port the server binds by default.
pub const DEFAULT_PORT: u16 = 20123;

/// Largest datagram either endpoint will read.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Interval between client state/poll sends.
pub const SEND_PERIOD_MS: u64 = 100;

/// Kinematic sample of one player at a point in time.
///
/// `time` is the sender's clock in milliseconds and orders samples on the
/// receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    pub time: u64,
}

/// Client-to-server request.
#[derive(Debug, Clone, PartialEq)]
pub enum Package {
    /// Registers the sender's address with the server.
    Login,
    /// Pushes the sender's current kinematic state.
    Message { id: u64, state: Kinematics },
    /// Polls for the state of every other player.
    GetOther { id: u64 },
    /// Reports that the sender crossed the finish line.
    Finish { id: u64, state: Kinematics },
    /// Ends the sender's session.
    BreakSession,
}

impl Package {
    /// Request id carried by the variant, if any.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Package::Message { id, .. }
            | Package::GetOther { id }
            | Package::Finish { id, .. } => Some(*id),
            Package::Login | Package::BreakSession => None,
        }
    }
}

/// One opponent's state inside an [`Answer::Other`] response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtherSnapshot {
    /// Server-assigned ordinal, stable only within a single response.
    pub id: u64,
    pub state: Kinematics,
}

/// Race result echoed back by the server. The final coordinates are
/// whole units, not doubles like live kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishReport {
    pub x: u64,
    pub y: u64,
    pub time: u64,
    pub has_finished: bool,
}

/// Server-to-client response.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// A field in the request failed validation.
    ErrorValueIncorrect,
    /// The request could not be decoded.
    BadFormed,
    /// Login accepted.
    Registered,
    /// The state sample carried by request `id` was applied.
    Acknowledge { id: u64 },
    /// States of all other players, answering poll `id`.
    Other { id: u64, players: Vec<OtherSnapshot> },
    /// Final standings for the recipient.
    Finish(FinishReport),
    /// The recipient's session was terminated.
    BreakSession,
}
