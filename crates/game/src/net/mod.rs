//! Protocol messages, their wire layouts, and request bookkeeping.

pub mod protocol;
pub mod tracking;
pub mod wire;

pub use protocol::{
    Answer, FinishReport, Kinematics, OtherSnapshot, Package, DEFAULT_PORT, MAX_DATAGRAM_SIZE,
    SEND_PERIOD_MS,
};
pub use tracking::PendingRequests;
pub use wire::WireError;
