//! Shared core for the sync layer: datagram protection, the client/server
//! protocol with its wire codec, and remote-player interpolation.

pub mod fec;
pub mod interp;
pub mod net;

pub use fec::{decode_package, encode_package, FecError};
pub use interp::Interpolator;
pub use net::{
    Answer, FinishReport, Kinematics, OtherSnapshot, Package, PendingRequests, WireError,
    DEFAULT_PORT, MAX_DATAGRAM_SIZE, SEND_PERIOD_MS,
};
