//! Turning raw stream fragments into typed run events.
//!
//! [`LineDecoder`] reassembles complete lines across fragment boundaries and
//! strips the transport envelope; [`classify`] maps each line to at most one
//! [`RunEvent`].

pub mod classify;
pub mod decode;

pub use classify::{
    ERROR_PREFIX, EXECUTION_FAILED, FAILED_SENTINEL, PROGRESS_PREFIX, RUN_ID_PREFIX, RunEvent,
    TransitionStatus, classify,
};
pub use decode::{Framing, LineDecoder};
