// Core runwatch functionality without terminal rendering

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod source;
pub mod types;
pub mod utils;

pub use api::{ApiError, Client};
pub use error::{Error, Result};
pub use events::{Framing, RunEvent, classify};
pub use session::{
    ProgressMachine, RunHandle, RunMode, RunSession, RunSnapshot, SessionOptions, SessionOutcome,
    StepRegistry, StepStatus,
};
pub use source::{FrameSource, FrameStream, HttpFrameSource, ReplayFrameSource, TransportError};
pub use types::{RunId, SessionId, StepKey};
