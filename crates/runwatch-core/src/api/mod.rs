pub mod client;
pub mod error;
pub mod types;

pub use client::Client;
pub use error::ApiError;
pub use types::{
    Challenge, FieldError, MAX_SCRIPT_BYTES, RunRequest, RunSubmission, ScriptRun, Stage,
    StageParseError, ValidationErrors, parse_duration_secs,
};
