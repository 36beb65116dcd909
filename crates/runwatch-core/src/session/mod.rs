//! Per-run state: the step registry, the progress state machine, and the
//! controller task that feeds it from a frame source.

pub mod controller;
pub mod mode;
pub mod outcome;
pub mod progress;
pub mod steps;

#[cfg(test)]
mod tests;

pub use controller::{
    DEFAULT_GRACE_PERIOD, RunHandle, RunSession, RunSnapshot, SessionOptions,
    TRANSPORT_FAILURE_TOAST,
};
pub use mode::RunMode;
pub use outcome::{ResultRoute, SessionOutcome, Toast, ToastKind};
pub use progress::{Effect, ProgressMachine};
pub use steps::{Step, StepRegistry, StepRegistryError, StepSpec, StepStatus};
