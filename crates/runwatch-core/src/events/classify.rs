use strum::Display;

use crate::session::StepStatus;
use crate::types::{RunId, StepKey};

pub const ERROR_PREFIX: &str = "ERROR:";
pub const FAILED_SENTINEL: &str = "__FAILED__";
pub const RUN_ID_PREFIX: &str = "RUN_ID:";
pub const PROGRESS_PREFIX: &str = "PROGRESS:";
pub const RUNNING_MARKER: &str = "running";
/// Lines starting with this prefix are runner bookkeeping (`__FINISHED__`,
/// `__JSON_PATH__:...`) and never shown.
pub const PRIVATE_PREFIX: &str = "__";

pub const EXECUTION_FAILED: &str = "execution failed";
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Status carried by a `PROGRESS:` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransitionStatus {
    Running,
    Done,
    Skip,
}

impl TransitionStatus {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "start" => Some(Self::Running),
            "done" => Some(Self::Done),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl From<TransitionStatus> for StepStatus {
    fn from(status: TransitionStatus) -> Self {
        match status {
            TransitionStatus::Running => StepStatus::Running,
            TransitionStatus::Done => StepStatus::Done,
            TransitionStatus::Skip => StepStatus::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    StepTransition {
        step: StepKey,
        status: TransitionStatus,
    },
    RunCompleted {
        run_id: RunId,
    },
    RunFailed {
        reason: String,
    },
    /// A remote error. Not terminal on its own.
    HardError {
        message: String,
    },
    /// An in-progress line from the load generator; advances time-based
    /// progress and is shown in the log.
    ProgressTick {
        text: String,
    },
    LogLine {
        text: String,
    },
}

/// Maps one payload line to at most one event. Never fails: anything that
/// does not match a structured form is either a log line or dropped.
pub fn classify(line: &str) -> Option<RunEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
        let message = rest.trim();
        let message = if message.is_empty() {
            UNKNOWN_ERROR
        } else {
            message
        };
        return Some(RunEvent::HardError {
            message: message.to_string(),
        });
    }

    if line == FAILED_SENTINEL {
        return Some(RunEvent::RunFailed {
            reason: EXECUTION_FAILED.to_string(),
        });
    }

    if let Some(rest) = line.strip_prefix(RUN_ID_PREFIX) {
        return RunId::new(rest).map(|run_id| RunEvent::RunCompleted { run_id });
    }

    if line.starts_with(PROGRESS_PREFIX) {
        return parse_progress(line);
    }

    if line.contains(RUNNING_MARKER) {
        return Some(RunEvent::ProgressTick {
            text: line.to_string(),
        });
    }

    if line.starts_with(PRIVATE_PREFIX) {
        return None;
    }

    Some(RunEvent::LogLine {
        text: line.to_string(),
    })
}

fn parse_progress(line: &str) -> Option<RunEvent> {
    let mut parts = line.split(':').skip(1);
    let (Some(step), Some(status)) = (parts.next(), parts.next()) else {
        return None;
    };
    let step = step.trim();
    if step.is_empty() {
        return None;
    }
    let status = TransitionStatus::from_wire(status.trim())?;
    Some(RunEvent::StepTransition {
        step: StepKey::from(step),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn transition(step: &str, status: TransitionStatus) -> Option<RunEvent> {
        Some(RunEvent::StepTransition {
            step: StepKey::from(step),
            status,
        })
    }

    #[rstest]
    #[case("PROGRESS:security_headers:start", transition("security_headers", TransitionStatus::Running))]
    #[case("PROGRESS:ssl:done", transition("ssl", TransitionStatus::Done))]
    #[case("PROGRESS:wpt:skip", transition("wpt", TransitionStatus::Skip))]
    #[case("PROGRESS:lighthouse:done:extra", transition("lighthouse", TransitionStatus::Done))]
    #[case("PROGRESS:ssl", None)]
    #[case("PROGRESS:ssl:paused", None)]
    #[case("PROGRESS::done", None)]
    fn classifies_progress_markers(#[case] line: &str, #[case] expected: Option<RunEvent>) {
        assert_eq!(classify(line), expected);
    }

    #[rstest]
    #[case("", None)]
    #[case("   ", None)]
    #[case("__FINISHED__", None)]
    #[case("__JSON_PATH__:/tmp/out.json", None)]
    #[case("__FAILED__", Some(RunEvent::RunFailed { reason: EXECUTION_FAILED.to_string() }))]
    #[case("RUN_ID:abc123", Some(RunEvent::RunCompleted { run_id: RunId::new("abc123").unwrap() }))]
    #[case("RUN_ID:", None)]
    #[case("ERROR: upstream timeout ", Some(RunEvent::HardError { message: "upstream timeout".to_string() }))]
    #[case("ERROR:", Some(RunEvent::HardError { message: UNKNOWN_ERROR.to_string() }))]
    #[case("  execution: local", Some(RunEvent::LogLine { text: "execution: local".to_string() }))]
    fn classifies_terminal_and_log_lines(#[case] line: &str, #[case] expected: Option<RunEvent>) {
        assert_eq!(classify(line), expected);
    }

    #[test]
    fn running_lines_are_ticks() {
        let line = "running (0m05.0s), 03/10 VUs, 41 complete and 0 interrupted iterations";
        assert_eq!(
            classify(line),
            Some(RunEvent::ProgressTick {
                text: line.to_string()
            })
        );
    }

    #[test]
    fn earlier_forms_take_priority() {
        assert!(matches!(
            classify("ERROR: scan still running"),
            Some(RunEvent::HardError { .. })
        ));
        assert!(matches!(
            classify("PROGRESS:running:start"),
            Some(RunEvent::StepTransition { .. })
        ));
        assert!(matches!(
            classify("__running__"),
            Some(RunEvent::ProgressTick { .. })
        ));
    }
}
