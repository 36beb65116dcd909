use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::session::RunMode;

/// Upload limit enforced by the runner for custom scripts.
pub const MAX_SCRIPT_BYTES: usize = 2 * 1024 * 1024;
pub const SCRIPT_EXTENSION: &str = ".js";

/// One ramp stage of a builder run, e.g. `30s` to 10 virtual users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub duration: String,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: &str, target: u32) -> Self {
        Self {
            duration: duration.to_string(),
            target,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        parse_duration_secs(&self.duration)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageParseError {
    #[error("expected <duration>:<target>, got '{0}'")]
    Format(String),
    #[error("invalid target '{0}', expected a whole number of virtual users")]
    Target(String),
}

impl FromStr for Stage {
    type Err = StageParseError;

    /// Parses the `30s:10` form used on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .split_once(':')
            .ok_or_else(|| StageParseError::Format(s.to_string()))?;
        let target = target
            .trim()
            .parse::<u32>()
            .map_err(|_| StageParseError::Target(target.trim().to_string()))?;
        Ok(Self::new(duration.trim(), target))
    }
}

/// Seconds in a `<n>s` or `<n>m` duration. Anything else counts as zero.
pub fn parse_duration_secs(duration: &str) -> u64 {
    let duration = duration.trim();
    if let Some(secs) = duration.strip_suffix('s') {
        secs.trim().parse().unwrap_or(0)
    } else if let Some(mins) = duration.strip_suffix('m') {
        mins.trim().parse::<u64>().map_or(0, |m| m.saturating_mul(60))
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: impl Into<String>, message: &str) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.to_string(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Body of a form-built run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub project_name: String,
    pub url: String,
    pub stages: Vec<Stage>,
}

impl RunRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.project_name.trim().is_empty() {
            errors.push("project_name", "Project name is required");
        }
        if self.url.trim().is_empty() {
            errors.push("url", "Target URL is required");
        }
        if self.stages.is_empty() {
            errors.push("stages", "At least one stage required");
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.duration.trim().is_empty() {
                errors.push(format!("stages[{index}].duration"), "Required");
            }
            if stage.target == 0 {
                errors.push(format!("stages[{index}].target"), "Required");
            }
        }
        errors.into_result()
    }
}

/// Proof-of-work challenge that must accompany a script upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub question: String,
    pub token: String,
    pub timestamp: i64,
}

/// An uploaded k6 script together with the solved challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub project_name: String,
    pub file_name: String,
    pub script: Vec<u8>,
    pub challenge: Challenge,
    pub answer: String,
}

impl ScriptRun {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.project_name.trim().is_empty() {
            errors.push("project_name", "Project name is required");
        }
        if !self.file_name.ends_with(SCRIPT_EXTENSION) {
            errors.push("file", "Please upload a .js file");
        }
        if self.script.len() > MAX_SCRIPT_BYTES {
            errors.push("file", "File too large (max 2MB)");
        }
        let answer = self.answer.trim();
        if answer.is_empty() || self.challenge.token.is_empty() {
            errors.push("captcha_answer", "Please solve captcha");
        } else if answer.parse::<i64>().is_err() {
            errors.push("captcha_answer", "Answer must be a whole number");
        }
        errors.into_result()
    }
}

/// Either kind of run the remote runner accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSubmission {
    Builder(RunRequest),
    Script(ScriptRun),
}

impl RunSubmission {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Builder(request) => request.validate(),
            Self::Script(run) => run.validate(),
        }
    }

    pub fn project_name(&self) -> &str {
        match self {
            Self::Builder(request) => &request.project_name,
            Self::Script(run) => &run.project_name,
        }
    }

    pub fn mode(&self) -> RunMode {
        match self {
            Self::Builder(request) => RunMode::Builder {
                stages: request.stages.clone(),
            },
            Self::Script(_) => RunMode::Script,
        }
    }
}
