use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::Display;
use thiserror::Error;

use crate::types::StepKey;

pub const EXECUTION_STEP: &str = "load";
pub const SECURITY_HEADERS_STEP: &str = "security_headers";
pub const SSL_STEP: &str = "ssl";
pub const WEB_PERFORMANCE_STEP: &str = "wpt";
pub const PAGE_AUDIT_STEP: &str = "lighthouse";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Done,
    Skip,
}

impl StepStatus {
    /// True once the step will not change again on its own.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Skip)
    }
}

/// Configured description of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub key: StepKey,
    pub label: String,
    /// Progress percentage reached once the step is done or skipped.
    pub weight: u8,
}

impl StepSpec {
    pub fn new(key: &str, label: &str, weight: u8) -> Self {
        Self {
            key: StepKey::from(key),
            label: label.to_string(),
            weight,
        }
    }
}

/// A step as tracked by a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub key: StepKey,
    pub label: String,
    pub weight: u8,
    pub status: StepStatus,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepRegistryError {
    #[error("at least one step must be configured")]
    Empty,
    #[error("step key must not be blank")]
    BlankKey,
    #[error("step key '{0}' must not contain ':'")]
    InvalidKey(String),
    #[error("step '{0}' is configured more than once")]
    DuplicateKey(String),
    #[error("step '{key}' has weight {weight}, expected 0..=100")]
    WeightOutOfRange { key: String, weight: u8 },
}

/// Ordered, validated set of steps a run may pass through. The first step
/// is the one that is already running when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    steps: Vec<StepSpec>,
}

impl StepRegistry {
    pub fn new(steps: Vec<StepSpec>) -> Result<Self, StepRegistryError> {
        if steps.is_empty() {
            return Err(StepRegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for step in &steps {
            let key = step.key.as_str();
            if key.trim().is_empty() {
                return Err(StepRegistryError::BlankKey);
            }
            if key.contains(':') {
                return Err(StepRegistryError::InvalidKey(key.to_string()));
            }
            if step.weight > 100 {
                return Err(StepRegistryError::WeightOutOfRange {
                    key: key.to_string(),
                    weight: step.weight,
                });
            }
            if !seen.insert(key) {
                return Err(StepRegistryError::DuplicateKey(key.to_string()));
            }
        }

        Ok(Self { steps })
    }

    /// The default deployment: k6 execution followed by four scans.
    pub fn builtin() -> Self {
        Self {
            steps: builtin_steps(),
        }
    }

    pub fn specs(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn get(&self, key: &StepKey) -> Option<&StepSpec> {
        self.steps.iter().find(|step| &step.key == key)
    }

    /// Fresh per-session steps: the first running, the rest pending.
    pub fn instantiate(&self) -> Vec<Step> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, spec)| Step {
                key: spec.key.clone(),
                label: spec.label.clone(),
                weight: spec.weight,
                status: if index == 0 {
                    StepStatus::Running
                } else {
                    StepStatus::Pending
                },
            })
            .collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn builtin_steps() -> Vec<StepSpec> {
    vec![
        StepSpec::new(EXECUTION_STEP, "k6 Execution", 80),
        StepSpec::new(SECURITY_HEADERS_STEP, "Security Headers", 82),
        StepSpec::new(SSL_STEP, "SSL Scan", 88),
        StepSpec::new(WEB_PERFORMANCE_STEP, "WebPageTest", 94),
        StepSpec::new(PAGE_AUDIT_STEP, "Lighthouse", 98),
    ]
}
