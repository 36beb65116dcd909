use tracing::debug;

use crate::events::{EXECUTION_FAILED, RunEvent, TransitionStatus};
use crate::session::outcome::{SessionOutcome, Toast};
use crate::session::steps::{Step, StepRegistry, StepStatus};
use crate::types::{RunId, StepKey};

/// Completion is reserved for the terminal success marker.
pub const MAX_STEP_PROGRESS: u8 = 99;
/// Time-based progress alone never suggests the run is nearly finished.
pub const MAX_TICK_PROGRESS: u8 = 80;
pub const COMPLETE: u8 = 100;

pub const SUCCESS_TOAST: &str = "Test completed";

/// Side effects of applying an event that the session controller carries out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AppendLog(String),
    ShowToast(Toast),
    Resolve(SessionOutcome),
}

/// Per-session step statuses and the monotonic 0-100 progress value.
#[derive(Debug, Clone)]
pub struct ProgressMachine {
    registry: StepRegistry,
    steps: Vec<Step>,
    progress: u8,
    tick_budget: Option<u64>,
    ticks: u64,
    last_error: Option<String>,
    outcome: Option<SessionOutcome>,
}

impl ProgressMachine {
    /// `tick_budget` is the total expected run time in seconds; `None`
    /// disables time-based progress.
    pub fn new(registry: StepRegistry, tick_budget: Option<u64>) -> Self {
        let steps = registry.instantiate();
        Self {
            registry,
            steps,
            progress: 0,
            tick_budget,
            ticks: 0,
            last_error: None,
            outcome: None,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self, key: &StepKey) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|step| &step.key == key)
            .map(|step| step.status)
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn apply(&mut self, event: RunEvent) -> Vec<Effect> {
        if self.outcome.is_some() {
            debug!(target: "runwatch::progress", ?event, "ignoring event after outcome");
            return vec![];
        }

        match event {
            RunEvent::StepTransition { step, status } => {
                self.handle_transition(&step, status);
                vec![]
            }
            RunEvent::ProgressTick { text } => {
                self.handle_tick();
                vec![Effect::AppendLog(text)]
            }
            RunEvent::LogLine { text } => vec![Effect::AppendLog(text)],
            RunEvent::HardError { message } => {
                self.last_error = Some(message.clone());
                vec![
                    Effect::AppendLog(format!("ERROR: {message}")),
                    Effect::ShowToast(Toast::error(message)),
                ]
            }
            RunEvent::RunCompleted { run_id } => self.handle_completed(run_id),
            RunEvent::RunFailed { reason } => {
                let outcome = SessionOutcome::failed(reason.clone());
                self.outcome = Some(outcome.clone());
                vec![
                    Effect::ShowToast(Toast::error(reason)),
                    Effect::Resolve(outcome),
                ]
            }
        }
    }

    /// Resolves a session whose stream ended without a terminal marker. The
    /// most recent remote error is the best explanation available.
    pub fn finish_unterminated(&mut self) -> Option<SessionOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let message = self
            .last_error
            .clone()
            .unwrap_or_else(|| EXECUTION_FAILED.to_string());
        let outcome = SessionOutcome::failed(message);
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn handle_transition(&mut self, key: &StepKey, status: TransitionStatus) {
        let Some(weight) = self.registry.get(key).map(|spec| spec.weight) else {
            debug!(target: "runwatch::progress", step = %key, "ignoring unknown step");
            return;
        };

        if let Some(step) = self.steps.iter_mut().find(|step| &step.key == key) {
            step.status = status.into();
        }

        if matches!(status, TransitionStatus::Done | TransitionStatus::Skip) {
            self.raise(weight.min(MAX_STEP_PROGRESS));
        }
    }

    fn handle_tick(&mut self) {
        let Some(budget) = self.tick_budget else {
            return;
        };
        self.ticks += 1;
        if budget == 0 {
            return;
        }
        let percent = (self.ticks.saturating_mul(100) / budget).min(u64::from(MAX_TICK_PROGRESS));
        self.raise(u8::try_from(percent).unwrap_or(MAX_TICK_PROGRESS));
    }

    fn handle_completed(&mut self, run_id: RunId) -> Vec<Effect> {
        self.raise(COMPLETE);
        // Not every step runs for every configuration; unreported ones are
        // treated as finished.
        for step in &mut self.steps {
            if !step.status.is_settled() {
                step.status = StepStatus::Done;
            }
        }
        let outcome = SessionOutcome::Succeeded { run_id };
        self.outcome = Some(outcome.clone());
        vec![
            Effect::ShowToast(Toast::success(SUCCESS_TOAST)),
            Effect::Resolve(outcome),
        ]
    }

    fn raise(&mut self, candidate: u8) {
        self.progress = self.progress.max(candidate.min(COMPLETE));
    }
}
