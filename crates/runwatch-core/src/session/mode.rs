use crate::api::Stage;

/// Which entry point launched the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Form-built run; `running` lines advance progress against the total
    /// stage duration.
    Builder { stages: Vec<Stage> },
    /// Uploaded script; its duration is unknown so ticks only log.
    Script,
}

impl RunMode {
    /// Seconds of load the ticks are measured against, if ticking applies.
    pub fn tick_budget(&self) -> Option<u64> {
        match self {
            Self::Builder { stages } => Some(stages.iter().map(Stage::duration_secs).sum()),
            Self::Script => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Builder { .. } => "builder",
            Self::Script => "script",
        }
    }
}
