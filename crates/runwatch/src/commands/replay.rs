use super::{Command, outcome_result, session_options, watch_session};
use crate::cli::ModeArg;
use async_trait::async_trait;
use eyre::Result;
use runwatch_core::api::Stage;
use runwatch_core::config::Settings;
use runwatch_core::events::Framing;
use runwatch_core::session::{RunMode, RunSession};
use runwatch_core::source::ReplayFrameSource;
use std::path::PathBuf;
use std::time::Duration;

pub struct ReplayCommand {
    pub settings: Settings,
    pub file: PathBuf,
    pub mode: ModeArg,
    pub stages: Vec<Stage>,
    pub framing: Option<Framing>,
    pub chunk_size: Option<usize>,
    pub pace_ms: Option<u64>,
}

impl ReplayCommand {
    fn run_mode(&self) -> RunMode {
        match self.mode {
            ModeArg::Builder => RunMode::Builder {
                stages: self.stages.clone(),
            },
            ModeArg::Script => RunMode::Script,
        }
    }

    fn source(&self) -> ReplayFrameSource {
        let chunk_size = self.chunk_size.unwrap_or(self.settings.replay_chunk_size);
        let source = ReplayFrameSource::from_file(&self.file, chunk_size);
        match self.pace_ms {
            Some(ms) => source.with_pace(Duration::from_millis(ms)),
            None => source,
        }
    }
}

#[async_trait]
impl Command for ReplayCommand {
    async fn execute(&self) -> Result<()> {
        let mut options = session_options(&self.settings, self.run_mode())?;
        if let Some(framing) = self.framing {
            options = options.with_framing(framing);
        }

        let handle = RunSession::new(self.source(), options).start();
        let outcome = watch_session(handle, &mut std::io::stdout()).await?;
        outcome_result(outcome)
    }
}
