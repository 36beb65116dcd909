use super::{Command, outcome_result, session_options, watch_session};
use async_trait::async_trait;
use eyre::Result;
use runwatch_core::api::{Client, RunRequest, RunSubmission};
use runwatch_core::config::Settings;
use runwatch_core::session::RunSession;
use runwatch_core::source::HttpFrameSource;

pub struct RunCommand {
    pub settings: Settings,
    pub request: RunRequest,
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self) -> Result<()> {
        self.request.validate()?;

        let client = Client::new(&self.settings.api_url, self.settings.api_key.clone())?;
        let submission = RunSubmission::Builder(self.request.clone());
        let options = session_options(&self.settings, submission.mode())?;

        let handle = RunSession::new(HttpFrameSource::new(client, submission), options).start();
        let outcome = watch_session(handle, &mut std::io::stdout()).await?;
        outcome_result(outcome)
    }
}
