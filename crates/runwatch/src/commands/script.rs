use super::{Command, outcome_result, session_options, watch_session};
use crate::error::Error;
use async_trait::async_trait;
use eyre::Result;
use runwatch_core::api::{Challenge, Client, RunSubmission, ScriptRun};
use runwatch_core::config::Settings;
use runwatch_core::session::RunSession;
use runwatch_core::source::HttpFrameSource;
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub struct ScriptCommand {
    pub settings: Settings,
    pub project: String,
    pub file: PathBuf,
    pub answer: Option<String>,
}

#[async_trait]
impl Command for ScriptCommand {
    async fn execute(&self) -> Result<()> {
        let file_name = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Input(format!("{} is not a file", self.file.display())))?;
        let script = tokio::fs::read(&self.file).await.map_err(Error::from)?;

        let client = Client::new(&self.settings.api_url, self.settings.api_key.clone())?;
        let challenge = client.fetch_challenge().await?;
        let answer = match &self.answer {
            Some(answer) => answer.clone(),
            None => prompt_answer(&challenge)?,
        };

        let submission = RunSubmission::Script(ScriptRun {
            project_name: self.project.clone(),
            file_name,
            script,
            challenge,
            answer,
        });
        submission.validate()?;
        let options = session_options(&self.settings, submission.mode())?;

        let handle = RunSession::new(HttpFrameSource::new(client, submission), options).start();
        let outcome = watch_session(handle, &mut std::io::stdout()).await?;
        outcome_result(outcome)
    }
}

fn prompt_answer(challenge: &Challenge) -> std::result::Result<String, Error> {
    let mut stdout = std::io::stdout();
    write!(stdout, "Solve {} = ", challenge.question)?;
    stdout.flush()?;
    read_answer(&mut std::io::stdin().lock())
}

fn read_answer(input: &mut impl BufRead) -> std::result::Result<String, Error> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        return Err(Error::Input("Please solve captcha".to_string()));
    }
    Ok(answer.to_string())
}
