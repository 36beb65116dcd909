use reqwest::multipart::{Form, Part};
use reqwest::{Response, header};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::api::error::ApiError;
use crate::api::types::{Challenge, RunRequest, RunSubmission, ScriptRun};

pub const API_KEY_HEADER: &str = "x-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const RUN_PATH: &str = "api/run";
const SCRIPT_RUN_PATH: &str = "api/runjs";
const CHALLENGE_PATH: &str = "api/captcha";

/// HTTP client for the remote test runner.
///
/// Run responses are returned as-is so the body can be consumed as a
/// stream; only the status is checked here. No overall request timeout is
/// set because a run stays open for its whole duration.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            details: e.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            details: e.to_string(),
        })
    }

    /// Starts a form-built run and returns the streaming response.
    pub async fn start_run(&self, request: &RunRequest) -> Result<Response, ApiError> {
        request.validate()?;
        let url = self.endpoint(RUN_PATH)?;
        info!(
            target: "runwatch::api",
            project = %request.project_name,
            stages = request.stages.len(),
            "starting run"
        );

        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, self.api_key_value())
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        check_status(response).await
    }

    /// Uploads a script run as a multipart form.
    pub async fn start_script_run(&self, run: &ScriptRun) -> Result<Response, ApiError> {
        run.validate()?;
        let url = self.endpoint(SCRIPT_RUN_PATH)?;
        info!(
            target: "runwatch::api",
            project = %run.project_name,
            file = %run.file_name,
            bytes = run.script.len(),
            "starting script run"
        );

        let file = Part::bytes(run.script.clone())
            .file_name(run.file_name.clone())
            .mime_str("application/javascript")?;
        let form = Form::new()
            .text("project_name", run.project_name.clone())
            .part("file", file)
            .text("captcha_answer", run.answer.trim().to_string())
            .text("captcha_token", run.challenge.token.clone())
            .text("captcha_timestamp", run.challenge.timestamp.to_string());

        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, self.api_key_value())
            .header(header::ACCEPT, "text/event-stream")
            .multipart(form)
            .send()
            .await?;
        check_status(response).await
    }

    pub async fn submit(&self, submission: &RunSubmission) -> Result<Response, ApiError> {
        match submission {
            RunSubmission::Builder(request) => self.start_run(request).await,
            RunSubmission::Script(run) => self.start_script_run(run).await,
        }
    }

    /// Fetches the arithmetic challenge required for script uploads.
    pub async fn fetch_challenge(&self) -> Result<Challenge, ApiError> {
        let url = self.endpoint(CHALLENGE_PATH)?;
        let response = check_status(self.http_client.get(url).send().await?).await?;
        let body = response.text().await?;
        let challenge: Challenge =
            serde_json::from_str(&body).map_err(|e| ApiError::ResponseParsingError {
                details: format!("{e}: {body}"),
            })?;
        debug!(target: "runwatch::api", question = %challenge.question, "fetched challenge");
        Ok(challenge)
    }

    fn api_key_value(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let details = response.text().await?;
    Err(ApiError::from_status(status.as_u16(), details))
}
