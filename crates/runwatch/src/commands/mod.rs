use async_trait::async_trait;
use eyre::Result;
use runwatch_core::config::Settings;
use runwatch_core::session::{RunHandle, RunMode, SessionOptions, SessionOutcome};
use std::io::Write;
use tracing::info;

use crate::render::SnapshotRenderer;

pub mod replay;
pub mod run;
pub mod script;
pub mod settings;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

pub fn session_options(settings: &Settings, mode: RunMode) -> Result<SessionOptions> {
    Ok(SessionOptions::new(mode)
        .with_registry(settings.step_registry()?)
        .with_framing(settings.framing)
        .with_grace_period(settings.grace_period()))
}

/// Renders a session until nothing further will change, cancelling it on
/// Ctrl-C, and returns its outcome.
pub async fn watch_session(handle: RunHandle, out: &mut (impl Write + Send)) -> Result<SessionOutcome> {
    let mut renderer = SnapshotRenderer::new();
    let mut snapshots = handle.snapshots();
    let mut interrupted = false;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        renderer.render(&snapshot, out)?;
        if snapshot.is_final() {
            break;
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                info!(target: "runwatch::cli", session_id = %handle.id(), "interrupted, cancelling run");
                interrupted = true;
                handle.cancel();
            }
        }
    }

    Ok(handle.wait().await?)
}

/// Turns a failed outcome into an error so the process exits non-zero.
pub fn outcome_result(outcome: SessionOutcome) -> Result<()> {
    match outcome {
        SessionOutcome::Succeeded { .. } => Ok(()),
        SessionOutcome::Failed { message } => Err(eyre::eyre!("Run failed: {message}")),
    }
}
