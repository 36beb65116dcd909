use colored::Colorize;
use runwatch_core::session::{RunSnapshot, SessionOutcome, StepStatus, Toast, ToastKind};
use std::io::{self, Write};

/// Writes what changed between successive snapshots of one session.
///
/// Snapshots may be skipped by the watch channel; everything here is derived
/// from cumulative state, so a skipped snapshot only merges two updates.
#[derive(Debug, Default)]
pub struct SnapshotRenderer {
    log_lines: usize,
    progress: Option<u8>,
    statuses: Vec<StepStatus>,
    toast: Option<Toast>,
    outcome_shown: bool,
    navigation_shown: bool,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &RunSnapshot, out: &mut impl Write) -> io::Result<()> {
        for line in snapshot.log.iter().skip(self.log_lines) {
            writeln!(out, "  {}", line.dimmed())?;
        }
        self.log_lines = snapshot.log.len();

        for (index, step) in snapshot.steps.iter().enumerate() {
            if self.statuses.get(index) == Some(&step.status) {
                continue;
            }
            if self.statuses.is_empty() && step.status == StepStatus::Pending {
                continue;
            }
            writeln!(out, "{} {}", status_marker(step.status), step.label)?;
        }
        self.statuses = snapshot.steps.iter().map(|step| step.status).collect();

        if self.progress != Some(snapshot.progress) {
            writeln!(out, "{}", progress_bar(snapshot.progress).bold())?;
            self.progress = Some(snapshot.progress);
        }

        if snapshot.toast != self.toast {
            if let Some(toast) = &snapshot.toast {
                match toast.kind {
                    ToastKind::Success => writeln!(out, "{}", toast.message.green().bold())?,
                    ToastKind::Error => writeln!(out, "{}", toast.message.red().bold())?,
                }
            }
            self.toast = snapshot.toast.clone();
        }

        if !self.outcome_shown {
            if let Some(outcome) = &snapshot.outcome {
                match outcome {
                    SessionOutcome::Succeeded { run_id } => {
                        writeln!(out, "{} run {}", "Completed".green().bold(), run_id)?;
                    }
                    SessionOutcome::Failed { message } => {
                        writeln!(out, "{} {}", "Failed:".red().bold(), message)?;
                    }
                }
                self.outcome_shown = true;
            }
        }

        if !self.navigation_shown {
            if let Some(route) = &snapshot.navigate_to {
                writeln!(out, "Results: {}", route.path().cyan())?;
                self.navigation_shown = true;
            }
        }

        out.flush()
    }
}

fn status_marker(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => "·".dimmed().to_string(),
        StepStatus::Running => "▶".yellow().to_string(),
        StepStatus::Done => "✓".green().to_string(),
        StepStatus::Skip => "–".dimmed().to_string(),
    }
}

const BAR_WIDTH: usize = 20;

pub fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress
    )
}
