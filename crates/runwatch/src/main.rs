use clap::Parser;
use eyre::Result;
use runwatch::cli::config::{load_env, resolve_settings};
use runwatch::cli::{Cli, Commands, SettingsCommands};
use runwatch::commands::{
    Command, replay::ReplayCommand, run::RunCommand, script::ScriptCommand,
    settings::{SettingsAction, SettingsCommand},
};
use runwatch_core::api::RunRequest;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    // Load .env before parsing so it can supply RUNWATCH_* values
    load_env()?;
    let cli = Cli::parse();

    // Initialize tracing (level configured via RUST_LOG env var)
    let log_path = runwatch_core::utils::init_tracing()?;
    debug!(target: "runwatch::cli", log_path = ?log_path, "starting");

    let command: Box<dyn Command> = match cli.command.clone() {
        Commands::Run {
            project,
            url,
            stages,
        } => Box::new(RunCommand {
            settings: resolve_settings(&cli)?,
            request: RunRequest {
                project_name: project,
                url,
                stages,
            },
        }),
        Commands::Script {
            project,
            file,
            answer,
        } => Box::new(ScriptCommand {
            settings: resolve_settings(&cli)?,
            project,
            file,
            answer,
        }),
        Commands::Replay {
            file,
            mode,
            stages,
            framing,
            chunk_size,
            pace_ms,
        } => Box::new(ReplayCommand {
            settings: resolve_settings(&cli)?,
            file,
            mode,
            stages,
            framing,
            chunk_size,
            pace_ms,
        }),
        Commands::Settings { action } => Box::new(SettingsCommand {
            action: match action {
                SettingsCommands::Show => SettingsAction::Show,
                SettingsCommands::Path => SettingsAction::Path,
                SettingsCommands::Reset => SettingsAction::Reset,
            },
        }),
    };

    command.execute().await
}
