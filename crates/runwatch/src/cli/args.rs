use clap::{Parser, Subcommand, ValueEnum};
use runwatch_core::api::Stage;
use runwatch_core::events::Framing;
use std::path::PathBuf;

/// Start load-test runs on a remote runner and follow their progress.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Base URL of the test runner (defaults to the settings file value)
    #[arg(long, env = "RUNWATCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// API key sent to the runner
    #[arg(long, env = "RUNWATCH_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Milliseconds to keep a finished run on screen before showing its result link
    #[arg(long, global = true)]
    pub grace_ms: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start a run built from ramp stages
    Run {
        /// Project name shown in the results
        #[arg(long)]
        project: String,
        /// Target URL to load
        #[arg(long)]
        url: String,
        /// Ramp stage as DURATION:TARGET, e.g. 30s:10 (repeatable)
        #[arg(long = "stage", value_name = "DURATION:TARGET", required = true)]
        stages: Vec<Stage>,
    },
    /// Upload a k6 script and run it
    Script {
        /// Project name shown in the results
        #[arg(long)]
        project: String,
        /// Path to the .js script
        #[arg(long)]
        file: PathBuf,
        /// Challenge answer; prompted for when omitted
        #[arg(long)]
        answer: Option<String>,
    },
    /// Replay captured run output offline
    Replay {
        /// File containing the captured stream
        file: PathBuf,
        /// How the run was started
        #[arg(long, value_enum, default_value_t = ModeArg::Builder)]
        mode: ModeArg,
        /// Ramp stage used for time-based progress (repeatable)
        #[arg(long = "stage", value_name = "DURATION:TARGET")]
        stages: Vec<Stage>,
        /// Line framing of the capture (defaults to the settings file value)
        #[arg(long)]
        framing: Option<Framing>,
        /// Bytes per replayed fragment
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Delay between fragments in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// Manage user settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Builder,
    Script,
}

#[derive(Subcommand, Clone)]
pub enum SettingsCommands {
    /// Show current settings
    Show,
    /// Print the settings file location
    Path,
    /// Reset settings to defaults
    Reset,
}
