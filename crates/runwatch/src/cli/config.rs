use dotenvy::dotenv;
use eyre::Result;
use runwatch_core::config::Settings;

use crate::cli::Cli;

pub fn load_env() -> Result<()> {
    dotenv().ok();
    Ok(())
}

/// Settings file values, overridden by flags and their environment variables.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load()?.with_overrides(cli.api_url.clone(), cli.api_key.clone());
    if let Some(grace_ms) = cli.grace_ms {
        settings.grace_period_ms = grace_ms;
    }
    Ok(settings)
}
