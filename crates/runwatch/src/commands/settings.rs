use super::Command;
use crate::error::Error;
use async_trait::async_trait;
use eyre::Result;
use runwatch_core::config::Settings;
use std::io::Write;

pub struct SettingsCommand {
    pub action: SettingsAction,
}

pub enum SettingsAction {
    Show,
    Path,
    Reset,
}

#[async_trait]
impl Command for SettingsCommand {
    async fn execute(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        match &self.action {
            SettingsAction::Show => show(&mut stdout).map_err(Into::into),
            SettingsAction::Path => {
                writeln!(stdout, "{}", Settings::config_path()?.display())?;
                Ok(())
            }
            SettingsAction::Reset => {
                let path = Settings::default().save()?;
                writeln!(stdout, "Settings reset to defaults at {}", path.display())?;
                Ok(())
            }
        }
    }
}

fn show(out: &mut impl Write) -> std::result::Result<(), Error> {
    let path = Settings::config_path()?;
    let settings = Settings::load_from(&path)?;
    writeln!(out, "Settings file: {}", path.display())?;
    writeln!(out, "\n{}", redacted(&settings).to_toml()?)?;
    Ok(())
}

fn redacted(settings: &Settings) -> Settings {
    let mut shown = settings.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("********".to_string());
    }
    shown
}
