use std::path::PathBuf;

const APPLICATION: &str = "runwatch";

/// Standardized application directories for runwatch.
///
/// - User-level config: uses OS-specific dirs
/// - User-level data: uses OS-specific dirs, falling back to ~/.runwatch
pub struct AppPaths;

impl AppPaths {
    /// Return the user-level config directory (platform-specific)
    pub fn user_config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APPLICATION).map(|d| d.config_dir().to_path_buf())
    }

    /// Return the user-level data directory (platform-specific)
    pub fn user_data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APPLICATION)
            .map(|d| d.data_dir().to_path_buf())
            .or_else(|| dirs::home_dir().map(|home| home.join(format!(".{APPLICATION}"))))
    }

    /// Directory for timestamped log files.
    pub fn log_dir() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_lives_under_data_dir() {
        if let (Some(data), Some(logs)) = (AppPaths::user_data_dir(), AppPaths::log_dir()) {
            assert!(logs.starts_with(data));
            assert!(logs.ends_with("logs"));
        }
    }
}
