// Path utilities
// Locations of Charles' roaming data and of CharlesFlow's own data directory

use std::path::PathBuf;

/// Directory name used under the platform data dir
pub const APP_IDENTIFIER: &str = "charlesflow";

/// Snapshot root inside the app data dir
pub const BACKUP_DIR_NAME: &str = "back";

/// Capture cache inside the app data dir
pub const CACHE_DIR_NAME: &str = "package";

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or_else(|| "Could not determine application data directory".to_string())
}

/// App data dir, falling back to the system temp dir when the platform has none
pub fn app_data_dir_or_temp() -> PathBuf {
    get_app_data_dir().unwrap_or_else(|e| {
        log::warn!("[Paths] {}, falling back to temp dir", e);
        std::env::temp_dir().join(APP_IDENTIFIER)
    })
}

/// Roaming data directory Charles writes its settings to
///
/// `%AppData%` on Windows, the platform config dir elsewhere.
pub fn charles_data_dir() -> Option<PathBuf> {
    let dir = dirs::config_dir().map(|p| p.join("Charles"));
    match &dir {
        Some(path) => log::debug!("[Paths] Charles roaming data: {}", path.display()),
        None => log::error!("[Paths] Cannot locate roaming data dir, config protection disabled"),
    }
    dir
}

pub fn default_charles_config_file() -> Option<PathBuf> {
    charles_data_dir().map(|d| d.join("charles.config"))
}

pub fn default_charles_profiles_dir() -> Option<PathBuf> {
    charles_data_dir().map(|d| d.join("data").join("profiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_data_dir_ends_with_identifier() {
        assert!(app_data_dir_or_temp().ends_with(APP_IDENTIFIER));
    }

    #[test]
    fn test_charles_paths_share_root() {
        if let (Some(config), Some(profiles)) =
            (default_charles_config_file(), default_charles_profiles_dir())
        {
            assert_eq!(config.parent(), profiles.parent().and_then(|p| p.parent()));
        }
    }
}
