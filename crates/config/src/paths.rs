//! Path utilities

use std::path::PathBuf;

/// Local data directory (~/.julep-assistant)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".julep-assistant"))
        .unwrap_or_else(|| PathBuf::from(".julep-assistant"))
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Expand a leading `~/` against the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
