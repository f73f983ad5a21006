//! Shared configuration paths for tablecall.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.tablecall/
//! └── config/
//!     └── .env.local   # bot token and overrides
//! ```
//!
//! # Environment Variables
//!
//! - `TABLECALL_STATE_DIR`: Override the base state directory
//! - `TABLECALL_CONFIG_DIR`: Override the config directory

use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "TABLECALL_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "TABLECALL_CONFIG_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".tablecall";

const CONFIG_SUBDIR: &str = "config";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the tablecall state directory.
///
/// Resolved from `TABLECALL_STATE_DIR`, then `~/.tablecall`, then
/// `.tablecall` in the current directory.
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the .env.local file path.
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_dir_name() {
        let dir = state_dir();
        assert!(dir.is_absolute() || dir.ends_with(".tablecall"));
    }

    #[test]
    fn test_config_dir_name() {
        let dir = config_dir();
        assert!(dir.ends_with("config") || dir.to_string_lossy().contains("config"));
    }

    #[test]
    fn test_env_file_name() {
        assert!(env_file().ends_with(".env.local"));
    }
}
