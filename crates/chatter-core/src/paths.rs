//! Filesystem locations used by chatter

use std::path::PathBuf;

use crate::constants;

/// Root config directory (`~/.chatter`)
///
/// Falls back to the current directory when no home directory is known.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::fs::CONFIG_DIR_NAME)
}

/// Default config file (`~/.chatter/config.toml`)
pub fn config_file() -> PathBuf {
    config_dir().join(constants::fs::CONFIG_FILE_NAME)
}

/// Log directory (`~/.chatter/logs`)
pub fn logs_dir() -> PathBuf {
    config_dir().join(constants::fs::LOGS_DIR_NAME)
}
