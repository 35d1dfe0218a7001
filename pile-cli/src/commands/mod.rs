//! Subcommand implementations.

pub mod init;
pub mod inspect;
pub mod serve;

use std::path::{Path, PathBuf};

use pile::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// `--config` when given, `~/.pile/config.ini` otherwise.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(config_file_path)
}

pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}
