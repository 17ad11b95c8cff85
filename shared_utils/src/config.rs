use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured directory does not exist.
    #[error("Configured directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A configured path exists but is not a directory.
    #[error("Configured path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Checks that `path` names an existing directory.
pub fn require_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingDirectory(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}
