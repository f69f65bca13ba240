//! Path management for sealzip
//!
//! Provides XDG-compliant path resolution for the settings file and the
//! operation journal.
//!
//! ## Path Resolution Order
//!
//! 1. `SEALZIP_HOME` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/sealzip` or `~/.config/sealzip`
//! 3. Windows: `%APPDATA%\sealzip`

use std::path::PathBuf;

use crate::error::SealError;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "SEALZIP_HOME";

/// Manages all paths used by sealzip
#[derive(Debug, Clone)]
pub struct SealPaths {
    /// Base directory for all sealzip state
    base_dir: PathBuf,
}

impl SealPaths {
    /// Create a new SealPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, SealError> {
        let base_dir = match std::env::var(HOME_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create SealPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/sealzip/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the operation journal
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), SealError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| SealError::Io(format!("Failed to create base directory: {}", e)))
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, SealError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("sealzip"));
        }
    }
    let home = std::env::var("HOME")
        .map_err(|_| SealError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".config").join("sealzip"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, SealError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| SealError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("sealzip"))
}
