//! User settings for sealzip
//!
//! Holds the defaults applied to `encrypt` and `seal` when the matching
//! command-line flag is absent, plus the operation journal toggle.

use serde::{Deserialize, Serialize};

use super::paths::SealPaths;
use crate::crypto::{CipherChoice, CompressionChoice, KeyPolicy};
use crate::error::SealError;
use crate::storage::write_json_atomic;

/// Defaults for the encryption pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionDefaults {
    /// Symmetric cipher for the session key
    #[serde(default)]
    pub cipher: CipherChoice,

    /// Compression applied to the literal data
    #[serde(default)]
    pub compression: CompressionChoice,

    /// Wrap output in ASCII armor
    #[serde(default)]
    pub armor: bool,

    /// Append a modification detection code
    #[serde(default = "default_integrity")]
    pub integrity: bool,

    /// How the recipient key is picked from the key ring
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

fn default_integrity() -> bool {
    true
}

impl Default for EncryptionDefaults {
    fn default() -> Self {
        Self {
            cipher: CipherChoice::default(),
            compression: CompressionChoice::default(),
            armor: false,
            integrity: default_integrity(),
            key_policy: KeyPolicy::default(),
        }
    }
}

/// Operation journal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Whether each operation is appended to the journal
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
}

fn default_audit_enabled() -> bool {
    true
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
        }
    }
}

/// User settings for sealzip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Encryption pipeline defaults
    #[serde(default)]
    pub encryption: EncryptionDefaults,

    /// Operation journal
    #[serde(default)]
    pub audit: AuditSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            encryption: EncryptionDefaults::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_default(paths: &SealPaths) -> Result<Self, SealError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| SealError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| SealError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SealPaths) -> Result<(), SealError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}
