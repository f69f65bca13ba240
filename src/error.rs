//! Custom error types for sealzip
//!
//! This module defines the error hierarchy for the pack/encrypt/decrypt
//! pipeline using thiserror for ergonomic error definitions. Every variant
//! maps to one failure kind the CLI reports before exiting non-zero.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for sealzip operations
#[derive(Error, Debug)]
pub enum SealError {
    /// A required input file or directory does not exist
    #[error("{kind} not found: {}", path.display())]
    NotFound { kind: &'static str, path: PathBuf },

    /// Malformed call parameters (e.g. an empty output path)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable encryption or decryption key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A matching secret key exists but the passphrase did not unlock it
    #[error("Failed to unlock secret key {key_id}: wrong passphrase or damaged key")]
    Unlock { key_id: String },

    /// Integrity tag verification failed on decrypt
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Unexpected object kind while parsing a container
    #[error("Format error: {0}")]
    Format(String),

    /// Failure reported by the OpenPGP or cipher layer
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Zip container errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl SealError {
    /// Create a "not found" error for a regular file
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            kind: "File",
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a "not found" error for a directory
    pub fn dir_not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            kind: "Directory",
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a "not found" error for a key ring file
    pub fn key_file_not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            kind: "Key file",
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Wrap a crypto-library failure with the stage that produced it
    pub fn crypto(stage: &str, err: impl std::fmt::Display) -> Self {
        Self::Crypto(format!("{}: {}", stage, err))
    }

    /// Stable name of the failure kind, used in CLI output and the audit log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::InvalidArgument(_) => "InvalidArgumentError",
            Self::KeyNotFound(_) => "KeyNotFoundError",
            Self::Unlock { .. } => "UnlockError",
            Self::Integrity(_) => "IntegrityError",
            Self::Format(_) => "FormatError",
            Self::Crypto(_) => "CryptoError",
            Self::Io(_) => "IOError",
            Self::Archive(_) => "ArchiveError",
            Self::Config(_) => "ConfigError",
            Self::Json(_) => "JsonError",
        }
    }

    /// Process exit status for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_) => 2,
            Self::NotFound { .. } => 3,
            Self::KeyNotFound(_) | Self::Unlock { .. } => 4,
            Self::Integrity(_) => 5,
            Self::Format(_) | Self::Archive(_) => 6,
            Self::Crypto(_) => 7,
            Self::Io(_) => 8,
            Self::Config(_) | Self::Json(_) => 9,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for SealError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SealError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for SealError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e.to_string()),
            other => Self::Archive(other.to_string()),
        }
    }
}

/// Result type alias for sealzip operations
pub type SealResult<T> = Result<T, SealError>;
