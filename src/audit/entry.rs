//! Journal entry data structures
//!
//! Defines the operations that are journaled, their outcome, and the
//! entry format itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SealError;

/// Pipeline operations that are journaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Pack,
    Unpack,
    Encrypt,
    Decrypt,
    Seal,
    Open,
    Keygen,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Pack => write!(f, "PACK"),
            Operation::Unpack => write!(f, "UNPACK"),
            Operation::Encrypt => write!(f, "ENCRYPT"),
            Operation::Decrypt => write!(f, "DECRYPT"),
            Operation::Seal => write!(f, "SEAL"),
            Operation::Open => write!(f, "OPEN"),
            Operation::Keygen => write!(f, "KEYGEN"),
        }
    }
}

/// Whether the operation completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "ok"),
            Outcome::Failure => write!(f, "FAILED"),
        }
    }
}

/// A single journal entry
///
/// Records one operation with its input and output paths. Successful
/// entries carry the operation report; failed ones carry the error kind
/// and message. Passphrases and key material are never recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation finished (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// Input path
    pub source: String,

    /// Output path
    pub destination: String,

    pub outcome: Outcome,

    /// Stable error kind name, e.g. `IntegrityError`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// JSON representation of the operation report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Create an entry for a completed operation
    pub fn success<T: Serialize>(
        operation: Operation,
        source: impl Into<String>,
        destination: impl Into<String>,
        report: &T,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            source: source.into(),
            destination: destination.into(),
            outcome: Outcome::Success,
            error_kind: None,
            error_message: None,
            details: serde_json::to_value(report).ok(),
        }
    }

    /// Create an entry for a failed operation
    pub fn failure(
        operation: Operation,
        source: impl Into<String>,
        destination: impl Into<String>,
        error: &SealError,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            source: source.into(),
            destination: destination.into(),
            outcome: Outcome::Failure,
            error_kind: Some(error.kind().to_string()),
            error_message: Some(error.to_string()),
            details: None,
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} -> {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.outcome,
            self.operation,
            self.source,
            self.destination
        );

        if let (Some(kind), Some(message)) = (&self.error_kind, &self.error_message) {
            output.push_str(&format!("\n  {}: {}", kind, message));
        }

        output
    }
}
