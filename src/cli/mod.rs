//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.
//! Every pipeline command is recorded in the operation journal,
//! whether it succeeds or fails.

pub mod archive;
pub mod config;
pub mod decrypt;
pub mod encrypt;
pub mod keygen;

use std::path::Path;

use serde::Serialize;
use tracing::warn;

pub use archive::{handle_pack, handle_unpack};
pub use config::{handle_config, handle_history};
pub use decrypt::{handle_decrypt, handle_open};
pub use encrypt::{handle_encrypt, handle_seal, EncryptFlags};
pub use keygen::{handle_keygen, KeygenArgs};

use crate::audit::{AuditEntry, AuditLogger, Operation};
use crate::config::{SealPaths, Settings};
use crate::error::SealResult;

/// Paths, settings and the journal shared by all handlers
pub struct AppContext {
    pub paths: SealPaths,
    pub settings: Settings,
    journal: Option<AuditLogger>,
}

impl AppContext {
    pub fn new(paths: SealPaths, settings: Settings) -> Self {
        let journal = settings
            .audit
            .enabled
            .then(|| AuditLogger::new(paths.audit_log()));
        Self {
            paths,
            settings,
            journal,
        }
    }

    /// Journal the outcome of an operation
    ///
    /// A journal write failure is logged and otherwise ignored.
    pub fn record<T: Serialize>(
        &self,
        operation: Operation,
        source: &Path,
        destination: &Path,
        result: &SealResult<T>,
    ) {
        let Some(journal) = &self.journal else {
            return;
        };

        let source = source.display().to_string();
        let destination = destination.display().to_string();
        let entry = match result {
            Ok(report) => AuditEntry::success(operation, source, destination, report),
            Err(err) => AuditEntry::failure(operation, source, destination, err),
        };

        if let Err(err) = journal.log(&entry) {
            warn!(error = %err, "failed to write journal entry");
        }
    }
}
