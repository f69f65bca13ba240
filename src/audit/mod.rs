//! Operation journal for sealzip
//!
//! Records every pack, unpack, encrypt, decrypt, seal, open and keygen
//! run in an append-only log, one JSON object per line.
//!
//! # Example
//!
//! ```rust,ignore
//! use sealzip::audit::{AuditEntry, AuditLogger, Operation};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::success(Operation::Encrypt, "a.zip", "a.zip.pgp", &report);
//! logger.log(&entry)?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, Operation, Outcome};
pub use logger::AuditLogger;
