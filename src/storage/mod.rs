//! Storage layer for sealzip
//!
//! Provides staged output files with atomic commit and atomic JSON writes.

pub mod file_io;

pub use file_io::{write_json_atomic, StagedFile};
