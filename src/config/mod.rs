//! Configuration module for sealzip
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Encryption pipeline defaults

pub mod paths;
pub mod settings;

pub use paths::SealPaths;
pub use settings::Settings;
