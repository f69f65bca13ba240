//! sealzip - zip a directory and encrypt it to an OpenPGP key
//!
//! This library provides the pipeline behind the `sealzip` command:
//! a directory is packed into a zip archive, and the archive is
//! encrypted to the holder of an OpenPGP public key (session key wrapped
//! to the recipient, compressed literal data, optional ASCII armor and
//! modification detection code). Decryption and extraction reverse it.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `crypto`: OpenPGP building blocks (keys, session keys, armor, cipher records)
//! - `storage`: Staged output files with atomic commit
//! - `services`: Archiver, encryptor, decryptor and the combined pipelines
//! - `audit`: Operation journal
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use sealzip::services::{compress_directory, encrypt_file, EncryptOptions};
//!
//! compress_directory("docs".as_ref(), "docs.zip".as_ref())?;
//! encrypt_file(
//!     "docs.zip".as_ref(),
//!     "docs.zip.pgp".as_ref(),
//!     "alice.asc".as_ref(),
//!     EncryptOptions::new(true, true),
//! )?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod services;
pub mod storage;

pub use error::{SealError, SealResult};
