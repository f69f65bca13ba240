//! Service layer for sealzip
//!
//! The service layer implements the pipeline stages on top of the crypto
//! and storage layers: zip packing, encryption, decryption, and the
//! combined seal/open flows.

pub mod archiver;
pub mod decryptor;
pub mod encryptor;
pub mod pipeline;

pub use archiver::{compress_directory, extract_archive, ArchiveReport};
pub use decryptor::{decrypt_file, DecryptReport, Decryptor};
pub use encryptor::{encrypt_file, encrypt_file_with, EncryptOptions, EncryptReport, Encryptor};
pub use pipeline::{open_container, seal_directory, OpenReport, SealReport};
