//! Session keys, cipher and compression choices
//!
//! A session key is generated fresh for every encryption and is only ever
//! written to disk wrapped in a PKESK packet for the recipient.

use std::fmt;

use clap::ValueEnum;
use sequoia_openpgp::crypto::SessionKey;
use sequoia_openpgp::types::{CompressionAlgorithm, SymmetricAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};

/// Symmetric cipher used for the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CipherChoice {
    /// CAST5, 64-bit block (the classic OpenPGP default)
    Cast5,
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl CipherChoice {
    /// OpenPGP algorithm identifier
    pub fn algorithm(self) -> SymmetricAlgorithm {
        match self {
            CipherChoice::Cast5 => SymmetricAlgorithm::CAST5,
            CipherChoice::Aes128 => SymmetricAlgorithm::AES128,
            CipherChoice::Aes192 => SymmetricAlgorithm::AES192,
            CipherChoice::Aes256 => SymmetricAlgorithm::AES256,
        }
    }

    /// Map an algorithm found in a session-key block back to a choice
    pub fn from_algorithm(algo: SymmetricAlgorithm) -> Option<Self> {
        match algo {
            SymmetricAlgorithm::CAST5 => Some(CipherChoice::Cast5),
            SymmetricAlgorithm::AES128 => Some(CipherChoice::Aes128),
            SymmetricAlgorithm::AES192 => Some(CipherChoice::Aes192),
            SymmetricAlgorithm::AES256 => Some(CipherChoice::Aes256),
            _ => None,
        }
    }

    /// Cipher block size in bytes
    pub fn block_size(self) -> usize {
        match self {
            CipherChoice::Cast5 => 8,
            CipherChoice::Aes128 | CipherChoice::Aes192 | CipherChoice::Aes256 => 16,
        }
    }

    /// Key size in bytes
    pub fn key_size(self) -> usize {
        match self {
            CipherChoice::Cast5 | CipherChoice::Aes128 => 16,
            CipherChoice::Aes192 => 24,
            CipherChoice::Aes256 => 32,
        }
    }
}

impl fmt::Display for CipherChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherChoice::Cast5 => write!(f, "cast5"),
            CipherChoice::Aes128 => write!(f, "aes128"),
            CipherChoice::Aes192 => write!(f, "aes192"),
            CipherChoice::Aes256 => write!(f, "aes256"),
        }
    }
}

/// Compression applied to the literal data record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionChoice {
    /// Raw DEFLATE
    #[default]
    Zip,
    Zlib,
    Bzip2,
    /// Compressed-data packet with algorithm 0
    #[serde(rename = "none")]
    #[value(name = "none")]
    Uncompressed,
}

impl CompressionChoice {
    pub fn algorithm(self) -> CompressionAlgorithm {
        match self {
            CompressionChoice::Zip => CompressionAlgorithm::Zip,
            CompressionChoice::Zlib => CompressionAlgorithm::Zlib,
            CompressionChoice::Bzip2 => CompressionAlgorithm::BZip2,
            CompressionChoice::Uncompressed => CompressionAlgorithm::Uncompressed,
        }
    }
}

impl fmt::Display for CompressionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionChoice::Zip => write!(f, "zip"),
            CompressionChoice::Zlib => write!(f, "zlib"),
            CompressionChoice::Bzip2 => write!(f, "bzip2"),
            CompressionChoice::Uncompressed => write!(f, "none"),
        }
    }
}

/// Generate a fresh random session key for the chosen cipher
///
/// The key bytes come from the OpenPGP library's CSPRNG and live in
/// protected memory that is cleared on drop.
pub fn generate_session_key(cipher: CipherChoice) -> SealResult<SessionKey> {
    let size = cipher
        .algorithm()
        .key_size()
        .map_err(|e| SealError::crypto("sizing session key", e))?;
    Ok(SessionKey::new(size))
}
