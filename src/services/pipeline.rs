//! Whole-directory pipelines
//!
//! `seal` packs a directory and encrypts the archive in one step;
//! `open` reverses it. The intermediate archive lives in a scratch
//! directory that is removed when the call returns.

use std::path::Path;

use serde::Serialize;

use super::archiver::{compress_directory, extract_archive, ArchiveReport};
use super::decryptor::{decrypt_file, DecryptReport};
use super::encryptor::{encrypt_file_with, EncryptOptions, EncryptReport};
use crate::crypto::{KeySelector, Passphrase};
use crate::error::{SealError, SealResult};

#[derive(Debug, Clone, Serialize)]
pub struct SealReport {
    pub archive: ArchiveReport,
    pub encryption: EncryptReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenReport {
    pub decryption: DecryptReport,
    pub archive: ArchiveReport,
}

/// Pack `source_dir` and encrypt the archive into `output`
pub fn seal_directory<S>(
    source_dir: &Path,
    output: &Path,
    public_key: &Path,
    options: EncryptOptions,
    selector: &S,
) -> SealResult<SealReport>
where
    S: KeySelector + ?Sized,
{
    let scratch = scratch_dir()?;
    let archive_path = scratch.path().join(archive_name(source_dir));

    let archive = compress_directory(source_dir, &archive_path)?;
    let encryption = encrypt_file_with(&archive_path, output, public_key, options, selector)?;

    Ok(SealReport {
        archive,
        encryption,
    })
}

/// Decrypt `input` and extract the archive under `dest_dir`
pub fn open_container(
    input: &Path,
    private_key: &Path,
    passphrase: &Passphrase,
    dest_dir: &Path,
) -> SealResult<OpenReport> {
    let scratch = scratch_dir()?;
    let archive_path = scratch.path().join("payload.zip");

    let decryption = decrypt_file(input, private_key, passphrase, &archive_path)?;
    let archive = extract_archive(&archive_path, dest_dir)?;

    Ok(OpenReport {
        decryption,
        archive,
    })
}

fn scratch_dir() -> SealResult<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix("sealzip-")
        .tempdir()
        .map_err(|e| SealError::Io(format!("Failed to create scratch directory: {}", e)))
}

/// `<directory name>.zip`, stored as the literal file name
fn archive_name(source_dir: &Path) -> String {
    let stem = source_dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "archive".to_string());
    format!("{}.zip", stem)
}
