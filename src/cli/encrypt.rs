//! Encrypt and seal commands
//!
//! Flags given on the command line win over the `encryption` section of
//! the settings file.

use std::path::Path;

use clap::Args;

use super::AppContext;
use crate::audit::Operation;
use crate::config::settings::EncryptionDefaults;
use crate::crypto::{CipherChoice, CompressionChoice, KeyPolicy};
use crate::error::SealResult;
use crate::services::{encrypt_file_with, seal_directory, EncryptOptions};

/// Options shared by `encrypt` and `seal`
#[derive(Debug, Clone, Default, Args)]
pub struct EncryptFlags {
    /// Wrap the output in ASCII armor
    #[arg(long, overrides_with = "no_armor")]
    pub armor: bool,

    /// Write binary output
    #[arg(long, overrides_with = "armor")]
    pub no_armor: bool,

    /// Append a modification detection code (on unless the settings file
    /// turns it off)
    #[arg(long, overrides_with = "no_integrity")]
    pub integrity: bool,

    /// Omit the modification detection code (tampering goes undetected)
    #[arg(long, overrides_with = "integrity")]
    pub no_integrity: bool,

    /// Symmetric cipher for the payload [default: aes256, or the settings
    /// file value]
    #[arg(long, value_enum)]
    pub cipher: Option<CipherChoice>,

    /// Compression for the literal data
    #[arg(long, value_enum)]
    pub compression: Option<CompressionChoice>,

    /// How the recipient key is chosen from the key ring
    #[arg(long, value_enum)]
    pub key_policy: Option<KeyPolicy>,
}

impl EncryptFlags {
    /// Merge flags over the configured defaults
    pub fn resolve(&self, defaults: &EncryptionDefaults) -> (EncryptOptions, KeyPolicy) {
        let options = EncryptOptions {
            armor: toggle(self.armor, self.no_armor, defaults.armor),
            integrity: toggle(self.integrity, self.no_integrity, defaults.integrity),
            cipher: self.cipher.unwrap_or(defaults.cipher),
            compression: self.compression.unwrap_or(defaults.compression),
        };
        (options, self.key_policy.unwrap_or(defaults.key_policy))
    }
}

fn toggle(on: bool, off: bool, default: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => default,
    }
}

/// Encrypt a file to a public key
pub fn handle_encrypt(
    ctx: &AppContext,
    input: &Path,
    output: &Path,
    public_key: &Path,
    flags: &EncryptFlags,
) -> SealResult<()> {
    let (options, policy) = flags.resolve(&ctx.settings.encryption);

    let result = encrypt_file_with(input, output, public_key, options, &policy);
    ctx.record(Operation::Encrypt, input, output, &result);
    let report = result?;

    println!(
        "Encrypted {} to key {} ({}{}{})",
        input.display(),
        report.recipient,
        report.cipher,
        if report.armored { ", armored" } else { "" },
        if report.integrity { "" } else { ", NO integrity protection" }
    );
    Ok(())
}

/// Pack a directory and encrypt it in one step
pub fn handle_seal(
    ctx: &AppContext,
    source_dir: &Path,
    output: &Path,
    public_key: &Path,
    flags: &EncryptFlags,
) -> SealResult<()> {
    let (options, policy) = flags.resolve(&ctx.settings.encryption);

    let result = seal_directory(source_dir, output, public_key, options, &policy);
    ctx.record(Operation::Seal, source_dir, output, &result);
    let report = result?;

    println!(
        "Sealed {} file(s) from {} into {} for key {}",
        report.archive.files,
        source_dir.display(),
        output.display(),
        report.encryption.recipient
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_fall_back_to_settings() {
        let defaults = EncryptionDefaults {
            armor: true,
            cipher: CipherChoice::Cast5,
            ..EncryptionDefaults::default()
        };

        let (options, policy) = EncryptFlags::default().resolve(&defaults);
        assert!(options.armor);
        assert!(options.integrity);
        assert_eq!(options.cipher, CipherChoice::Cast5);
        assert_eq!(policy, KeyPolicy::First);
    }

    #[test]
    fn test_flags_override_settings() {
        let flags = EncryptFlags {
            no_armor: true,
            no_integrity: true,
            compression: Some(CompressionChoice::Bzip2),
            key_policy: Some(KeyPolicy::Subkey),
            ..EncryptFlags::default()
        };
        let defaults = EncryptionDefaults {
            armor: true,
            ..EncryptionDefaults::default()
        };

        let (options, policy) = flags.resolve(&defaults);
        assert!(!options.armor);
        assert!(!options.integrity);
        assert_eq!(options.compression, CompressionChoice::Bzip2);
        assert_eq!(policy, KeyPolicy::Subkey);
    }
}
