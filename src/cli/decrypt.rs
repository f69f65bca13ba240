//! Decrypt and open commands

use std::path::Path;

use super::AppContext;
use crate::audit::Operation;
use crate::crypto::Passphrase;
use crate::error::{SealError, SealResult};
use crate::services::{decrypt_file, open_container};

/// Passphrase argument that asks for hidden input instead
pub const PROMPT_MARKER: &str = "-";

/// Decrypt a file with a secret key
pub fn handle_decrypt(
    ctx: &AppContext,
    input: &Path,
    private_key: &Path,
    passphrase: &str,
    output: &Path,
) -> SealResult<()> {
    let passphrase = resolve_passphrase(passphrase)?;

    let result = decrypt_file(input, private_key, &passphrase, output);
    ctx.record(Operation::Decrypt, input, output, &result);
    let report = result?;

    println!(
        "Decrypted {} into {} ({} bytes, key {})",
        input.display(),
        output.display(),
        report.payload.bytes,
        report.key_id
    );
    if !report.integrity_protected {
        println!("Warning: message had no integrity protection; it may have been modified");
    }
    Ok(())
}

/// Decrypt and extract in one step
pub fn handle_open(
    ctx: &AppContext,
    input: &Path,
    private_key: &Path,
    passphrase: &str,
    dest_dir: &Path,
) -> SealResult<()> {
    let passphrase = resolve_passphrase(passphrase)?;

    let result = open_container(input, private_key, &passphrase, dest_dir);
    ctx.record(Operation::Open, input, dest_dir, &result);
    let report = result?;

    println!(
        "Opened {} into {} ({} file(s))",
        input.display(),
        dest_dir.display(),
        report.archive.files
    );
    if !report.decryption.integrity_protected {
        println!("Warning: message had no integrity protection; it may have been modified");
    }
    Ok(())
}

/// Use the argument as given, or prompt when it is `-`
pub fn resolve_passphrase(arg: &str) -> SealResult<Passphrase> {
    if arg == PROMPT_MARKER {
        prompt_passphrase("Passphrase: ")
    } else {
        Ok(Passphrase::from(arg))
    }
}

/// Prompt for a passphrase (hidden input)
pub fn prompt_passphrase(prompt: &str) -> SealResult<Passphrase> {
    rpassword::prompt_password(prompt)
        .map(Passphrase::from)
        .map_err(|e| SealError::Io(format!("Failed to read passphrase: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_passphrase() {
        let pass = resolve_passphrase("123456").unwrap();
        assert_eq!(pass.as_str(), "123456");
    }
}
