//! Key generation command

use std::path::{Path, PathBuf};

use clap::Args;

use super::decrypt::prompt_passphrase;
use super::AppContext;
use crate::audit::Operation;
use crate::crypto::{generate_key, write_public_key, write_secret_key, KeySuite, Passphrase};
use crate::error::SealResult;

#[derive(Debug, Clone, Args)]
pub struct KeygenArgs {
    /// User id, e.g. "Alice <alice@example.org>"
    pub user_id: String,

    /// Where to write the armored public key
    pub public: PathBuf,

    /// Where to write the armored secret key
    pub secret: PathBuf,

    /// Passphrase protecting the secret key; prompted for when absent,
    /// an empty string leaves the key unprotected
    #[arg(long, env = "SEALZIP_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Public-key algorithm
    #[arg(long, value_enum, default_value_t = KeySuite::Cv25519)]
    pub suite: KeySuite,
}

#[derive(serde::Serialize)]
struct KeygenReport {
    fingerprint: String,
    public: String,
    secret: String,
}

/// Generate a key pair and write both halves
pub fn handle_keygen(ctx: &AppContext, args: &KeygenArgs) -> SealResult<()> {
    let passphrase = match &args.passphrase {
        Some(p) => Passphrase::from(p.as_str()),
        None => prompt_new_passphrase()?,
    };

    let result = write_key_pair(args, &passphrase);
    ctx.record(Operation::Keygen, Path::new(&args.user_id), &args.secret, &result);
    let report = result?;

    println!("Generated key {}", report.fingerprint);
    println!("  Public key: {}", report.public);
    println!("  Secret key: {}", report.secret);
    if passphrase.is_empty() {
        println!("Warning: the secret key is not protected by a passphrase");
    }
    Ok(())
}

fn write_key_pair(args: &KeygenArgs, passphrase: &Passphrase) -> SealResult<KeygenReport> {
    let cert = generate_key(&args.user_id, passphrase, args.suite)?;
    write_public_key(&cert, &args.public)?;
    write_secret_key(&cert, &args.secret)?;

    Ok(KeygenReport {
        fingerprint: cert.fingerprint().to_hex(),
        public: args.public.display().to_string(),
        secret: args.secret.display().to_string(),
    })
}

/// Prompt for a new passphrase with confirmation
fn prompt_new_passphrase() -> SealResult<Passphrase> {
    loop {
        let pass1 = prompt_passphrase("Enter new passphrase: ")?;
        let pass2 = prompt_passphrase("Confirm passphrase: ")?;

        if pass1 != pass2 {
            println!("Passphrases do not match. Please try again.");
            continue;
        }

        return Ok(pass1);
    }
}
