//! Key rings, recipient selection and secret-key unlocking
//!
//! A key ring file may hold several certificates in binary or armored
//! form. Recipient selection is pluggable through [`KeySelector`]; the
//! built-in policies are exposed as [`KeyPolicy`] so they can be chosen
//! from the settings file or the command line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use sequoia_openpgp as openpgp;
use openpgp::cert::prelude::*;
use openpgp::crypto::KeyPair;
use openpgp::packet::key::{PublicParts, SecretParts, UnspecifiedRole};
use openpgp::packet::Key;
use openpgp::parse::Parse;
use openpgp::policy::Policy;
use openpgp::serialize::Serialize as _;
use openpgp::{Cert, Fingerprint, KeyID};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::secure_memory::Passphrase;
use crate::error::{SealError, SealResult};

/// All certificates read from one key ring file
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    certs: Vec<Cert>,
}

impl KeyRing {
    /// Load every certificate in a key ring file
    pub fn load(path: &Path) -> SealResult<Self> {
        if !path.is_file() {
            return Err(SealError::key_file_not_found(path));
        }

        let parser = CertParser::from_file(path).map_err(|e| {
            SealError::crypto(&format!("Failed to read key ring {}", path.display()), e)
        })?;
        let certs = parser
            .collect::<openpgp::Result<Vec<Cert>>>()
            .map_err(|e| {
                SealError::crypto(&format!("Failed to parse key ring {}", path.display()), e)
            })?;

        debug!(path = %path.display(), certs = certs.len(), "loaded key ring");
        Ok(Self { certs })
    }

    pub fn from_certs(certs: Vec<Cert>) -> Self {
        Self { certs }
    }

    pub fn certs(&self) -> &[Cert] {
        &self.certs
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Find the secret key whose key id matches a session-key block
    pub fn secret_key(&self, key_id: &KeyID) -> Option<Key<SecretParts, UnspecifiedRole>> {
        self.certs.iter().find_map(|cert| {
            cert.keys()
                .secret()
                .key_handle(key_id.clone())
                .next()
                .map(|ka| ka.key().clone())
        })
    }
}

/// The public key a session key gets wrapped to
#[derive(Debug, Clone)]
pub struct RecipientKey {
    cert: Fingerprint,
    key: Key<PublicParts, UnspecifiedRole>,
}

impl RecipientKey {
    pub fn new(cert: Fingerprint, key: Key<PublicParts, UnspecifiedRole>) -> Self {
        Self { cert, key }
    }

    /// Key id written into the PKESK packet
    pub fn key_id(&self) -> KeyID {
        self.key.keyid()
    }

    /// Fingerprint of the certificate the key belongs to
    pub fn cert_fingerprint(&self) -> &Fingerprint {
        &self.cert
    }

    pub fn key(&self) -> &Key<PublicParts, UnspecifiedRole> {
        &self.key
    }
}

/// Picks the recipient key from a key ring
///
/// Implemented for the built-in [`KeyPolicy`] values and for any closure
/// with the same signature.
pub trait KeySelector {
    fn select(&self, ring: &KeyRing, policy: &dyn Policy) -> Option<RecipientKey>;
}

impl<F> KeySelector for F
where
    F: Fn(&KeyRing, &dyn Policy) -> Option<RecipientKey>,
{
    fn select(&self, ring: &KeyRing, policy: &dyn Policy) -> Option<RecipientKey> {
        self(ring, policy)
    }
}

/// Built-in recipient selection policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// First valid encryption-capable key in ring order
    #[default]
    First,
    /// Prefer encryption subkeys over primary keys
    Subkey,
}

impl KeySelector for KeyPolicy {
    fn select(&self, ring: &KeyRing, policy: &dyn Policy) -> Option<RecipientKey> {
        match self {
            KeyPolicy::First => first_encryption_key(ring, policy),
            KeyPolicy::Subkey => prefer_subkey(ring, policy),
        }
    }
}

/// First key, in certificate order, that is valid for encryption
pub fn first_encryption_key(ring: &KeyRing, policy: &dyn Policy) -> Option<RecipientKey> {
    ring.certs().iter().find_map(|cert| {
        cert.keys()
            .with_policy(policy, None)
            .supported()
            .alive()
            .revoked(false)
            .for_transport_encryption()
            .for_storage_encryption()
            .next()
            .map(|ka| RecipientKey::new(cert.fingerprint(), ka.key().clone()))
    })
}

/// An encryption subkey from any certificate, else the first valid key
pub fn prefer_subkey(ring: &KeyRing, policy: &dyn Policy) -> Option<RecipientKey> {
    ring.certs()
        .iter()
        .find_map(|cert| {
            cert.keys()
                .subkeys()
                .with_policy(policy, None)
                .supported()
                .alive()
                .revoked(false)
                .for_transport_encryption()
                .for_storage_encryption()
                .next()
                .map(|ka| {
                    RecipientKey::new(cert.fingerprint(), ka.key().clone().role_into_unspecified())
                })
        })
        .or_else(|| first_encryption_key(ring, policy))
}

/// Unlock a secret key with the passphrase and turn it into a decryptor
///
/// Unencrypted secret keys are used as-is and the passphrase is ignored.
pub fn unlock(key: Key<SecretParts, UnspecifiedRole>, passphrase: &Passphrase) -> SealResult<KeyPair> {
    let key_id = key.keyid();

    let key = if key.secret().is_encrypted() {
        key.decrypt_secret(&passphrase.to_password())
            .map_err(|_| SealError::Unlock {
                key_id: key_id.to_hex(),
            })?
    } else {
        key
    };

    key.into_keypair()
        .map_err(|e| SealError::crypto("Failed to prepare secret key", e))
}

/// Public-key algorithm family for generated keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeySuite {
    #[default]
    Cv25519,
    Rsa3k,
    Rsa4k,
}

impl From<KeySuite> for CipherSuite {
    fn from(suite: KeySuite) -> Self {
        match suite {
            KeySuite::Cv25519 => CipherSuite::Cv25519,
            KeySuite::Rsa3k => CipherSuite::RSA3k,
            KeySuite::Rsa4k => CipherSuite::RSA4k,
        }
    }
}

/// Generate a certificate with an encryption subkey
///
/// An empty passphrase leaves the secret key material unprotected.
pub fn generate_key(user_id: &str, passphrase: &Passphrase, suite: KeySuite) -> SealResult<Cert> {
    let mut builder = CertBuilder::new()
        .add_userid(user_id)
        .set_cipher_suite(suite.into())
        .add_transport_encryption_subkey();

    if !passphrase.is_empty() {
        builder = builder.set_password(Some(passphrase.to_password()));
    }

    let (cert, _revocation) = builder
        .generate()
        .map_err(|e| SealError::crypto("Failed to generate key", e))?;

    debug!(fingerprint = %cert.fingerprint(), "generated key");
    Ok(cert)
}

/// Write the armored public certificate
pub fn write_public_key(cert: &Cert, path: &Path) -> SealResult<()> {
    let mut writer = create_key_file(path)?;
    cert.armored()
        .serialize(&mut writer)
        .map_err(|e| SealError::crypto("Failed to write public key", e))?;
    writer
        .flush()
        .map_err(|e| SealError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

/// Write the armored secret key (still protected by its passphrase)
pub fn write_secret_key(cert: &Cert, path: &Path) -> SealResult<()> {
    let mut writer = create_key_file(path)?;
    cert.as_tsk()
        .armored()
        .serialize(&mut writer)
        .map_err(|e| SealError::crypto("Failed to write secret key", e))?;
    writer
        .flush()
        .map_err(|e| SealError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

fn create_key_file(path: &Path) -> SealResult<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| SealError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let file = File::create(path)
        .map_err(|e| SealError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpgp::policy::StandardPolicy;
    use tempfile::TempDir;

    fn cert(uid: &str, pass: &str) -> Cert {
        generate_key(uid, &Passphrase::from(pass), KeySuite::Cv25519).unwrap()
    }

    #[test]
    fn test_first_key_is_encryption_subkey() {
        let cert = cert("alice@example.org", "");
        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let policy = StandardPolicy::new();

        let recipient = first_encryption_key(&ring, &policy).unwrap();
        assert_eq!(recipient.cert_fingerprint(), &cert.fingerprint());
        // The primary key is certification-only
        assert_ne!(recipient.key_id(), cert.keyid());
    }

    #[test]
    fn test_empty_ring_has_no_recipient() {
        let ring = KeyRing::default();
        let policy = StandardPolicy::new();
        assert!(ring.is_empty());
        assert!(KeyPolicy::First.select(&ring, &policy).is_none());
        assert!(KeyPolicy::Subkey.select(&ring, &policy).is_none());
    }

    #[test]
    fn test_closure_selector() {
        let first = cert("first@example.org", "");
        let second = cert("second@example.org", "");
        let ring = KeyRing::from_certs(vec![first, second.clone()]);
        let policy = StandardPolicy::new();

        let last = |ring: &KeyRing, policy: &dyn Policy| {
            let tail = KeyRing::from_certs(ring.certs()[1..].to_vec());
            first_encryption_key(&tail, policy)
        };

        let recipient = last.select(&ring, &policy).unwrap();
        assert_eq!(recipient.cert_fingerprint(), &second.fingerprint());
    }

    #[test]
    fn test_secret_key_lookup_and_unlock() {
        let cert = cert("bob@example.org", "123456");
        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let policy = StandardPolicy::new();
        let recipient = first_encryption_key(&ring, &policy).unwrap();

        let secret = ring.secret_key(&recipient.key_id()).unwrap();
        assert!(unlock(secret.clone(), &Passphrase::from("123456")).is_ok());

        assert!(matches!(
            unlock(secret, &Passphrase::from("654321")),
            Err(SealError::Unlock { .. })
        ));
    }

    #[test]
    fn test_public_ring_has_no_secret() {
        let cert = cert("carol@example.org", "");
        let public = cert.clone().strip_secret_key_material();
        let ring = KeyRing::from_certs(vec![public]);
        let policy = StandardPolicy::new();
        let recipient = first_encryption_key(&ring, &policy).unwrap();

        assert!(ring.secret_key(&recipient.key_id()).is_none());
    }

    #[test]
    fn test_write_and_load_key_files() {
        let temp_dir = TempDir::new().unwrap();
        let public_path = temp_dir.path().join("keys").join("public.asc");
        let secret_path = temp_dir.path().join("keys").join("secret.asc");
        let cert = cert("dave@example.org", "123456");

        write_public_key(&cert, &public_path).unwrap();
        write_secret_key(&cert, &secret_path).unwrap();

        let public_text = std::fs::read_to_string(&public_path).unwrap();
        assert!(public_text.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----"));

        let public_ring = KeyRing::load(&public_path).unwrap();
        assert_eq!(public_ring.len(), 1);
        assert!(!public_ring.certs()[0].is_tsk());

        let secret_ring = KeyRing::load(&secret_path).unwrap();
        assert!(secret_ring.certs()[0].is_tsk());
    }

    #[test]
    fn test_missing_key_file() {
        let err = KeyRing::load(Path::new("/nonexistent/ring.asc")).unwrap_err();
        assert!(err.is_not_found());
    }
}
