//! OpenPGP building blocks for sealzip
//!
//! Provides key ring loading and recipient selection, session keys,
//! armor, the legacy unprotected cipher record and payload dispatch.
//! The encrypt and decrypt pipelines in `services` are assembled from
//! these pieces.

pub mod armor;
pub mod keys;
pub mod legacy_cfb;
pub mod message;
pub mod secure_memory;
pub mod session;

pub use armor::OutputSink;
pub use keys::{
    first_encryption_key, generate_key, prefer_subkey, unlock, write_public_key,
    write_secret_key, KeyPolicy, KeyRing, KeySelector, KeySuite, RecipientKey,
};
pub use legacy_cfb::{LegacyCfbReader, LegacyCfbWriter};
pub use message::{read_literal_payload, Envelope, MessageObject, PayloadSummary, Protection};
pub use secure_memory::Passphrase;
pub use session::{generate_session_key, CipherChoice, CompressionChoice};
