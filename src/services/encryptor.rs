//! Encryption service
//!
//! Builds an OpenPGP message for a single recipient: a public-key
//! encrypted session key followed by the encrypted payload, which holds
//! a compressed literal data record. With integrity on, the payload is
//! a protected record ending in a modification detection code; with it
//! off, the legacy unprotected record is written instead.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use sequoia_openpgp as openpgp;
use openpgp::crypto::SessionKey;
use openpgp::packet::pkesk::PKESK3;
use openpgp::packet::Packet;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::stream::{Compressor, Encryptor2, LiteralWriter, Message, Recipient};
use openpgp::serialize::Serialize as _;
use openpgp::types::DataFormat;
use serde::Serialize;
use tracing::{info, warn};

use crate::crypto::{
    generate_session_key, CipherChoice, CompressionChoice, KeyPolicy, KeyRing, KeySelector,
    LegacyCfbWriter, OutputSink, RecipientKey,
};
use crate::error::{SealError, SealResult};
use crate::storage::StagedFile;

/// Longest file name a literal data record can carry
const MAX_LITERAL_NAME: usize = 255;

/// Knobs for one encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Wrap the output in ASCII armor
    pub armor: bool,
    /// Protect the payload with a modification detection code
    pub integrity: bool,
    pub cipher: CipherChoice,
    pub compression: CompressionChoice,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            armor: false,
            integrity: true,
            cipher: CipherChoice::default(),
            compression: CompressionChoice::default(),
        }
    }
}

impl EncryptOptions {
    pub fn new(armor: bool, integrity: bool) -> Self {
        Self {
            armor,
            integrity,
            ..Self::default()
        }
    }

    pub fn with_cipher(mut self, cipher: CipherChoice) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_compression(mut self, compression: CompressionChoice) -> Self {
        self.compression = compression;
        self
    }
}

/// Outcome of a successful encryption
#[derive(Debug, Clone, Serialize)]
pub struct EncryptReport {
    /// Key id the session key was wrapped to
    pub recipient: String,
    /// Fingerprint of the recipient certificate
    pub certificate: String,
    /// Plaintext bytes consumed
    pub bytes: u64,
    pub armored: bool,
    pub integrity: bool,
    pub cipher: String,
    pub compression: String,
}

/// Streams plaintext into an encrypted message for one recipient
pub struct Encryptor<'a> {
    recipient: &'a RecipientKey,
    options: EncryptOptions,
}

impl<'a> Encryptor<'a> {
    pub fn new(recipient: &'a RecipientKey, options: EncryptOptions) -> Self {
        Self { recipient, options }
    }

    /// Encrypt everything readable from `input` into `output`
    ///
    /// `filename` is stored in the literal data record. Returns the
    /// output writer and the number of plaintext bytes consumed.
    pub fn encrypt_reader<R, W>(&self, input: &mut R, output: W, filename: &str) -> SealResult<(W, u64)>
    where
        R: Read + ?Sized,
        W: Write + Send + Sync,
    {
        let session_key = generate_session_key(self.options.cipher)?;
        let mut sink = OutputSink::new(output, self.options.armor)?;

        let copied = if self.options.integrity {
            self.write_protected(&mut sink, input, filename, session_key)?
        } else {
            warn!("integrity protection disabled; tampering will not be detected");
            self.write_unprotected(&mut sink, input, filename, &session_key)?
        };

        Ok((sink.finish()?, copied))
    }

    fn write_protected<S, R>(
        &self,
        sink: &mut S,
        input: &mut R,
        filename: &str,
        session_key: SessionKey,
    ) -> SealResult<u64>
    where
        S: Write + Send + Sync,
        R: Read + ?Sized,
    {
        let recipient = Recipient::new(self.recipient.key_id(), self.recipient.key());
        let message = Encryptor2::with_session_key(
            Message::new(sink),
            self.options.cipher.algorithm(),
            session_key,
        )
        .map_err(|e| SealError::crypto("Failed to open cipher layer", e))?
        .add_recipients(vec![recipient])
        .build()
        .map_err(|e| SealError::crypto("Failed to open cipher layer", e))?;

        self.write_literal(message, input, filename)
    }

    fn write_unprotected<S, R>(
        &self,
        sink: &mut S,
        input: &mut R,
        filename: &str,
        session_key: &SessionKey,
    ) -> SealResult<u64>
    where
        S: Write + Send + Sync,
        R: Read + ?Sized,
    {
        let pkesk = PKESK3::for_recipient(
            self.options.cipher.algorithm(),
            session_key,
            self.recipient.key(),
        )
        .map_err(|e| SealError::crypto("Failed to wrap session key", e))?;
        Packet::PKESK(pkesk.into())
            .serialize(sink)
            .map_err(|e| SealError::crypto("Failed to write session key block", e))?;

        let mut cipher = LegacyCfbWriter::new(&mut *sink, self.options.cipher, &session_key[..])?;
        let copied = self.write_literal(Message::new(&mut cipher), input, filename)?;
        cipher.finish()?;
        Ok(copied)
    }

    fn write_literal<R>(&self, message: Message<'_>, input: &mut R, filename: &str) -> SealResult<u64>
    where
        R: Read + ?Sized,
    {
        let message = Compressor::new(message)
            .algo(self.options.compression.algorithm())
            .build()
            .map_err(|e| SealError::crypto("Failed to open compression layer", e))?;

        let mut literal = LiteralWriter::new(message)
            .format(DataFormat::Binary)
            .filename(literal_name(filename))
            .map_err(|e| SealError::crypto("Invalid literal file name", e))?
            .build()
            .map_err(|e| SealError::crypto("Failed to open literal data", e))?;

        let copied = io::copy(input, &mut literal)
            .map_err(|e| SealError::Io(format!("Failed to encrypt input: {}", e)))?;

        literal
            .finalize()
            .map_err(|e| SealError::crypto("Failed to finish message", e))?;

        Ok(copied)
    }
}

/// Truncate to the literal record limit on a character boundary
fn literal_name(name: &str) -> &str {
    if name.len() <= MAX_LITERAL_NAME {
        return name;
    }
    let mut end = MAX_LITERAL_NAME;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Encrypt `input` to the first usable key in the `public_key` ring
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    public_key: &Path,
    options: EncryptOptions,
) -> SealResult<EncryptReport> {
    encrypt_file_with(input, output, public_key, options, &KeyPolicy::First)
}

/// Encrypt `input`, choosing the recipient key with `selector`
pub fn encrypt_file_with<S>(
    input: &Path,
    output: &Path,
    public_key: &Path,
    options: EncryptOptions,
    selector: &S,
) -> SealResult<EncryptReport>
where
    S: KeySelector + ?Sized,
{
    if !input.is_file() {
        return Err(SealError::file_not_found(input));
    }
    if !public_key.is_file() {
        return Err(SealError::key_file_not_found(public_key));
    }
    if output.as_os_str().is_empty() {
        return Err(SealError::InvalidArgument("Invalid output file path".into()));
    }

    let ring = KeyRing::load(public_key)?;
    let policy = StandardPolicy::new();
    let recipient = selector.select(&ring, &policy).ok_or_else(|| {
        SealError::KeyNotFound(format!(
            "Can't find encryption key in key ring {}",
            public_key.display()
        ))
    })?;

    let file = File::open(input)
        .map_err(|e| SealError::Io(format!("Failed to open {}: {}", input.display(), e)))?;
    let mut reader = BufReader::new(file);
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let staged = StagedFile::create(output)?;
    let (staged, bytes) =
        Encryptor::new(&recipient, options).encrypt_reader(&mut reader, staged, &filename)?;
    staged.commit()?;

    let report = EncryptReport {
        recipient: recipient.key_id().to_hex(),
        certificate: recipient.cert_fingerprint().to_hex(),
        bytes,
        armored: options.armor,
        integrity: options.integrity,
        cipher: options.cipher.to_string(),
        compression: options.compression.to_string(),
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        recipient = %report.recipient,
        "encrypted file"
    );
    Ok(report)
}
