//! Decryption service
//!
//! Opens an encrypted message (armored or binary, detected from the
//! content), unwraps the session key with a secret key from the ring
//! and writes the literal data out. The output file only appears once
//! the whole payload has been read and, for protected payloads, the
//! modification detection code has been verified.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use sequoia_openpgp as openpgp;
use openpgp::crypto::SessionKey;
use openpgp::packet::PKESK;
use openpgp::parse::{PacketParser, PacketParserResult, Parse};
use openpgp::types::SymmetricAlgorithm;
use openpgp::{KeyID, Packet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crypto::{
    read_literal_payload, unlock, CipherChoice, Envelope, KeyRing, LegacyCfbReader, Passphrase,
    PayloadSummary, Protection,
};
use crate::error::{SealError, SealResult};
use crate::storage::StagedFile;

/// Outcome of a successful decryption
#[derive(Debug, Clone, Serialize)]
pub struct DecryptReport {
    /// Key id that unwrapped the session key
    pub key_id: String,
    /// Whether a modification detection code was verified
    pub integrity_protected: bool,
    #[serde(flatten)]
    pub payload: PayloadSummary,
}

struct UnwrappedSession {
    algorithm: SymmetricAlgorithm,
    key: SessionKey,
    key_id: KeyID,
}

/// Decrypts messages with the secret keys of one key ring
pub struct Decryptor<'a> {
    ring: &'a KeyRing,
    passphrase: &'a Passphrase,
}

impl<'a> Decryptor<'a> {
    pub fn new(ring: &'a KeyRing, passphrase: &'a Passphrase) -> Self {
        Self { ring, passphrase }
    }

    /// Decrypt a complete message from `input` into `sink`
    ///
    /// Plaintext is streamed into `sink` as it is decrypted, before the
    /// modification detection code at the end of the payload is checked.
    /// On any error the bytes already in `sink` are unauthenticated and
    /// must be discarded; [`decrypt_file`] does this by staging its output.
    pub fn decrypt_reader<R>(&self, input: R, sink: &mut dyn Write) -> SealResult<DecryptReport>
    where
        R: Read + Send + Sync,
    {
        let mut ppr = PacketParser::from_reader(input)
            .map_err(|e| SealError::Format(format!("not an OpenPGP message: {}", e)))?;
        let mut session_blocks: Vec<PKESK> = Vec::new();

        while let PacketParserResult::Some(mut pp) = ppr {
            match Envelope::classify(&pp.packet) {
                Envelope::Skip => debug!(tag = %pp.packet.tag(), "skipping record"),
                Envelope::SessionKey => match &pp.packet {
                    Packet::PKESK(pkesk) => session_blocks.push(pkesk.clone()),
                    _ => debug!("skipping unsupported session key block"),
                },
                Envelope::Protected => {
                    let session = self.unwrap_session_key(&session_blocks)?;
                    pp.decrypt(session.algorithm, &session.key).map_err(|e| {
                        SealError::Integrity(format!("protected data cannot be decrypted: {}", e))
                    })?;
                    let (_, payload) = pp.recurse().map_err(|e| {
                        SealError::Integrity(format!("protected payload is damaged: {}", e))
                    })?;

                    let summary = read_literal_payload(payload, sink, Protection::Mdc)?;
                    return Ok(DecryptReport {
                        key_id: session.key_id.to_hex(),
                        integrity_protected: true,
                        payload: summary,
                    });
                }
                Envelope::Legacy => {
                    let session = self.unwrap_session_key(&session_blocks)?;
                    let cipher = CipherChoice::from_algorithm(session.algorithm).ok_or_else(|| {
                        SealError::Crypto(format!(
                            "unsupported cipher {} for unprotected data",
                            session.algorithm
                        ))
                    })?;
                    warn!("message has no integrity protection; tampering cannot be detected");

                    let reader = LegacyCfbReader::new(&mut pp, cipher, &session.key[..])?;
                    let payload = PacketParser::from_reader(reader).map_err(|e| {
                        SealError::Format(format!("failed to parse decrypted payload: {}", e))
                    })?;

                    let summary = read_literal_payload(payload, sink, Protection::Unprotected)?;
                    return Ok(DecryptReport {
                        key_id: session.key_id.to_hex(),
                        integrity_protected: false,
                        payload: summary,
                    });
                }
                Envelope::Other(tag) => {
                    return Err(SealError::Format(format!(
                        "not an encrypted message: unexpected {} record",
                        tag
                    )))
                }
            }

            ppr = pp
                .next()
                .map_err(|e| SealError::Format(format!("malformed message: {}", e)))?
                .1;
        }

        Err(SealError::Format("message contains no encrypted data".into()))
    }

    /// Try every session-key block against the ring
    ///
    /// A block addressed to a key we hold but cannot unlock is remembered,
    /// so a wrong passphrase is reported as such rather than as a missing key.
    fn unwrap_session_key(&self, blocks: &[PKESK]) -> SealResult<UnwrappedSession> {
        let mut last_failure: Option<SealError> = None;

        for block in blocks {
            let recipient = block.recipient().clone();
            let Some(secret) = self.ring.secret_key(&recipient) else {
                debug!(%recipient, "no secret key for session key block");
                continue;
            };

            let mut keypair = match unlock(secret, self.passphrase) {
                Ok(keypair) => keypair,
                Err(err) => {
                    debug!(%recipient, "secret key did not unlock");
                    last_failure = Some(err);
                    continue;
                }
            };

            match block.decrypt(&mut keypair, None) {
                Some((algorithm, key)) => {
                    debug!(%recipient, %algorithm, "unwrapped session key");
                    return Ok(UnwrappedSession {
                        algorithm,
                        key,
                        key_id: recipient,
                    });
                }
                None => {
                    last_failure = Some(SealError::Crypto(format!(
                        "session key block for {} could not be decrypted",
                        recipient
                    )));
                }
            }
        }

        Err(last_failure
            .unwrap_or_else(|| SealError::KeyNotFound("Secret key for message not found".into())))
    }
}

/// Decrypt `input` with a key from the `private_key` ring into `output`
///
/// Nothing is written to `output` unless decryption succeeds completely.
pub fn decrypt_file(
    input: &Path,
    private_key: &Path,
    passphrase: &Passphrase,
    output: &Path,
) -> SealResult<DecryptReport> {
    if !input.is_file() {
        return Err(SealError::file_not_found(input));
    }
    if !private_key.is_file() {
        return Err(SealError::key_file_not_found(private_key));
    }
    if output.as_os_str().is_empty() {
        return Err(SealError::InvalidArgument("Invalid output file path".into()));
    }

    let ring = KeyRing::load(private_key)?;
    let file = File::open(input)
        .map_err(|e| SealError::Io(format!("Failed to open {}: {}", input.display(), e)))?;

    let mut staged = StagedFile::create(output)?;
    let report = Decryptor::new(&ring, passphrase).decrypt_reader(BufReader::new(file), &mut staged)?;
    staged.commit()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        key = %report.key_id,
        bytes = report.payload.bytes,
        "decrypted file"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{first_encryption_key, generate_key, KeySuite};
    use crate::services::encryptor::{EncryptOptions, Encryptor};
    use openpgp::cert::CertBuilder;
    use openpgp::policy::StandardPolicy;
    use openpgp::serialize::stream::{
        Compressor, Encryptor2, LiteralWriter, Message, Recipient, Signer,
    };
    use openpgp::serialize::MarshalInto;
    use openpgp::types::CompressionAlgorithm;
    use openpgp::{Cert, PacketPile};

    const PASS: &str = "123456";

    fn keyed_cert() -> Cert {
        generate_key("dec@example.org", &Passphrase::from(PASS), KeySuite::Cv25519).unwrap()
    }

    fn encrypt(cert: &Cert, options: EncryptOptions, body: &[u8]) -> Vec<u8> {
        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let recipient = first_encryption_key(&ring, &StandardPolicy::new()).unwrap();
        Encryptor::new(&recipient, options)
            .encrypt_reader(&mut &body[..], Vec::new(), "a.zip")
            .unwrap()
            .0
    }

    fn decrypt(cert: &Cert, pass: &str, message: &[u8]) -> SealResult<(Vec<u8>, DecryptReport)> {
        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let passphrase = Passphrase::from(pass);
        let mut out = Vec::new();
        let report = Decryptor::new(&ring, &passphrase).decrypt_reader(message, &mut out)?;
        Ok((out, report))
    }

    /// Encrypt with a signing step in the stack, optionally under compression
    fn signed_message(cert: &Cert, compressed: bool) -> Vec<u8> {
        let policy = StandardPolicy::new();
        let (signer_cert, _) = CertBuilder::new()
            .add_userid("signer@example.org")
            .add_signing_subkey()
            .generate()
            .unwrap();
        let signer = signer_cert
            .keys()
            .unencrypted_secret()
            .with_policy(&policy, None)
            .for_signing()
            .next()
            .unwrap()
            .key()
            .clone()
            .into_keypair()
            .unwrap();

        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let recipient = first_encryption_key(&ring, &policy).unwrap();

        let mut out = Vec::new();
        {
            let message = Message::new(&mut out);
            let mut message = Encryptor2::for_recipients(
                message,
                vec![Recipient::new(recipient.key_id(), recipient.key())],
            )
            .build()
            .unwrap();
            if compressed {
                message = Compressor::new(message)
                    .algo(CompressionAlgorithm::Zip)
                    .build()
                    .unwrap();
            }
            let message = Signer::new(message, signer).build().unwrap();
            let mut literal = LiteralWriter::new(message).build().unwrap();
            literal.write_all(b"signed body").unwrap();
            literal.finalize().unwrap();
        }
        out
    }

    #[test]
    fn test_protected_round_trip() {
        let cert = keyed_cert();
        let message = encrypt(&cert, EncryptOptions::default(), b"archive bytes");

        let (plain, report) = decrypt(&cert, PASS, &message).unwrap();
        assert_eq!(plain, b"archive bytes");
        assert!(report.integrity_protected);
        assert_eq!(report.payload.filename.as_deref(), Some("a.zip"));
    }

    #[test]
    fn test_unprotected_round_trip_cast5() {
        let cert = keyed_cert();
        let options = EncryptOptions::new(true, false).with_cipher(CipherChoice::Cast5);
        let message = encrypt(&cert, options, b"legacy bytes");

        let (plain, report) = decrypt(&cert, PASS, &message).unwrap();
        assert_eq!(plain, b"legacy bytes");
        assert!(!report.integrity_protected);
    }

    #[test]
    fn test_wrong_passphrase_is_unlock_error() {
        let cert = keyed_cert();
        let message = encrypt(&cert, EncryptOptions::default(), b"x");

        let err = decrypt(&cert, "wrong", &message).unwrap_err();
        assert!(matches!(err, SealError::Unlock { .. }));
    }

    #[test]
    fn test_foreign_key_is_key_not_found() {
        let cert = keyed_cert();
        let other = keyed_cert();
        let message = encrypt(&cert, EncryptOptions::default(), b"x");

        let err = decrypt(&other, PASS, &message).unwrap_err();
        assert!(matches!(err, SealError::KeyNotFound(_)));
    }

    #[test]
    fn test_every_flipped_byte_is_rejected() {
        let cert = generate_key("flip@example.org", &Passphrase::from(""), KeySuite::Cv25519).unwrap();
        let message = encrypt(&cert, EncryptOptions::default(), &[42u8; 4096]);

        // Everything after the session key block is the protected packet
        let pile = PacketPile::from_bytes(&message).unwrap();
        let pkesk_len = pile.children().next().unwrap().to_vec().unwrap().len();
        // Packet header (at most 6 bytes) and version byte
        let ciphertext_start = pkesk_len + 7;

        for at in 0..message.len() {
            let mut tampered = message.clone();
            tampered[at] ^= 0x01;

            let result = decrypt(&cert, "", &tampered);
            assert!(result.is_err(), "flip at {} decrypted", at);
            if at >= ciphertext_start {
                let err = result.err().unwrap();
                assert!(matches!(err, SealError::Integrity(_)), "flip at {}: {:?}", at, err);
            }
        }
    }

    #[test]
    fn test_marker_packet_is_skipped() {
        let cert = keyed_cert();
        let mut message = vec![0xA8, 0x03, b'P', b'G', b'P'];
        message.extend(encrypt(&cert, EncryptOptions::default(), b"hi"));

        let (plain, report) = decrypt(&cert, PASS, &message).unwrap();
        assert_eq!(plain, b"hi");
        assert!(report.integrity_protected);
    }

    #[test]
    fn test_session_key_block_for_second_recipient() {
        let policy = StandardPolicy::new();
        let stranger = keyed_cert();
        let cert = keyed_cert();
        let stranger_ring = KeyRing::from_certs(vec![stranger]);
        let ring = KeyRing::from_certs(vec![cert.clone()]);
        let first = first_encryption_key(&stranger_ring, &policy).unwrap();
        let second = first_encryption_key(&ring, &policy).unwrap();

        let mut out = Vec::new();
        {
            let message = Encryptor2::for_recipients(
                Message::new(&mut out),
                vec![
                    Recipient::new(first.key_id(), first.key()),
                    Recipient::new(second.key_id(), second.key()),
                ],
            )
            .build()
            .unwrap();
            let mut literal = LiteralWriter::new(message).build().unwrap();
            literal.write_all(b"both").unwrap();
            literal.finalize().unwrap();
        }

        let (plain, report) = decrypt(&cert, PASS, &out).unwrap();
        assert_eq!(plain, b"both");
        assert_eq!(report.key_id, second.key_id().to_hex());
    }

    #[test]
    fn test_signed_literal_at_top_is_rejected() {
        let cert = keyed_cert();
        let message = signed_message(&cert, false);

        let err = decrypt(&cert, PASS, &message).unwrap_err();
        match err {
            SealError::Format(msg) => assert!(msg.contains("signed message")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_signature_inside_compression_is_skipped() {
        let cert = keyed_cert();
        let message = signed_message(&cert, true);

        let (plain, report) = decrypt(&cert, PASS, &message).unwrap();
        assert_eq!(plain, b"signed body");
        assert_eq!(report.payload.skipped_signatures, 1);
    }

    #[test]
    fn test_plain_literal_is_not_encrypted() {
        let cert = keyed_cert();
        let mut bytes = Vec::new();
        {
            let mut literal = LiteralWriter::new(Message::new(&mut bytes)).build().unwrap();
            literal.write_all(b"plain").unwrap();
            literal.finalize().unwrap();
        }

        let err = decrypt(&cert, PASS, &bytes).unwrap_err();
        assert!(matches!(err, SealError::Format(_)));
    }

    #[test]
    fn test_garbage_input() {
        let cert = keyed_cert();
        let err = decrypt(&cert, PASS, b"definitely not openpgp").unwrap_err();
        assert!(matches!(err, SealError::Format(_)));
    }

    #[test]
    fn test_decrypt_file_leaves_no_output_on_failure() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cert = keyed_cert();
        let secret = temp_dir.path().join("secret.asc");
        crate::crypto::write_secret_key(&cert, &secret).unwrap();

        let input = temp_dir.path().join("a.zip.pgp");
        std::fs::write(&input, encrypt(&cert, EncryptOptions::default(), b"zip")).unwrap();
        let output = temp_dir.path().join("a.zip");

        let err = decrypt_file(&input, &secret, &Passphrase::from("nope"), &output).unwrap_err();
        assert!(matches!(err, SealError::Unlock { .. }));
        assert!(!output.exists());

        decrypt_file(&input, &secret, &Passphrase::from(PASS), &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"zip");
    }
}
