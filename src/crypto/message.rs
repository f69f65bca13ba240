//! Message object classification and payload dispatch
//!
//! After the cipher layer is removed the payload is walked object by
//! object. A compressed-data object may wrap the literal data; a
//! signature list inside it is skipped (signatures are not verified);
//! a signature list before any compressed data is rejected.

use std::fmt;
use std::io::{self, Write};

use sequoia_openpgp as openpgp;
use openpgp::packet::Tag;
use openpgp::parse::{PacketParser, PacketParserResult};
use openpgp::Packet;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{SealError, SealResult};

/// Kind of object found inside the decrypted payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageObject {
    CompressedData,
    SignatureList,
    LiteralData,
    Other(Tag),
}

impl MessageObject {
    pub fn classify(packet: &Packet) -> Self {
        match packet {
            Packet::CompressedData(_) => Self::CompressedData,
            Packet::OnePassSig(_) | Packet::Signature(_) => Self::SignatureList,
            Packet::Literal(_) => Self::LiteralData,
            other => Self::Other(other.tag()),
        }
    }
}

impl fmt::Display for MessageObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageObject::CompressedData => write!(f, "compressed data"),
            MessageObject::SignatureList => write!(f, "signature list"),
            MessageObject::LiteralData => write!(f, "literal data"),
            MessageObject::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Top-level records of an encrypted container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// Marker or password-based session key, not used here
    Skip,
    /// Public-key encrypted session key
    SessionKey,
    /// Encrypted data with a modification detection code
    Protected,
    /// Encrypted data without integrity protection
    Legacy,
    Other(Tag),
}

impl Envelope {
    pub fn classify(packet: &Packet) -> Self {
        match packet.tag() {
            Tag::Marker | Tag::SKESK => Self::Skip,
            Tag::PKESK => Self::SessionKey,
            Tag::SEIP => Self::Protected,
            Tag::SED => Self::Legacy,
            tag => Self::Other(tag),
        }
    }
}

/// Whether the payload sits under a modification detection code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Mdc,
    Unprotected,
}

/// What was found while reading the payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayloadSummary {
    /// Plaintext bytes written to the sink
    pub bytes: u64,
    /// File name stored in the literal data record
    pub filename: Option<String>,
    /// Signature lists passed over without verification
    pub skipped_signatures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    InCompressed,
    Done,
}

/// Walk the decrypted payload and copy the literal data into `sink`
///
/// The whole payload is drained even after a failure so that a
/// protected payload always gets its modification detection code
/// checked; an integrity failure outranks any other error.
pub fn read_literal_payload(
    mut ppr: PacketParserResult<'_>,
    sink: &mut dyn Write,
    protection: Protection,
) -> SealResult<PayloadSummary> {
    let mut stage = Stage::Start;
    let mut summary = PayloadSummary::default();
    let mut failure: Option<SealError> = None;
    let mut mdc: Option<bool> = None;

    while let PacketParserResult::Some(mut pp) = ppr {
        #[allow(deprecated)]
        let mdc_verdict = match &pp.packet {
            Packet::MDC(tag) => Some(tag.valid()),
            _ => None,
        };

        if let Some(valid) = mdc_verdict {
            mdc = Some(valid);
        } else if failure.is_none() {
            match step(stage, &mut pp, sink, &mut summary) {
                Ok(next) => stage = next,
                Err(err) => failure = Some(err),
            }
        }

        ppr = match pp.recurse() {
            Ok((_, next)) => next,
            Err(err) => return Err(parse_failure(protection, err)),
        };
    }

    if protection == Protection::Mdc {
        match mdc {
            Some(true) => debug!("modification detection code verified"),
            Some(false) => {
                return Err(SealError::Integrity(
                    "modification detection code does not match".into(),
                ))
            }
            None => {
                return Err(SealError::Integrity(
                    "modification detection code is missing".into(),
                ))
            }
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }
    if stage != Stage::Done {
        return Err(SealError::Format("message contains no literal data".into()));
    }
    Ok(summary)
}

fn step(
    stage: Stage,
    pp: &mut PacketParser<'_>,
    sink: &mut dyn Write,
    summary: &mut PayloadSummary,
) -> SealResult<Stage> {
    let object = MessageObject::classify(&pp.packet);

    match (stage, object) {
        (Stage::Done, object) => {
            debug!(%object, "ignoring object after literal data");
            Ok(Stage::Done)
        }
        (Stage::Start, MessageObject::CompressedData) => Ok(Stage::InCompressed),
        (Stage::Start, MessageObject::SignatureList) => Err(SealError::Format(
            "signed message, not literal data".into(),
        )),
        (Stage::InCompressed, MessageObject::SignatureList) => {
            warn!("message is signed; the signature is NOT verified");
            summary.skipped_signatures += 1;
            Ok(Stage::InCompressed)
        }
        (_, MessageObject::LiteralData) => {
            copy_literal(pp, sink, summary)?;
            Ok(Stage::Done)
        }
        (_, object) => Err(SealError::Format(format!(
            "unknown message type: {}",
            object
        ))),
    }
}

fn copy_literal(
    pp: &mut PacketParser<'_>,
    sink: &mut dyn Write,
    summary: &mut PayloadSummary,
) -> SealResult<()> {
    if let Packet::Literal(literal) = &pp.packet {
        summary.filename = literal
            .filename()
            .map(|name| String::from_utf8_lossy(name).into_owned());
    }

    summary.bytes = io::copy(pp, sink)
        .map_err(|e| SealError::Io(format!("Failed to copy literal data: {}", e)))?;
    Ok(())
}

fn parse_failure(protection: Protection, err: anyhow::Error) -> SealError {
    match protection {
        Protection::Mdc => SealError::Integrity(format!("protected payload is damaged: {}", err)),
        Protection::Unprotected => {
            SealError::Format(format!("failed to parse decrypted payload: {}", err))
        }
    }
}
