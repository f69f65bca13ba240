//! Output sink with optional ASCII armor

use std::io::{self, Write};

use sequoia_openpgp::armor;

use crate::error::{SealError, SealResult};

/// Either the raw writer or an armor encoder in front of it
pub enum OutputSink<W: Write + Send + Sync> {
    Binary(W),
    Armored(armor::Writer<W>),
}

impl<W: Write + Send + Sync> OutputSink<W> {
    pub fn new(inner: W, armored: bool) -> SealResult<Self> {
        if !armored {
            return Ok(Self::Binary(inner));
        }
        let writer = armor::Writer::new(inner, armor::Kind::Message)
            .map_err(|e| SealError::crypto("Failed to open armor layer", e))?;
        Ok(Self::Armored(writer))
    }

    pub fn is_armored(&self) -> bool {
        matches!(self, Self::Armored(_))
    }

    /// Write the armor footer (if any) and return the inner writer
    pub fn finish(self) -> SealResult<W> {
        match self {
            Self::Binary(mut inner) => {
                inner
                    .flush()
                    .map_err(|e| SealError::Io(format!("Failed to flush output: {}", e)))?;
                Ok(inner)
            }
            Self::Armored(writer) => writer
                .finalize()
                .map_err(|e| SealError::Io(format!("Failed to finish armor: {}", e))),
        }
    }
}

impl<W: Write + Send + Sync> Write for OutputSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Binary(inner) => inner.write(buf),
            Self::Armored(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Binary(inner) => inner.flush(),
            Self::Armored(writer) => writer.flush(),
        }
    }
}
