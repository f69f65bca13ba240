//! Symmetrically encrypted data without integrity protection
//!
//! Integrity-off output uses the legacy OpenPGP encrypted-data record
//! (packet tag 9): OpenPGP CFB with a random prefix, a two-byte quick
//! check and a resynchronisation step after the prefix. Nothing in the
//! record detects tampering; callers must surface that to the user.

use std::io::{self, Read, Write};

use aes::{Aes128, Aes192, Aes256};
use cast5::Cast5;
use cfb_mode::cipher::KeyIvInit;
use cfb_mode::{BufDecryptor, BufEncryptor};
use rand::RngCore;

use super::session::CipherChoice;
use crate::error::{SealError, SealResult};

/// Old-format header for tag 9 with indeterminate length
pub const LEGACY_HEADER: u8 = 0xA7;

enum CfbEncryptor {
    Cast5(BufEncryptor<Cast5>),
    Aes128(BufEncryptor<Aes128>),
    Aes192(BufEncryptor<Aes192>),
    Aes256(BufEncryptor<Aes256>),
}

impl CfbEncryptor {
    fn new(choice: CipherChoice, key: &[u8], iv: &[u8]) -> SealResult<Self> {
        let bad_key = |_| SealError::Crypto(format!("invalid {} session key length", choice));
        Ok(match choice {
            CipherChoice::Cast5 => Self::Cast5(BufEncryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes128 => Self::Aes128(BufEncryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes192 => Self::Aes192(BufEncryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes256 => Self::Aes256(BufEncryptor::new_from_slices(key, iv).map_err(bad_key)?),
        })
    }

    fn encrypt(&mut self, data: &mut [u8]) {
        match self {
            Self::Cast5(c) => c.encrypt(data),
            Self::Aes128(c) => c.encrypt(data),
            Self::Aes192(c) => c.encrypt(data),
            Self::Aes256(c) => c.encrypt(data),
        }
    }
}

enum CfbDecryptor {
    Cast5(BufDecryptor<Cast5>),
    Aes128(BufDecryptor<Aes128>),
    Aes192(BufDecryptor<Aes192>),
    Aes256(BufDecryptor<Aes256>),
}

impl CfbDecryptor {
    fn new(choice: CipherChoice, key: &[u8], iv: &[u8]) -> SealResult<Self> {
        let bad_key = |_| SealError::Crypto(format!("invalid {} session key length", choice));
        Ok(match choice {
            CipherChoice::Cast5 => Self::Cast5(BufDecryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes128 => Self::Aes128(BufDecryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes192 => Self::Aes192(BufDecryptor::new_from_slices(key, iv).map_err(bad_key)?),
            CipherChoice::Aes256 => Self::Aes256(BufDecryptor::new_from_slices(key, iv).map_err(bad_key)?),
        })
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        match self {
            Self::Cast5(c) => c.decrypt(data),
            Self::Aes128(c) => c.decrypt(data),
            Self::Aes192(c) => c.decrypt(data),
            Self::Aes256(c) => c.decrypt(data),
        }
    }
}

/// Writes a complete tag-9 record: header, encrypted prefix, encrypted body
pub struct LegacyCfbWriter<W: Write> {
    inner: W,
    cipher: CfbEncryptor,
    scratch: Vec<u8>,
}

impl<W: Write> LegacyCfbWriter<W> {
    /// Emit the packet header and encrypted prefix, then return a writer for the body
    pub fn new(mut inner: W, choice: CipherChoice, key: &[u8]) -> SealResult<Self> {
        let bs = choice.block_size();

        let mut prefix = vec![0u8; bs + 2];
        rand::thread_rng().fill_bytes(&mut prefix[..bs]);
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];

        CfbEncryptor::new(choice, key, &vec![0u8; bs])?.encrypt(&mut prefix);

        inner
            .write_all(&[LEGACY_HEADER])
            .and_then(|_| inner.write_all(&prefix))
            .map_err(|e| SealError::Io(format!("Failed to write encrypted data header: {}", e)))?;

        // Resync: the body IV is the last block of prefix ciphertext
        let cipher = CfbEncryptor::new(choice, key, &prefix[2..])?;

        Ok(Self {
            inner,
            cipher,
            scratch: Vec::new(),
        })
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> SealResult<W> {
        self.inner
            .flush()
            .map_err(|e| SealError::Io(format!("Failed to flush encrypted data: {}", e)))?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for LegacyCfbWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.encrypt(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypts the body of a tag-9 record (the packet header already consumed)
pub struct LegacyCfbReader<R: Read> {
    inner: R,
    cipher: CfbDecryptor,
}

impl<R: Read> LegacyCfbReader<R> {
    /// Read and check the encrypted prefix
    ///
    /// A failed quick check means the session key is wrong for this data.
    pub fn new(mut inner: R, choice: CipherChoice, key: &[u8]) -> SealResult<Self> {
        let bs = choice.block_size();

        let mut prefix = vec![0u8; bs + 2];
        inner
            .read_exact(&mut prefix)
            .map_err(|e| SealError::Format(format!("encrypted data is truncated: {}", e)))?;
        let iv = prefix[2..].to_vec();

        CfbDecryptor::new(choice, key, &vec![0u8; bs])?.decrypt(&mut prefix);
        if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
            return Err(SealError::Crypto(
                "session key quick check failed on encrypted data".into(),
            ));
        }

        let cipher = CfbDecryptor::new(choice, key, &iv)?;
        Ok(Self { inner, cipher })
    }
}

impl<R: Read> Read for LegacyCfbReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.decrypt(&mut buf[..n]);
        Ok(n)
    }
}
