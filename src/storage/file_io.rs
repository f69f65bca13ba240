//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure.
//! Pipeline outputs are staged in a temp file next to the destination
//! and only renamed into place once every byte has been produced, so a
//! failed pack, encrypt or decrypt never leaves a partial file behind.

use std::fs;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{SealError, SealResult};

/// An output file that only appears at its target path on `commit`
///
/// Dropping a `StagedFile` without committing removes the temp file.
pub struct StagedFile {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl StagedFile {
    /// Create the temp file in the target's directory
    pub fn create(target: &Path) -> SealResult<Self> {
        if target.as_os_str().is_empty() {
            return Err(SealError::InvalidArgument("output path is empty".into()));
        }

        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Ensure parent directory exists
        fs::create_dir_all(&parent).map_err(|e| {
            SealError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        // Same directory as the target, so the final rename is atomic
        let temp = tempfile::Builder::new()
            .prefix(".sealzip-")
            .suffix(".part")
            .tempfile_in(&parent)
            .map_err(|e| SealError::Io(format!("Failed to create temp file: {}", e)))?;

        Ok(Self {
            writer: BufWriter::new(temp),
            target: target.to_path_buf(),
        })
    }

    /// Where bytes are written until commit
    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush, sync and rename the temp file over the target
    pub fn commit(self) -> SealResult<()> {
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| SealError::Io(format!("Failed to flush data: {}", e.error())))?;

        // Sync to disk before rename
        temp.as_file()
            .sync_all()
            .map_err(|e| SealError::Io(format!("Failed to sync data: {}", e)))?;

        temp.persist(&self.target).map_err(|e| {
            SealError::Io(format!(
                "Failed to move output into place at {}: {}",
                self.target.display(),
                e.error
            ))
        })?;

        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Seek for StagedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.writer.seek(pos)
    }
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> SealResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let mut staged = StagedFile::create(path.as_ref())?;
    serde_json::to_writer_pretty(&mut staged, data)
        .map_err(|e| SealError::Json(format!("Failed to serialize data: {}", e)))?;
    staged.commit()
}
