//! Zip archiver service
//!
//! Packs a directory tree into a single zip container and extracts it
//! again. Entry names are relative to the source root, use `/` as the
//! separator and are written in sorted order so repeated packs of the
//! same tree list entries identically.

use std::fs::{self, File};
use std::io::{self, BufReader, Seek, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{SealError, SealResult};
use crate::storage::StagedFile;

/// Counts gathered while packing or extracting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub files: usize,
    pub directories: usize,
    /// Uncompressed bytes of file content
    pub bytes: u64,
}

/// Pack every file and directory under `source_dir` into `dest_file`
///
/// The destination is overwritten. Symbolic links to regular files are
/// stored with the content they point at; links to directories and other
/// special files are skipped.
pub fn compress_directory(source_dir: &Path, dest_file: &Path) -> SealResult<ArchiveReport> {
    if !source_dir.is_dir() {
        return Err(SealError::dir_not_found(source_dir));
    }
    if dest_file.as_os_str().is_empty() {
        return Err(SealError::InvalidArgument("Invalid archive file path".into()));
    }

    let mut staged = StagedFile::create(dest_file)?;
    // The archive may be written inside the tree being packed
    let skip = [staged.temp_path().to_path_buf(), dest_file.to_path_buf()];

    let mut report = ArchiveReport::default();
    {
        let mut zip = ZipWriter::new(&mut staged);
        add_tree(&mut zip, source_dir, source_dir, &skip, &mut report)?;
        zip.finish()?;
    }
    staged.commit()?;

    info!(
        source = %source_dir.display(),
        archive = %dest_file.display(),
        files = report.files,
        directories = report.directories,
        "packed directory"
    );
    Ok(report)
}

fn add_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    skip: &[std::path::PathBuf],
    report: &mut ArchiveReport,
) -> SealResult<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| SealError::Io(format!("Failed to read directory {}: {}", dir.display(), e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SealError::Io(format!("Failed to read directory {}: {}", dir.display(), e)))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if skip.iter().any(|s| same_file(s, &path)) {
            continue;
        }

        let file_type = entry.file_type()?;
        let name = entry_name(root, &path)?;

        if file_type.is_dir() {
            debug!(entry = %name, "adding directory");
            zip.add_directory(format!("{}/", name), dir_options())?;
            report.directories += 1;
            add_tree(zip, root, &path, skip, report)?;
        } else if file_type.is_file() {
            debug!(entry = %name, "adding file");
            add_file(zip, &path, &name, &entry.metadata()?, report)?;
        } else if let Some(target) = linked_file(&path, file_type) {
            debug!(entry = %name, "adding file through symbolic link");
            add_file(zip, &path, &name, &target, report)?;
        } else {
            warn!(path = %path.display(), "skipping directory link or special file");
        }
    }

    Ok(())
}

/// Metadata of the regular file a symbolic link points at
fn linked_file(path: &Path, file_type: fs::FileType) -> Option<fs::Metadata> {
    if !file_type.is_symlink() {
        return None;
    }
    fs::metadata(path).ok().filter(|metadata| metadata.is_file())
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: &str,
    metadata: &fs::Metadata,
    report: &mut ArchiveReport,
) -> SealResult<()> {
    zip.start_file(name, file_options(metadata))?;
    let mut file = File::open(path)
        .map_err(|e| SealError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    report.bytes += io::copy(&mut file, zip)?;
    report.files += 1;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    if a.file_name() != b.file_name() {
        return false;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Relative path with `/` separators
fn entry_name(root: &Path, path: &Path) -> SealResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        SealError::Archive(format!("{} is outside {}", path.display(), root.display()))
    })?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                SealError::Archive(format!("path is not valid UTF-8: {}", path.display()))
            })
        })
        .collect::<SealResult<Vec<_>>>()?;

    Ok(parts.join("/"))
}

fn dir_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o755)
}

#[cfg(unix)]
fn file_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(metadata.permissions().mode() & 0o777)
        .large_file(metadata.len() >= u32::MAX as u64)
}

#[cfg(not(unix))]
fn file_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .large_file(metadata.len() >= u32::MAX as u64)
}

/// Extract every entry of `source_file` under `dest_dir`
///
/// Existing files are overwritten. An entry whose name would escape
/// `dest_dir` aborts the extraction with an archive error.
pub fn extract_archive(source_file: &Path, dest_dir: &Path) -> SealResult<ArchiveReport> {
    if !source_file.is_file() {
        return Err(SealError::file_not_found(source_file));
    }
    if dest_dir.as_os_str().is_empty() {
        return Err(SealError::InvalidArgument("Invalid destination directory".into()));
    }

    fs::create_dir_all(dest_dir).map_err(|e| {
        SealError::Io(format!(
            "Failed to create directory {}: {}",
            dest_dir.display(),
            e
        ))
    })?;

    let file = File::open(source_file)
        .map_err(|e| SealError::Io(format!("Failed to open {}: {}", source_file.display(), e)))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut report = ArchiveReport::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            SealError::Archive(format!("entry has an unsafe path: {}", entry.name()))
        })?;
        let target = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        // A previous extract may have left a read-only file behind
        if fs::symlink_metadata(&target).map(|m| !m.is_dir()).unwrap_or(false) {
            fs::remove_file(&target).map_err(|e| {
                SealError::Io(format!("Failed to replace {}: {}", target.display(), e))
            })?;
        }
        let mut out = File::create(&target)
            .map_err(|e| SealError::Io(format!("Failed to create {}: {}", target.display(), e)))?;
        report.bytes += io::copy(&mut entry, &mut out)?;
        report.files += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }
    }

    info!(
        archive = %source_file.display(),
        destination = %dest_dir.display(),
        files = report.files,
        "extracted archive"
    );
    Ok(report)
}
