//! Pack and unpack commands

use std::path::Path;

use super::AppContext;
use crate::audit::Operation;
use crate::error::SealResult;
use crate::services::{compress_directory, extract_archive};

/// Zip a directory tree
pub fn handle_pack(ctx: &AppContext, source_dir: &Path, archive: &Path) -> SealResult<()> {
    let result = compress_directory(source_dir, archive);
    ctx.record(Operation::Pack, source_dir, archive, &result);
    let report = result?;

    println!(
        "Packed {} file(s) and {} directory(ies) from {} into {}",
        report.files,
        report.directories,
        source_dir.display(),
        archive.display()
    );
    Ok(())
}

/// Extract a zip archive
pub fn handle_unpack(ctx: &AppContext, archive: &Path, dest_dir: &Path) -> SealResult<()> {
    let result = extract_archive(archive, dest_dir);
    ctx.record(Operation::Unpack, archive, dest_dir, &result);
    let report = result?;

    println!(
        "Extracted {} file(s) into {}",
        report.files,
        dest_dir.display()
    );
    Ok(())
}
