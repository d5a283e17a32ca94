// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packing of analysis result files into the downloadable archive.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Errors while building the result archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Zip every regular file directly under `output_dir` into
/// `output_dir/<zip_file_name>`, then delete the originals. Returns the
/// names that were packed. Subdirectories are left untouched.
pub fn pack_output_files(
    output_dir: &Path,
    zip_file_name: &str,
) -> Result<Vec<String>, ArchiveError> {
    let target_path = output_dir.join(zip_file_name);
    let mut sources: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path != target_path {
            sources.push(path);
        }
    }
    sources.sort();

    let packed: Vec<String> = sources
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    info!(files = ?packed, archive = %target_path.display(), "packing output files");

    let mut writer = ZipWriter::new(BufWriter::new(File::create(&target_path)?));
    let options = SimpleFileOptions::default();
    for source in &sources {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.start_file(name, options)?;
        let mut reader = File::open(source)?;
        io::copy(&mut reader, &mut writer)?;
    }
    writer.finish()?;

    for source in &sources {
        std::fs::remove_file(source)?;
    }
    Ok(packed)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
