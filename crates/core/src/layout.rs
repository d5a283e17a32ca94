// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic per-ticket filesystem layout.
//!
//! ```text
//! <cache>/<ticket-hex>/
//!   input/<param-name>/<filename>
//!   output/<generated-zip-name>
//! ```

use crate::method::AnalysisMethodName;
use crate::ticket::Ticket;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// Path arithmetic for the pipeline-run cache directory.
#[derive(Debug, Clone)]
pub struct FileLayout {
    cache_dir: PathBuf,
}

impl FileLayout {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Root directory of one ticket's files.
    pub fn files_base_dir(&self, ticket: &Ticket) -> PathBuf {
        self.cache_dir.join(ticket.as_str())
    }

    /// Directory holding files attached to one parameter.
    pub fn input_dir(&self, ticket: &Ticket, param_name: &str) -> PathBuf {
        self.files_base_dir(ticket).join("input").join(param_name)
    }

    pub fn input_file_path(&self, ticket: &Ticket, param_name: &str, filename: &str) -> PathBuf {
        self.input_dir(ticket, param_name).join(filename)
    }

    /// Directory the engine writes its result files into.
    pub fn output_dir(&self, ticket: &Ticket) -> PathBuf {
        self.files_base_dir(ticket).join("output")
    }

    pub fn output_zip_path(&self, ticket: &Ticket, zip_file_name: &str) -> PathBuf {
        self.output_dir(ticket).join(zip_file_name)
    }

    /// Total size of everything under the cache directory. A missing cache
    /// directory counts as zero.
    pub fn cache_size_bytes(&self) -> io::Result<u64> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        directory_size_bytes(&self.cache_dir)
    }
}

fn directory_size_bytes(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += directory_size_bytes(&entry.path())?;
        } else if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Strip an uploaded filename down to alphanumerics plus `.`, `_` and `-`.
///
/// Spaces do not survive. The result may be empty; callers substitute a
/// generated name in that case.
pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Name for the result archive of a finished run. The value is opaque to
/// clients; the timestamp only keeps re-runs distinguishable.
pub fn generate_output_zip_file_name(
    method: AnalysisMethodName,
    now: DateTime<Utc>,
) -> String {
    format!(
        "output-metakegg-{}_{}.zip",
        method.as_str(),
        now.format("%Y-%m-%d-%H-%M-%S")
    )
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
