//! Batch Input Collection
//!
//! Gathers HEIC files from the paths a user hands the tool: plain files are
//! taken as-is, directories are scanned for matching extensions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const HEIC_EXTENSIONS: &[&str] = &["heic", "heif", "hif"];

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|want| *want == ext)
        })
        .unwrap_or(false)
}

pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect();
    // Directory iteration order is filesystem-dependent; batch order must not be.
    files.sort();
    files
}

/// Expand a mix of files and directories into the ordered input list.
///
/// Explicit files keep the position the caller gave them, even without a
/// HEIC extension; directory contents are filtered and sorted.
pub fn collect_inputs(paths: &[PathBuf], extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(collect_files(path, extensions, recursive));
        } else {
            out.push(path.clone());
        }
    }
    out
}

/// Per-batch counters. `total` always equals `succeeded + failed + skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never started because the batch was cancelled
    pub skipped: usize,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self) {
        self.total += 1;
        self.failed += 1;
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}
