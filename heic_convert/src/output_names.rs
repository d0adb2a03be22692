//! Output naming and collision handling
//!
//! Archive readers on case-insensitive filesystems treat `IMG.png` and
//! `img.png` as the same file, so uniqueness is checked case-insensitively.

use crate::types::TargetFormat;
use std::collections::HashSet;

const FALLBACK_BASE_NAME: &str = "image";

/// Make a base name safe to use as a flat archive entry.
pub fn sanitize_base_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        FALLBACK_BASE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `base + "." + extension-for-format`
pub fn output_file_name(base_name: &str, format: TargetFormat) -> String {
    format!("{}.{}", sanitize_base_name(base_name), format.extension())
}

/// Hands out unique names in the order they are claimed.
#[derive(Debug, Default)]
pub struct OutputNamer {
    taken: HashSet<String>,
}

impl OutputNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `file_name` if unused, otherwise the first free `stem_N.ext`.
    pub fn claim(&mut self, file_name: &str) -> String {
        if self.taken.insert(file_name.to_lowercase()) {
            return file_name.to_string();
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };
        let mut n = 1usize;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}
