//! Read access to the workspace documents the sync engine consumes.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// A workspace directory holding the memory file and daily notes.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Read a document's text by workspace-relative path.
    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read document {}", path.display()))
    }

    /// File names of daily notes under `dir`, sorted lexicographically
    /// ascending (which is date order for `YYYY-MM-DD` prefixes).
    pub fn daily_notes(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.root.join(dir);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&path)
            .with_context(|| format!("failed to list {}", path.display()))?
        {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if is_daily_note(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// True for `YYYY-MM-DD*.md` file names.
pub fn is_daily_note(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < 13 || !name.ends_with(".md") {
        return false;
    }
    let digits = [0, 1, 2, 3, 5, 6, 8, 9];
    digits.iter().all(|&i| bytes[i].is_ascii_digit()) && bytes[4] == b'-' && bytes[7] == b'-'
}
