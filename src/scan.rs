//! HTML file discovery.
//!
//! Walks the site root recursively and returns every `.html`/`.htm` file
//! (extension matched case-insensitively) as a path relative to the root.
//! Entries are visited sorted by file name, so the scan order, and with it
//! the "first reference wins" compression order, is the same on every run.
//!
//! An optional exclude regex is matched against the relative path, always
//! written with `/` separators.

use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid exclude pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

pub fn compile_exclude(pattern: &str) -> Result<Regex, ScanError> {
    Ok(Regex::new(pattern)?)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Relative path with `/` separators, as matched by the exclude pattern.
fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Find the HTML files under `root`, in scan order.
pub fn scan(root: &Path, exclude: Option<&Regex>) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_html(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if exclude.is_some_and(|re| re.is_match(&slash_path(relative))) {
            continue;
        }
        files.push(relative.to_path_buf());
    }
    Ok(files)
}
