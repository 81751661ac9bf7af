//! Audio file scanner
//!
//! Depth-first directory walk that hands every regular file with a recognised
//! extension to a visitor as soon as it is found, so analysis can start while
//! the walk is still running.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;
use waveplot_common::config::DEFAULT_EXTENSIONS;

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Counts from one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Regular files seen
    pub files_seen: usize,
    /// Files handed to the visitor
    pub files_queued: usize,
    /// Directory entries that could not be read
    pub entry_errors: usize,
    /// The visitor asked to stop before the walk finished
    pub stopped_early: bool,
}

/// Audio file scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    /// Recognised extensions including the leading dot, matched case-sensitively
    extensions: Vec<String>,
}

impl FileScanner {
    /// Create a scanner recognising `.mp3` and `.flac`
    pub fn new() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }

    /// Create a scanner with a custom extension allow-list (e.g. `".ogg"`)
    pub fn with_extensions(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Check whether a path has a recognised extension
    pub fn is_recognized(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let dotted = format!(".{}", ext.to_string_lossy());
                self.extensions.iter().any(|e| *e == dotted)
            }
            None => false,
        }
    }

    /// Walk `root`, calling `visit` for each recognised file
    ///
    /// `visit` returns `false` to stop the walk. Unreadable entries are
    /// logged and skipped.
    pub fn walk<F>(&self, root: &Path, mut visit: F) -> Result<WalkSummary, ScanError>
    where
        F: FnMut(PathBuf) -> bool,
    {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut summary = WalkSummary::default();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    summary.entry_errors += 1;
                    continue;
                }
            };

            // Symlinked files count; symlinked directories are not descended
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            summary.files_seen += 1;

            if !self.is_recognized(entry.path()) {
                debug!(file = %entry.path().display(), "Unrecognised extension, skipping");
                continue;
            }

            summary.files_queued += 1;
            if !visit(entry.into_path()) {
                summary.stopped_early = true;
                break;
            }
        }

        debug!(
            "Walk complete: {} of {} files queued",
            summary.files_queued, summary.files_seen
        );

        Ok(summary)
    }

    /// Collect every recognised file under `root`
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();
        self.walk(root, |path| {
            files.push(path);
            true
        })?;
        Ok(files)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
