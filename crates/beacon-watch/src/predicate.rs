//! Deciding whether a directory currently qualifies as a workspace.

use crate::patterns::{Pattern, WorkspacePatterns};
use std::io;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

/// Existence queries for a single glob below a directory.
pub trait GlobExpander: Send + Sync {
    /// Whether at least one entry below `directory` matches `pattern`,
    /// relative to `directory`.
    fn has_match(&self, directory: &Path, pattern: &Pattern) -> io::Result<bool>;
}

/// [`GlobExpander`] backed by the real filesystem.
///
/// Only regular files count. Dot-prefixed segments are skipped unless the
/// glob names one explicitly, and symlinks are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGlobExpander;

impl GlobExpander for FsGlobExpander {
    fn has_match(&self, directory: &Path, pattern: &Pattern) -> io::Result<bool> {
        let root = if directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            directory
        };

        if !std::fs::metadata(root)?.is_dir() {
            return Ok(false);
        }

        let mut walker = WalkDir::new(root).min_depth(1).follow_links(true);
        if let Some(depth) = pattern.max_segments() {
            walker = walker.max_depth(depth);
        }

        let include_hidden = pattern.names_hidden_segment();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| include_hidden || entry.depth() == 0 || !is_hidden(entry));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if pattern.matches_relative(relative) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Whether `directory` satisfies every pattern, checked against the real
/// filesystem.
pub fn is_workspace(directory: impl AsRef<Path>, patterns: &WorkspacePatterns) -> bool {
    is_workspace_with(directory, patterns, &FsGlobExpander)
}

/// Whether `directory` satisfies every pattern according to `expander`.
///
/// Patterns are checked in configured order and evaluation stops at the
/// first pattern without a match. A query that fails (for example because the
/// directory vanished mid-check) counts as no match. An empty pattern set is
/// vacuously satisfied.
pub fn is_workspace_with(
    directory: impl AsRef<Path>,
    patterns: &WorkspacePatterns,
    expander: &dyn GlobExpander,
) -> bool {
    let dir = directory.as_ref();
    patterns.iter().all(|pattern| match expander.has_match(dir, pattern) {
        Ok(found) => {
            trace!(
                "Pattern '{}' {} in '{}'",
                pattern.as_str(),
                if found { "matched" } else { "did not match" },
                dir.display()
            );
            found
        }
        Err(e) => {
            debug!(
                "Could not check pattern '{}' in '{}': {}",
                pattern.as_str(),
                dir.display(),
                e
            );
            false
        }
    })
}
