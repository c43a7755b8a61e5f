//! Working out which directory a changed file points at.
//!
//! A marker file only *implies* a workspace root. Whether the directory is
//! really a workspace is decided by [`crate::predicate`], because a directory
//! needs a match for every configured glob.

use crate::patterns::WorkspacePatterns;
use std::path::is_separator;

/// Return the directory `file_path` implies under `patterns`, if any.
///
/// The first pattern (in configured order) that matches anywhere inside
/// `file_path` wins; the implied directory is everything before the match,
/// minus one trailing separator. A match at the very start of `file_path`
/// implies the empty string, which the registry checks against the watch root.
pub fn imply_directory(file_path: &str, patterns: &WorkspacePatterns) -> Option<String> {
    if patterns.is_empty() {
        return None;
    }

    let start = patterns.iter().find_map(|pattern| pattern.find_in(file_path))?;

    let mut directory = file_path[..start].to_string();
    if directory.chars().next_back().is_some_and(is_separator) {
        directory.pop();
    }
    Some(directory)
}
