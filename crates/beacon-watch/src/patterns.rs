//! Marker glob compilation.
//!
//! Every configured glob is compiled twice: once into an un-anchored search
//! over arbitrary path strings (used to work out which directory a changed
//! file points at) and once into a matcher for paths relative to a candidate
//! directory (used when checking that the directory really is a workspace).

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use regex::bytes::Regex;
use std::fmt;
use std::path::Path;

/// A single compiled marker glob.
#[derive(Clone)]
pub struct Pattern {
    glob: String,
    search: Regex,
    relative: GlobMatcher,
}

impl Pattern {
    /// Compile a marker glob such as `info.json` or `logs/*.log`.
    pub fn new(glob: &str) -> Result<Self> {
        // `*` may cross `/` when searching inside a full path.
        let searchable = GlobBuilder::new(glob)
            .literal_separator(false)
            .build()
            .map_err(|e| Error::invalid_pattern(glob, e.kind()))?;
        let search = Regex::new(&unanchored(searchable.regex()))
            .map_err(|e| Error::invalid_pattern(glob, e))?;

        let relative = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::invalid_pattern(glob, e.kind()))?
            .compile_matcher();

        Ok(Self {
            glob: glob.to_string(),
            search,
            relative,
        })
    }

    /// The glob as configured.
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Byte offset of the leftmost match of this glob anywhere in `path`.
    ///
    /// Translated globs match bytes, so `?` or a class can start inside a
    /// multi-byte character. Such a match is moved back to the start of that
    /// character, which keeps the offset a valid `str` boundary.
    pub fn find_in(&self, path: &str) -> Option<usize> {
        let mut start = self.search.find(path.as_bytes())?.start();
        while !path.is_char_boundary(start) {
            start -= 1;
        }
        Some(start)
    }

    /// Whether `relative` (a path below a candidate directory) matches.
    pub fn matches_relative(&self, relative: &Path) -> bool {
        self.relative.is_match(relative)
    }

    /// Maximum number of path segments this glob can match, or `None` when
    /// it contains `**`.
    pub fn max_segments(&self) -> Option<usize> {
        if self.glob.contains("**") {
            None
        } else {
            Some(self.glob.matches('/').count() + 1)
        }
    }

    /// Whether the glob explicitly names a dot-prefixed segment.
    pub fn names_hidden_segment(&self) -> bool {
        self.glob.starts_with('.') || self.glob.contains("/.")
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("glob", &self.glob)
            .field("search", &self.search.as_str())
            .finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

/// Strip the `^`/`$` anchors globset puts around a translated glob, keeping
/// any leading inline flags such as `(?-u)`.
fn unanchored(anchored: &str) -> String {
    let (flags, body) = match anchored.find('^') {
        Some(idx) => anchored.split_at(idx),
        None => ("", anchored),
    };
    let body = body.strip_prefix('^').unwrap_or(body);
    let body = body.strip_suffix('$').unwrap_or(body);
    format!("{}{}", flags, body)
}

/// Ordered set of marker globs that together define a workspace directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspacePatterns {
    patterns: Vec<Pattern>,
}

impl WorkspacePatterns {
    /// Compile `globs` in order. Fails on the first malformed glob.
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|glob| Pattern::new(glob.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Compiled patterns in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Original glob strings in configured order.
    pub fn globs(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    /// Number of configured globs.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no globs are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_set_is_legal() {
        let patterns = WorkspacePatterns::new::<&str>(&[]).unwrap();
        assert!(patterns.is_empty());
        assert_eq!(patterns.len(), 0);
    }

    #[test]
    fn test_globs_keep_configured_order() {
        let patterns = WorkspacePatterns::new(&["info.json", "logs/*.log"]).unwrap();
        assert_eq!(patterns.globs(), vec!["info.json", "logs/*.log"]);
    }

    #[test]
    fn test_malformed_glob_is_rejected() {
        let err = WorkspacePatterns::new(&["info.json", "logs/[.log"]).unwrap_err();
        match err {
            Error::InvalidPattern { pattern, .. } => assert_eq!(pattern, "logs/[.log"),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_search_is_not_anchored() {
        let pattern = Pattern::new("info.json").unwrap();
        assert_eq!(pattern.find_in("path/to/info.json"), Some(8));
        assert_eq!(pattern.find_in("info.json"), Some(0));
        assert_eq!(pattern.find_in("path/to/info.json.bak"), Some(8));
        assert_eq!(pattern.find_in("path/to/other.json"), None);
    }

    #[test]
    fn test_search_star_crosses_separator() {
        let pattern = Pattern::new("logs/*.log").unwrap();
        assert_eq!(pattern.find_in("a/logs/b.log"), Some(2));
        assert_eq!(pattern.find_in("a/logs/deep/b.log"), Some(2));
    }

    #[test]
    fn test_search_supports_alternation() {
        let pattern = Pattern::new("info.{json,toml}").unwrap();
        assert_eq!(pattern.find_in("ws/info.toml"), Some(3));
        assert_eq!(pattern.find_in("ws/info.yaml"), None);
    }

    #[test]
    fn test_relative_star_stays_in_segment() {
        let pattern = Pattern::new("logs/*.log").unwrap();
        assert!(pattern.matches_relative(Path::new("logs/a.log")));
        assert!(!pattern.matches_relative(Path::new("logs/nested/a.log")));
        assert!(!pattern.matches_relative(Path::new("other/logs/a.log")));
    }

    #[test]
    fn test_max_segments() {
        assert_eq!(Pattern::new("info.json").unwrap().max_segments(), Some(1));
        assert_eq!(Pattern::new("logs/*.log").unwrap().max_segments(), Some(2));
        assert_eq!(Pattern::new("**/*.log").unwrap().max_segments(), None);
    }

    #[test]
    fn test_unanchored_keeps_flags() {
        assert_eq!(unanchored("(?-u)^foo\\.rs$"), "(?-u)foo\\.rs");
        assert_eq!(unanchored("(?-u)^cost\\$$"), "(?-u)cost\\$");
    }
}
