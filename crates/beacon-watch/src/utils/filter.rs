//! Ignore-list and depth filtering shared by event sources.

use crate::{
    config::WatchOptions,
    error::{Error, Result},
};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};

/// Decides which paths below a root an event source reports.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    ignored: GlobSet,
    max_depth: usize,
}

impl PathFilter {
    /// Build a filter for `root` from `options`.
    pub fn new(root: &Path, options: &WatchOptions) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for glob in &options.ignored {
            let glob = Glob::new(glob)
                .map_err(|e| Error::Config(format!("invalid ignore glob '{}': {}", glob, e.kind())))?;
            builder.add(glob);
        }
        let ignored = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid ignore list: {}", e)))?;

        Ok(Self {
            root: root.to_path_buf(),
            ignored,
            max_depth: options.max_depth,
        })
    }

    /// The root this filter is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether any component of `path` below the root is ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.relative(path)
            .components()
            .any(|component| match component {
                Component::Normal(name) => self.ignored.is_match(name),
                _ => false,
            })
    }

    /// Number of path components between the root and `path`.
    pub fn levels(&self, path: &Path) -> usize {
        self.relative(path).components().count()
    }

    /// Nesting depth of `path` below the root; direct children are at depth 0.
    pub fn depth(&self, path: &Path) -> usize {
        self.levels(path).saturating_sub(1)
    }

    /// Whether `path` should be reported.
    pub fn allows(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && !self.is_ignored(path) && self.depth(path) <= self.max_depth
    }

    /// Deepest `walkdir` depth below `dir` that can still yield reportable
    /// entries.
    pub fn walk_depth(&self, dir: &Path) -> usize {
        self.max_depth
            .saturating_add(1)
            .saturating_sub(self.levels(dir))
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
