//! Configuration schema for workspace watching.

use crate::error::{Error, Result};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options handed to the event source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchOptions {
    /// Globs matched against each path component; matching directories and
    /// files are never reported.
    pub ignored: Vec<String>,
    /// Deepest directory nesting below the root that is still reported.
    pub max_depth: usize,
    /// Debounce window for native notifications, in milliseconds.
    pub debounce_ms: u64,
}

impl WatchOptions {
    /// Default maximum nesting depth.
    pub const DEFAULT_MAX_DEPTH: usize = 99;

    /// Default debounce window in milliseconds.
    pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

    /// Replace the ignore list.
    pub fn with_ignored<S: Into<String>>(mut self, ignored: impl IntoIterator<Item = S>) -> Self {
        self.ignored = ignored.into_iter().map(Into::into).collect();
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the debounce window.
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check that every ignore glob compiles.
    pub fn validate(&self) -> Result<()> {
        for glob in &self.ignored {
            Glob::new(glob)
                .map_err(|e| Error::Config(format!("invalid ignore glob '{}': {}", glob, e.kind())))?;
        }
        Ok(())
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            ignored: vec![".git".to_string(), "node_modules".to_string()],
            max_depth: Self::DEFAULT_MAX_DEPTH,
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Complete description of a workspace watcher.
///
/// ```toml
/// root = "workspaces"
/// patterns = ["info.json", "logs/*.log"]
///
/// [watch]
/// ignored = [".git", "node_modules", "target"]
/// max_depth = 8
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceWatchConfig {
    /// Directory tree to watch.
    pub root: PathBuf,
    /// Marker globs a workspace directory must satisfy.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Event source options.
    #[serde(default)]
    pub watch: WatchOptions,
}

impl WorkspaceWatchConfig {
    /// Create a configuration with default watch options.
    pub fn new<S: Into<String>>(root: impl Into<PathBuf>, patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            root: root.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            watch: WatchOptions::default(),
        }
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Config("root directory must not be empty".to_string()));
        }
        self.watch.validate()
    }
}
