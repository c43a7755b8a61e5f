//! File events consumed by the registry and workspace lifecycle events it emits.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Kinds of raw file events delivered by an event source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileEventKind {
    /// A file appeared.
    Added,
    /// A file disappeared.
    Removed,
}

impl FileEventKind {
    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// A file appearing or disappearing below the watched root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEvent {
    /// Kind of file event.
    pub kind: FileEventKind,

    /// Path to the file.
    pub path: PathBuf,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Shorthand for an [`FileEventKind::Added`] event.
    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Added, path)
    }

    /// Shorthand for a [`FileEventKind::Removed`] event.
    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Removed, path)
    }
}

/// Messages an event source pushes to the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A raw file event.
    File(FileEvent),
    /// Every file that existed when watching started has been reported.
    InitialScanComplete,
}

/// Workspace lifecycle transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceEventKind {
    /// A directory became a workspace.
    Created,
    /// A directory stopped being a workspace.
    Deleted,
}

impl WorkspaceEventKind {
    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for WorkspaceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory crossing the workspace boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceEvent {
    /// Which way the directory crossed.
    pub kind: WorkspaceEventKind,

    /// The workspace directory, as implied by the triggering file path.
    pub directory: String,

    /// When the transition was recorded.
    pub timestamp: DateTime<Utc>,
}

impl WorkspaceEvent {
    /// Create a new lifecycle event stamped with the current time.
    pub fn new(kind: WorkspaceEventKind, directory: impl Into<String>) -> Self {
        Self {
            kind,
            directory: directory.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Callback invoked with the workspace directory.
pub type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks registered per lifecycle event kind.
///
/// Callbacks fire in registration order. Registering the same callback twice
/// makes it fire twice.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<WorkspaceEventKind, Vec<Listener>>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`.
    pub fn register(&self, kind: WorkspaceEventKind, listener: Listener) {
        self.listeners.write().entry(kind).or_default().push(listener);
    }

    /// Number of callbacks registered for `kind`.
    pub fn count(&self, kind: WorkspaceEventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every callback registered for `kind` with `directory`.
    ///
    /// The internal lock is released before any callback runs, so callbacks
    /// may register further listeners.
    pub fn emit(&self, kind: WorkspaceEventKind, directory: &str) {
        let listeners = self
            .listeners
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for listener in listeners {
            listener(directory);
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("created", &self.count(WorkspaceEventKind::Created))
            .field("deleted", &self.count(WorkspaceEventKind::Deleted))
            .finish()
    }
}
