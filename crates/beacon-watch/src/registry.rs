//! The workspace state machine.
//!
//! Every directory is implicitly `unknown` until a file event implies it and
//! the predicate confirms it, at which point it becomes a known workspace and
//! a `created` event fires. It returns to `unknown` (firing `deleted`) only
//! when a removal implies it and the predicate no longer holds. Churn that
//! does not cross that boundary is silent.

use crate::{
    events::{FileEvent, FileEventKind, Listener, ListenerRegistry, WorkspaceEvent, WorkspaceEventKind},
    implication::imply_directory,
    patterns::WorkspacePatterns,
    predicate::{is_workspace_with, FsGlobExpander, GlobExpander},
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Capacity of the lifecycle broadcast channel.
const BROADCAST_CAPACITY: usize = 256;

/// Set of known workspaces plus the listeners told about changes to it.
pub struct WorkspaceRegistry {
    /// Directory an empty implied directory refers to.
    root: PathBuf,
    patterns: Arc<WorkspacePatterns>,
    expander: Arc<dyn GlobExpander>,
    workspaces: RwLock<HashSet<String>>,
    listeners: ListenerRegistry,
    broadcaster: broadcast::Sender<WorkspaceEvent>,
}

impl WorkspaceRegistry {
    /// Create a registry that checks candidates against the real filesystem.
    pub fn new(patterns: WorkspacePatterns) -> Self {
        Self::with_expander(patterns, Arc::new(FsGlobExpander))
    }

    /// Create a registry that answers existence queries with `expander`.
    pub fn with_expander(patterns: WorkspacePatterns, expander: Arc<dyn GlobExpander>) -> Self {
        let (broadcaster, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            root: PathBuf::new(),
            patterns: Arc::new(patterns),
            expander,
            workspaces: RwLock::new(HashSet::new()),
            listeners: ListenerRegistry::new(),
            broadcaster,
        }
    }

    /// Resolve the empty implied directory (a marker matched at the very
    /// start of an event path) to `root` when checking it.
    ///
    /// Without a root the empty directory is checked against the process
    /// working directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// The directory the empty implied directory is checked against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The marker globs this registry applies.
    pub fn patterns(&self) -> &WorkspacePatterns {
        &self.patterns
    }

    /// Register a callback for `kind`.
    pub fn on<F>(&self, kind: WorkspaceEventKind, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(callback);
        self.listeners.register(kind, listener);
    }

    /// Receive every lifecycle event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.broadcaster.subscribe()
    }

    /// Snapshot of the known workspaces, in no particular order.
    pub fn list_workspaces(&self) -> Vec<String> {
        self.workspaces.read().iter().cloned().collect()
    }

    /// Whether `directory` is a known workspace.
    pub fn contains(&self, directory: &str) -> bool {
        self.workspaces.read().contains(directory)
    }

    /// Number of known workspaces.
    pub fn len(&self) -> usize {
        self.workspaces.read().len()
    }

    /// Whether no workspaces are known.
    pub fn is_empty(&self) -> bool {
        self.workspaces.read().is_empty()
    }

    /// Forget every known workspace without emitting events.
    pub(crate) fn clear(&self) {
        self.workspaces.write().clear();
    }

    /// Apply one raw file event, returning the lifecycle event it caused.
    pub async fn handle(&self, event: &FileEvent) -> Option<WorkspaceEvent> {
        let path = event.path.to_string_lossy();
        let Some(directory) = imply_directory(&path, &self.patterns) else {
            trace!("{} {} implies no workspace", event.kind.as_str(), path);
            return None;
        };

        match event.kind {
            FileEventKind::Added => {
                if self.contains(&directory) {
                    trace!("'{}' is already a workspace", directory);
                    return None;
                }
                if !self.check(&directory).await {
                    debug!("'{}' does not satisfy every pattern yet", directory);
                    return None;
                }
                if !self.workspaces.write().insert(directory.clone()) {
                    return None;
                }
                Some(self.emit(WorkspaceEventKind::Created, directory))
            }
            FileEventKind::Removed => {
                if !self.contains(&directory) {
                    trace!("'{}' is not a known workspace", directory);
                    return None;
                }
                if self.check(&directory).await {
                    debug!("'{}' still satisfies every pattern", directory);
                    return None;
                }
                if !self.workspaces.write().remove(&directory) {
                    return None;
                }
                Some(self.emit(WorkspaceEventKind::Deleted, directory))
            }
        }
    }

    /// Evaluate the predicate for `directory` on the blocking pool.
    async fn check(&self, directory: &str) -> bool {
        let directory = if directory.is_empty() {
            self.root.clone()
        } else {
            PathBuf::from(directory)
        };
        let patterns = Arc::clone(&self.patterns);
        let expander = Arc::clone(&self.expander);

        match tokio::task::spawn_blocking(move || {
            is_workspace_with(&directory, &patterns, expander.as_ref())
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Workspace check task failed: {}", e);
                false
            }
        }
    }

    fn emit(&self, kind: WorkspaceEventKind, directory: String) -> WorkspaceEvent {
        info!("Workspace {}: {}", kind, directory);
        self.listeners.emit(kind, &directory);

        let event = WorkspaceEvent::new(kind, directory);
        // No subscribers is fine.
        let _ = self.broadcaster.send(event.clone());
        event
    }
}

impl std::fmt::Debug for WorkspaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceRegistry")
            .field("root", &self.root)
            .field("patterns", &self.patterns.globs())
            .field("workspaces", &self.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}
