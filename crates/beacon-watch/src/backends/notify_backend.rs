//! Notify-based event source with debouncing and an initial scan.

use crate::{
    config::WatchOptions,
    error::{Error, Result},
    events::{FileEvent, SourceEvent},
    traits::EventSource,
    utils::filter::PathFilter,
};
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use walkdir::WalkDir;

/// Turns native notifications into `Added`/`Removed` file events.
///
/// Keeps an index of every file it has reported so that a file is never
/// reported added twice and removing a directory reports every file that
/// was under it.
struct EventTranslator {
    filter: PathFilter,
    index: Mutex<BTreeSet<PathBuf>>,
    sender: mpsc::UnboundedSender<SourceEvent>,
}

impl EventTranslator {
    fn new(filter: PathFilter, sender: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self {
            filter,
            index: Mutex::new(BTreeSet::new()),
            sender,
        }
    }

    fn handle(&self, event: &notify::Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.iter().for_each(|path| self.added(path));
            }
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                event.paths.iter().for_each(|path| self.removed(path));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to, ..] = event.paths.as_slice() {
                    self.removed(from);
                    self.added(to);
                }
            }
            // Backends that cannot tell which way a rename went.
            EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any | EventKind::Other => {
                event.paths.iter().for_each(|path| self.reconcile(path));
            }
            _ => trace!("Ignoring {:?} for {:?}", event.kind, event.paths),
        }
    }

    fn added(&self, path: &Path) {
        if !self.filter.allows(path) {
            trace!("Filtered out: {}", path.display());
            return;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("{} vanished before it could be inspected: {}", path.display(), e);
                return;
            }
        };

        if metadata.is_dir() {
            self.walk(path, None);
        } else if metadata.is_file() {
            self.report_added(path.to_path_buf());
        }
    }

    fn removed(&self, path: &Path) {
        let gone: Vec<PathBuf> = {
            let mut index = self.index.lock();
            let gone: Vec<PathBuf> = index
                .range(path.to_path_buf()..)
                .take_while(|known| known.starts_with(path))
                .cloned()
                .collect();
            for known in &gone {
                index.remove(known);
            }
            gone
        };

        for file in gone {
            self.send(FileEvent::removed(file));
        }
    }

    fn reconcile(&self, path: &Path) {
        if path.exists() {
            self.added(path);
        } else {
            self.removed(path);
        }
    }

    /// Report every file below `dir`, stopping early once `cancelled` is set.
    fn walk(&self, dir: &Path, cancelled: Option<&AtomicBool>) {
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(self.filter.walk_depth(dir))
            .into_iter()
            .filter_entry(|entry| self.filter.allows(entry.path()));

        for entry in walker {
            if cancelled.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("Scan of {} cancelled", dir.display());
                return;
            }
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    self.report_added(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => trace!("Skipping unreadable entry under {}: {}", dir.display(), e),
            }
        }
    }

    /// Report everything under the root, then signal the end of the scan.
    fn initial_scan(&self, cancelled: &AtomicBool) {
        let root = self.filter.root().to_path_buf();
        self.walk(&root, Some(cancelled));
        if !cancelled.load(Ordering::Relaxed) {
            let known = self.index.lock().len();
            info!("Initial scan of {} found {} files", root.display(), known);
            if self.sender.send(SourceEvent::InitialScanComplete).is_err() {
                debug!("Receiver dropped before the initial scan completed");
            }
        }
    }

    fn report_added(&self, file: PathBuf) {
        if self.index.lock().insert(file.clone()) {
            self.send(FileEvent::added(file));
        }
    }

    fn send(&self, event: FileEvent) {
        trace!("{} {}", event.kind.as_str(), event.path.display());
        if let Err(e) = self.sender.send(SourceEvent::File(event)) {
            debug!("Dropping file event, receiver is gone: {}", e);
        }
    }
}

/// Notify-based event source.
///
/// Watches the root recursively through a debounced native watcher, reports
/// files that already exist via a walk of the tree, and filters both through
/// the configured ignore list and depth limit.
pub struct NotifySource {
    /// Debounced file system watcher
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
    /// Initial scan running on the blocking pool
    scan_task: Option<JoinHandle<()>>,
    /// Set to abandon an in-progress scan
    cancelled: Arc<AtomicBool>,
}

impl NotifySource {
    /// Create a new notify-based source.
    pub fn new() -> Self {
        Self {
            debouncer: None,
            scan_task: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for NotifySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for NotifySource {
    fn backend_type(&self) -> &'static str {
        "notify"
    }

    async fn start(
        &mut self,
        root: &Path,
        options: &WatchOptions,
        sender: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<()> {
        if self.debouncer.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let filter = PathFilter::new(root, options)?;
        let translator = Arc::new(EventTranslator::new(filter, sender));

        let handler = Arc::clone(&translator);
        let mut debouncer = new_debouncer(
            options.debounce(),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        handler.handle(&event.event);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("Notify error: {:?}", error);
                    }
                }
            },
        )
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        debouncer
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", root.display(), e)))?;

        // Watch first, then scan, so nothing created in between is missed.
        self.cancelled = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::clone(&self.cancelled);
        self.scan_task = Some(tokio::task::spawn_blocking(move || {
            translator.initial_scan(&cancelled);
        }));
        self.debouncer = Some(debouncer);

        info!("Notify source watching {}", root.display());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let debouncer = self.debouncer.take().ok_or(Error::NotStarted)?;

        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(task) = self.scan_task.take() {
            if let Err(e) = task.await {
                warn!("Initial scan task failed: {}", e);
            }
        }

        // Joins the debouncer thread.
        tokio::task::spawn_blocking(move || debouncer.stop())
            .await
            .map_err(|e| Error::Internal(format!("Failed to stop notify watcher: {}", e)))?;

        info!("Notify source stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.debouncer.is_some()
    }
}
