//! Event source fed programmatically instead of by the operating system.
//!
//! Useful for editor integrations that already know which files they wrote,
//! and for driving a [`crate::WorkspaceWatcher`] deterministically.

use crate::{
    config::WatchOptions,
    error::{Error, Result},
    events::{FileEvent, SourceEvent},
    traits::EventSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

type SharedSender = Arc<Mutex<Option<mpsc::UnboundedSender<SourceEvent>>>>;

/// Event source whose events are pushed through a [`ManualSourceHandle`].
pub struct ManualSource {
    sender: SharedSender,
    /// Files reported on start, followed by the end of the initial scan.
    /// `None` leaves the scan open until [`ManualSourceHandle::scan_complete`].
    initial_files: Option<Vec<PathBuf>>,
}

impl ManualSource {
    /// Create a source plus the handle that feeds it.
    ///
    /// The initial scan stays open until the handle calls
    /// [`ManualSourceHandle::scan_complete`].
    pub fn new() -> (Self, ManualSourceHandle) {
        Self::build(None)
    }

    /// Create a source that reports `files` as the whole initial scan on start.
    pub fn with_initial_files(files: Vec<PathBuf>) -> (Self, ManualSourceHandle) {
        Self::build(Some(files))
    }

    fn build(initial_files: Option<Vec<PathBuf>>) -> (Self, ManualSourceHandle) {
        let sender: SharedSender = Arc::new(Mutex::new(None));
        let handle = ManualSourceHandle {
            sender: Arc::clone(&sender),
        };
        (
            Self {
                sender,
                initial_files,
            },
            handle,
        )
    }
}

#[async_trait]
impl EventSource for ManualSource {
    fn backend_type(&self) -> &'static str {
        "manual"
    }

    async fn start(
        &mut self,
        root: &Path,
        _options: &WatchOptions,
        sender: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<()> {
        let mut slot = self.sender.lock();
        if slot.is_some() {
            return Err(Error::AlreadyStarted);
        }

        if let Some(files) = &self.initial_files {
            for file in files {
                sender
                    .send(SourceEvent::File(FileEvent::added(file.clone())))
                    .map_err(|e| Error::Internal(format!("Channel send error: {}", e)))?;
            }
            sender
                .send(SourceEvent::InitialScanComplete)
                .map_err(|e| Error::Internal(format!("Channel send error: {}", e)))?;
        }

        *slot = Some(sender);
        info!("Manual source started for {}", root.display());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.sender.lock().take().ok_or(Error::NotStarted)?;
        info!("Manual source stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.sender.lock().is_some()
    }
}

/// Feeds events into a started [`ManualSource`].
#[derive(Clone)]
pub struct ManualSourceHandle {
    sender: SharedSender,
}

impl ManualSourceHandle {
    /// Report that `path` appeared. Returns whether the event was delivered.
    pub fn added(&self, path: impl Into<PathBuf>) -> bool {
        self.send(SourceEvent::File(FileEvent::added(path)))
    }

    /// Report that `path` disappeared. Returns whether the event was delivered.
    pub fn removed(&self, path: impl Into<PathBuf>) -> bool {
        self.send(SourceEvent::File(FileEvent::removed(path)))
    }

    /// Report that every pre-existing file has been delivered. Returns whether
    /// the marker was delivered.
    pub fn scan_complete(&self) -> bool {
        self.send(SourceEvent::InitialScanComplete)
    }

    /// Whether the source is started and accepting events.
    pub fn is_connected(&self) -> bool {
        self.sender.lock().is_some()
    }

    fn send(&self, event: SourceEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => {
                debug!("Manual source is not started; dropping {:?}", event);
                false
            }
        }
    }
}
