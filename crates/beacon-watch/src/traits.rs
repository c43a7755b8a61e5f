//! Seam between the workspace watcher and the filesystem notification layer.

use crate::{config::WatchOptions, error::Result, events::SourceEvent};
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

/// A source of raw file events below a root directory.
///
/// On `start` a source must report every file already present under the
/// root as [`crate::FileEventKind::Added`], follow that with exactly one
/// [`SourceEvent::InitialScanComplete`], and then keep reporting files as
/// they appear and disappear until `stop` is called.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Get the backend type identifier.
    fn backend_type(&self) -> &'static str;

    /// Begin delivering events for `root` into `sender`.
    async fn start(
        &mut self,
        root: &Path,
        options: &WatchOptions,
        sender: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<()>;

    /// Stop delivering events.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the source is currently delivering events.
    fn is_active(&self) -> bool;
}
