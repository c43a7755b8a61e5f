//! Public facade tying an event source to the workspace registry.

use crate::{
    backends::NotifySource,
    config::{WatchOptions, WorkspaceWatchConfig},
    error::{Error, Result},
    events::{SourceEvent, WorkspaceEvent, WorkspaceEventKind},
    patterns::WorkspacePatterns,
    registry::WorkspaceRegistry,
    traits::EventSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Watches a directory tree and reports directories that become, or stop
/// being, workspaces.
///
/// ```no_run
/// use beacon_watch::{WorkspaceEventKind, WorkspaceWatcher};
///
/// # async fn example() -> beacon_watch::Result<()> {
/// let mut watcher = WorkspaceWatcher::new("workspaces", &["info.json"])?;
/// watcher.on(WorkspaceEventKind::Created, |dir| println!("new workspace: {}", dir));
/// watcher.start().await?;
/// watcher.ready().await?;
/// println!("{:?}", watcher.list_workspaces());
/// watcher.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct WorkspaceWatcher {
    root: PathBuf,
    options: WatchOptions,
    registry: Arc<WorkspaceRegistry>,
    source: Box<dyn EventSource>,
    /// Event processing task
    processor_task: Option<JoinHandle<()>>,
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Set once the initial scan has been processed. Closed when the event
    /// task ends.
    ready_rx: watch::Receiver<bool>,
}

impl WorkspaceWatcher {
    /// Create a watcher for `root` backed by native filesystem notifications.
    ///
    /// Fails with [`Error::InvalidPattern`] if any glob is malformed.
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> Result<Self> {
        Self::with_source(root, patterns, Box::new(NotifySource::new()))
    }

    /// Create a watcher whose raw events come from `source`.
    pub fn with_source<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        patterns: &[S],
        source: Box<dyn EventSource>,
    ) -> Result<Self> {
        let patterns = WorkspacePatterns::new(patterns)?;
        Ok(Self::from_parts(
            root.into(),
            WatchOptions::default(),
            WorkspaceRegistry::new(patterns),
            source,
        ))
    }

    /// Create a watcher from a loaded configuration.
    pub fn from_config(config: &WorkspaceWatchConfig) -> Result<Self> {
        config.validate()?;
        let patterns = WorkspacePatterns::new(&config.patterns)?;
        Ok(Self::from_parts(
            config.root.clone(),
            config.watch.clone(),
            WorkspaceRegistry::new(patterns),
            Box::new(NotifySource::new()),
        ))
    }

    /// Assemble a watcher from an existing registry and source.
    ///
    /// The registry resolves the empty implied directory to `root`.
    pub fn from_parts(
        root: PathBuf,
        options: WatchOptions,
        registry: WorkspaceRegistry,
        source: Box<dyn EventSource>,
    ) -> Self {
        let (_, ready_rx) = watch::channel(false);
        Self {
            registry: Arc::new(registry.with_root(root.clone())),
            root,
            options,
            source,
            processor_task: None,
            shutdown_tx: None,
            ready_rx,
        }
    }

    /// Replace the source options. Takes effect on the next `start`.
    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// The watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configured marker globs.
    pub fn patterns(&self) -> &WorkspacePatterns {
        self.registry.patterns()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<WorkspaceRegistry> {
        &self.registry
    }

    /// Register a callback for `kind`. Callbacks run in registration order on
    /// the watcher's event task.
    pub fn on<F>(&self, kind: WorkspaceEventKind, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.registry.on(kind, callback);
    }

    /// Receive every lifecycle event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.registry.subscribe()
    }

    /// Snapshot of the known workspaces, in no particular order.
    pub fn list_workspaces(&self) -> Vec<String> {
        self.registry.list_workspaces()
    }

    /// Whether the watcher is started and its event task is still alive.
    pub fn is_running(&self) -> bool {
        self.processor_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start consuming events, beginning with a scan of files that already
    /// exist under the root.
    ///
    /// A watcher whose event task has ended (for example because a listener
    /// panicked) is torn down and started again.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyStarted);
        }
        if self.processor_task.is_some() {
            warn!("Event task ended unexpectedly, restarting the watcher");
            if let Err(e) = self.stop().await {
                warn!("Teardown of the previous run failed: {}", e);
            }
        }

        info!(
            "Starting workspace watcher on {} with patterns {:?}",
            self.root.display(),
            self.registry.patterns().globs()
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.source.start(&self.root, &self.options, event_tx).await?;

        let (ready_tx, ready_rx) = watch::channel(false);
        self.ready_rx = ready_rx;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.processor_task = Some(tokio::spawn(Self::process_events(
            event_rx,
            shutdown_rx,
            Arc::clone(&self.registry),
            ready_tx,
        )));

        info!("Workspace watcher started using {} source", self.source.backend_type());
        Ok(())
    }

    /// Stop consuming events.
    ///
    /// Returns once the event task has finished, so no lifecycle event fires
    /// after this returns. Known workspaces are forgotten without `deleted`
    /// events, even when the event task failed.
    pub async fn stop(&mut self) -> Result<()> {
        let task = self.processor_task.take().ok_or(Error::NotStarted)?;
        info!("Stopping workspace watcher on {}", self.root.display());

        let source_result = self.source.stop().await;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
        let task_result = task
            .await
            .map_err(|e| Error::Internal(format!("Event task failed: {}", e)));

        self.registry.clear();
        info!("Workspace watcher stopped");
        task_result?;
        source_result
    }

    /// Wait until every file present at start has been processed.
    ///
    /// Fails if the event task ends before that happens.
    pub async fn ready(&self) -> Result<()> {
        if self.processor_task.is_none() {
            return Err(Error::NotStarted);
        }
        let mut ready_rx = self.ready_rx.clone();
        ready_rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| Error::Internal("Event task ended before the initial scan".to_string()))
    }

    async fn process_events(
        mut events: mpsc::UnboundedReceiver<SourceEvent>,
        mut shutdown: mpsc::Receiver<()>,
        registry: Arc<WorkspaceRegistry>,
        ready_tx: watch::Sender<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!("Event task shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(SourceEvent::File(event)) => {
                        registry.handle(&event).await;
                    }
                    Some(SourceEvent::InitialScanComplete) => {
                        info!("Initial scan processed, {} workspaces known", registry.len());
                        ready_tx.send_replace(true);
                    }
                    None => {
                        debug!("Event source closed");
                        break;
                    }
                },
            }
        }
    }
}

impl std::fmt::Debug for WorkspaceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceWatcher")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("source", &self.source.backend_type())
            .field("running", &self.is_running())
            .finish()
    }
}
