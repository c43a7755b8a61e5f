//! End-to-end tests for WorkspaceWatcher against a real directory tree.
//!
//! These drive the notify backend, so every expectation waits on the
//! lifecycle broadcast with a timeout instead of sleeping a fixed amount.

use beacon_watch::{
    Error, WatchOptions, WorkspaceEvent, WorkspaceEventKind, WorkspaceWatchConfig,
    WorkspaceWatcher,
};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(500);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Temp root with symlinks resolved, so paths reported by the OS match.
fn temp_root() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    (temp, root)
}

fn dir_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn next_event(rx: &mut broadcast::Receiver<WorkspaceEvent>) -> WorkspaceEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a workspace event")
        .expect("workspace event channel closed")
}

async fn assert_quiet(rx: &mut broadcast::Receiver<WorkspaceEvent>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    match rx.try_recv() {
        Err(TryRecvError::Empty) => {}
        other => panic!("expected no workspace event, got {:?}", other),
    }
}

async fn started(root: &Path, patterns: &[&str]) -> WorkspaceWatcher {
    init_tracing();
    let mut watcher = WorkspaceWatcher::new(root, patterns)
        .unwrap()
        .with_options(WatchOptions::default().with_debounce_ms(50));
    watcher.start().await.unwrap();
    watcher.ready().await.unwrap();
    watcher
}

#[tokio::test]
async fn test_marker_file_creates_and_deletes_workspace() {
    let (_temp, root) = temp_root();
    let mut watcher = WorkspaceWatcher::new(&root, &["info.json"])
        .unwrap()
        .with_options(WatchOptions::default().with_debounce_ms(50));

    let created = Arc::new(Mutex::new(Vec::new()));
    let deleted = Arc::new(Mutex::new(Vec::new()));
    {
        let created = Arc::clone(&created);
        watcher.on(WorkspaceEventKind::Created, move |dir| {
            created.lock().push(dir.to_string())
        });
    }
    {
        let deleted = Arc::clone(&deleted);
        watcher.on(WorkspaceEventKind::Deleted, move |dir| {
            deleted.lock().push(dir.to_string())
        });
    }
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();
    watcher.ready().await.unwrap();

    let dir = root.join("new_directory");
    fs::create_dir(&dir).unwrap();
    assert_quiet(&mut rx).await;
    assert!(created.lock().is_empty());
    assert!(deleted.lock().is_empty());
    assert!(watcher.list_workspaces().is_empty());

    fs::write(dir.join("info.json"), "").unwrap();
    let event = next_event(&mut rx).await;
    assert_eq!(event.kind, WorkspaceEventKind::Created);
    assert_eq!(event.directory, dir_string(&dir));
    assert_eq!(*created.lock(), vec![dir_string(&dir)]);
    assert!(deleted.lock().is_empty());
    assert_eq!(watcher.list_workspaces(), vec![dir_string(&dir)]);

    fs::remove_file(dir.join("info.json")).unwrap();
    let event = next_event(&mut rx).await;
    assert_eq!(event.kind, WorkspaceEventKind::Deleted);
    assert_eq!(event.directory, dir_string(&dir));
    assert_eq!(*created.lock(), vec![dir_string(&dir)]);
    assert_eq!(*deleted.lock(), vec![dir_string(&dir)]);
    assert!(watcher.list_workspaces().is_empty());

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_compound_patterns_need_every_marker() {
    let (_temp, root) = temp_root();
    let mut watcher = started(&root, &["info.json", "logs/*.log"]).await;
    let mut rx = watcher.subscribe();

    let dir = root.join("run");
    fs::create_dir_all(dir.join("logs")).unwrap();
    fs::write(dir.join("info.json"), "{}").unwrap();
    assert_quiet(&mut rx).await;

    fs::write(dir.join("logs").join("a.log"), "").unwrap();
    let event = next_event(&mut rx).await;
    assert_eq!(event.kind, WorkspaceEventKind::Created);
    assert_eq!(event.directory, dir_string(&dir));

    // A second log file does not cross the boundary again.
    fs::write(dir.join("logs").join("b.log"), "").unwrap();
    assert_quiet(&mut rx).await;

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_existing_workspaces_are_found_on_start() {
    let (_temp, root) = temp_root();
    for name in ["alpha", "beta"] {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("info.json"), "{}").unwrap();
    }
    fs::create_dir_all(root.join("plain")).unwrap();

    let mut watcher = started(&root, &["info.json"]).await;

    let mut listed = watcher.list_workspaces();
    listed.sort();
    assert_eq!(
        listed,
        vec![dir_string(&root.join("alpha")), dir_string(&root.join("beta"))]
    );

    watcher.stop().await.unwrap();
    assert!(watcher.list_workspaces().is_empty());
}

#[tokio::test]
async fn test_marker_round_trip_emits_in_order() {
    let (_temp, root) = temp_root();
    let dir = root.join("ws");
    fs::create_dir_all(&dir).unwrap();
    let mut watcher = started(&root, &["info.json"]).await;
    let mut rx = watcher.subscribe();
    let marker = dir.join("info.json");

    fs::write(&marker, "").unwrap();
    assert_eq!(next_event(&mut rx).await.kind, WorkspaceEventKind::Created);
    fs::remove_file(&marker).unwrap();
    assert_eq!(next_event(&mut rx).await.kind, WorkspaceEventKind::Deleted);
    fs::write(&marker, "").unwrap();
    assert_eq!(next_event(&mut rx).await.kind, WorkspaceEventKind::Created);
    assert_quiet(&mut rx).await;

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_removing_workspace_directory_deletes_it() {
    let (_temp, root) = temp_root();
    let dir = root.join("ws");
    fs::create_dir_all(dir.join("logs")).unwrap();
    fs::write(dir.join("info.json"), "{}").unwrap();
    fs::write(dir.join("logs").join("a.log"), "").unwrap();

    let mut watcher = started(&root, &["info.json", "logs/*.log"]).await;
    let mut rx = watcher.subscribe();
    assert_eq!(watcher.list_workspaces(), vec![dir_string(&dir)]);

    fs::remove_dir_all(&dir).unwrap();
    let event = next_event(&mut rx).await;
    assert_eq!(event.kind, WorkspaceEventKind::Deleted);
    assert_eq!(event.directory, dir_string(&dir));
    assert_quiet(&mut rx).await;

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_ignored_directories_are_not_reported() {
    let (_temp, root) = temp_root();
    let hidden = root.join("node_modules").join("pkg");
    fs::create_dir_all(&hidden).unwrap();
    fs::write(hidden.join("info.json"), "{}").unwrap();

    let mut watcher = started(&root, &["info.json"]).await;
    let mut rx = watcher.subscribe();
    assert!(watcher.list_workspaces().is_empty());

    let vcs = root.join(".git").join("ws");
    fs::create_dir_all(&vcs).unwrap();
    fs::write(vcs.join("info.json"), "{}").unwrap();
    assert_quiet(&mut rx).await;

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_recursive_pattern_checks_the_watched_root() {
    // Every event path matches `**/` from its first byte, so the implied
    // directory is the empty string, i.e. the root. The working directory of
    // a test run holds Cargo.toml and must not be consulted.
    let (_temp, root) = temp_root();
    let mut watcher = started(&root, &["**/*.toml"]).await;
    let mut rx = watcher.subscribe();

    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("x.toml.bak"), "").unwrap();
    assert_quiet(&mut rx).await;
    assert!(watcher.list_workspaces().is_empty());

    fs::write(sub.join("real.toml"), "").unwrap();
    let event = next_event(&mut rx).await;
    assert_eq!(event.kind, WorkspaceEventKind::Created);
    assert_eq!(event.directory, "");
    assert_eq!(watcher.list_workspaces(), vec![String::new()]);

    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_watcher_from_config() {
    init_tracing();
    let (_temp, root) = temp_root();
    let dir = root.join("ws");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("info.json"), "{}").unwrap();

    let config = WorkspaceWatchConfig::from_toml_str(&format!(
        "root = {:?}\npatterns = [\"info.json\"]\n\n[watch]\ndebounce_ms = 50\n",
        dir_string(&root)
    ))
    .unwrap();
    let mut watcher = WorkspaceWatcher::from_config(&config).unwrap();
    watcher.start().await.unwrap();
    watcher.ready().await.unwrap();

    assert_eq!(watcher.list_workspaces(), vec![dir_string(&dir)]);
    watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let (_temp, root) = temp_root();
    let mut watcher = WorkspaceWatcher::new(&root, &["info.json"]).unwrap();

    assert!(matches!(watcher.stop().await, Err(Error::NotStarted)));
    watcher.start().await.unwrap();
    assert!(matches!(watcher.start().await, Err(Error::AlreadyStarted)));
    watcher.stop().await.unwrap();
    assert!(matches!(watcher.stop().await, Err(Error::NotStarted)));
}

#[tokio::test]
async fn test_missing_root_fails_to_start() {
    let (_temp, root) = temp_root();
    let mut watcher = WorkspaceWatcher::new(root.join("missing"), &["info.json"]).unwrap();

    assert!(matches!(watcher.start().await, Err(Error::Watch(_))));
    assert!(!watcher.is_running());
}
