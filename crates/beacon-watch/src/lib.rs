//! # Beacon Workspace Watching
//!
//! Detects "workspace directories" appearing and disappearing inside a
//! watched directory tree. A workspace directory is any directory containing
//! at least one match for every configured marker glob (for example
//! `info.json` and `logs/*.log`).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────────┐
//! │   EventSource   │───▶│ imply_directory  │───▶│    is_workspace     │
//! │ (notify/manual) │    │ (which dir?)     │    │ (every glob found?) │
//! └─────────────────┘    └──────────────────┘    └─────────────────────┘
//!                                                          │
//!                                                          ▼
//!                        ┌──────────────────┐    ┌─────────────────────┐
//!                        │ Listeners and    │◀───│  WorkspaceRegistry  │
//!                        │ subscribers      │    │  (known workspaces) │
//!                        └──────────────────┘    └─────────────────────┘
//! ```
//!
//! Raw file events only ever *imply* a candidate directory; the registry
//! confirms it against the filesystem before recording a transition, and
//! emits exactly one `created` or `deleted` event per crossing.
//!
//! ## Known limitations
//!
//! Paths are compared as strings. Events arrive with the root as it was
//! given to the watcher, so a root spelled two different ways yields two
//! different directory names.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
pub mod config;
pub mod error;
mod events;
pub mod implication;
pub mod patterns;
pub mod predicate;
mod registry;
pub mod traits;
pub mod utils;
mod watcher;

pub use backends::*;
pub use config::{WatchOptions, WorkspaceWatchConfig};
pub use error::*;
pub use events::*;
pub use implication::imply_directory;
pub use patterns::{Pattern, WorkspacePatterns};
pub use predicate::{is_workspace, is_workspace_with, FsGlobExpander, GlobExpander};
pub use registry::WorkspaceRegistry;
pub use traits::EventSource;
pub use watcher::WorkspaceWatcher;

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::{
        Error, EventSource, FileEvent, FileEventKind, Result, WatchOptions, WorkspaceEvent,
        WorkspaceEventKind, WorkspacePatterns, WorkspaceRegistry, WorkspaceWatchConfig,
        WorkspaceWatcher,
    };
}
