//! Watch mode: file watcher, per-domain rebuilds and the server process.

pub mod controller;
pub mod domain;
pub mod server_process;
pub mod state;
pub mod watcher;

pub use controller::{RebuildEvent, WatchController};
pub use domain::{DomainBuilder, PreparedRebuild};
pub use server_process::ServerProcess;
pub use state::{BuildStatus, DomainState};
pub use watcher::{Debouncer, FileChange, FileWatcher, should_ignore};
