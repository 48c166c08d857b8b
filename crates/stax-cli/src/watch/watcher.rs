//! Recursive file watcher with ignore patterns and per-path debouncing.

use indexmap::IndexMap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};
use crate::project::env::ENV_FILE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event(kind: &EventKind, path: &Path) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path.to_path_buf())),
            EventKind::Modify(_) => Some(FileChange::Modified(path.to_path_buf())),
            EventKind::Remove(_) => Some(FileChange::Removed(path.to_path_buf())),
            _ => None,
        }
    }
}

/// Trailing-edge debounce: a path is delivered once no event arrived for it
/// during a whole window, carrying the last change seen. A burst such as an
/// editor's truncate-then-write therefore yields one change, after the final
/// write.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: IndexMap<PathBuf, (FileChange, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: IndexMap::new(),
        }
    }

    /// Note `change` at `now`, restarting its path's quiet window.
    pub fn record(&mut self, change: FileChange, now: Instant) {
        self.pending.insert(change.path().to_path_buf(), (change, now));
    }

    /// When the earliest pending path becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|(_, last)| *last + self.window)
            .min()
    }

    /// Remove and return every change whose window has passed, in the order
    /// the paths first changed.
    pub fn take_ready(&mut self, now: Instant) -> Vec<FileChange> {
        let window = self.window;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, (_, last))| now.duration_since(*last) >= window);
        self.pending = waiting.into_iter().collect();
        ready.into_iter().map(|(_, (change, _))| change).collect()
    }

    /// Everything still pending, ready or not.
    pub fn drain(&mut self) -> Vec<FileChange> {
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|(change, _)| change)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Hold raw changes in a [`Debouncer`] and forward them to `tx` once quiet.
async fn debounce_changes(
    mut raw: mpsc::UnboundedReceiver<FileChange>,
    tx: mpsc::Sender<FileChange>,
    window: Duration,
) {
    let mut debouncer = Debouncer::new(window);
    loop {
        let deadline = debouncer.next_deadline();
        let wake = deadline.map_or_else(tokio::time::Instant::now, tokio::time::Instant::from_std);
        tokio::select! {
            change = raw.recv() => match change {
                Some(change) => debouncer.record(change, Instant::now()),
                None => break,
            },
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {}
        }
        for change in debouncer.take_ready(Instant::now()) {
            if tx.send(change).await.is_err() {
                return;
            }
        }
    }
    for change in debouncer.drain() {
        if tx.send(change).await.is_err() {
            return;
        }
    }
}

/// Whether a change to `path` is irrelevant to a build rooted at `root`.
///
/// Paths outside the root and hidden files are always ignored, except the
/// root's `.env`. A pattern is either `*.ext` or a path prefix matched on
/// whole components.
pub fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    if relative == Path::new(ENV_FILE) {
        return false;
    }

    let hidden = relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    });
    if hidden {
        return true;
    }

    let relative = relative.to_string_lossy().replace('\\', "/");
    ignore_patterns.iter().any(|pattern| {
        if let Some(extension) = pattern.strip_prefix('*') {
            relative.ends_with(extension)
        } else {
            let pattern = pattern.trim_matches('/');
            relative == pattern
                || relative.starts_with(&format!("{}/", pattern))
                || relative.contains(&format!("/{}/", pattern))
        }
    })
}

/// Watches a directory tree and forwards relevant changes over a channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        tokio::spawn(debounce_changes(raw_rx, tx, Duration::from_millis(debounce_ms)));
        let watched_root = root.clone();

        // Runs on notify's thread; dropping the watcher closes `raw_tx`.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("watch error: {}", err);
                    return;
                }
            };
            for path in &event.paths {
                if should_ignore(path, &watched_root, &ignore_patterns) {
                    continue;
                }
                if let Some(change) = FileChange::from_event(&event.kind, path) {
                    // The debounce task is gone once the watch loop has stopped.
                    let _ = raw_tx.send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
