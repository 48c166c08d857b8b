//! Per-domain build status, shared between the watch loop and the builders.

use parking_lot::RwLock;
use std::time::Instant;

use stax_builder::stax_graph::ModuleGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress { started_at: Instant },
    Success { duration_ms: u64 },
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Status plus the graph of the last build that went live.
#[derive(Debug)]
pub struct DomainState {
    status: RwLock<BuildStatus>,
    graph: RwLock<Option<ModuleGraph>>,
}

impl Default for DomainState {
    fn default() -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            graph: RwLock::new(None),
        }
    }
}

impl DomainState {
    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    /// A failed build keeps the previous graph.
    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn complete_build(&self, duration_ms: u64, graph: Option<ModuleGraph>) {
        *self.graph.write() = graph;
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    /// Read the last live graph under the lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(Option<&ModuleGraph>) -> R) -> R {
        f(self.graph.read().as_ref())
    }
}
