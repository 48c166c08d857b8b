//! Serialized rebuilds of one build domain.
//!
//! Requests take a ticket and then wait for the domain's gate. Once a request
//! holds the gate it only builds if no newer ticket was issued meanwhile, so
//! a burst of requests that piles up behind a running build collapses into a
//! single rebuild with the newest state of the sources.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stax_builder::stax_graph::ModulePath;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::project::{Domain, DomainBuild, Project, StagedBuild};
use crate::watch::state::{BuildStatus, DomainState};

pub struct DomainBuilder {
    domain: Domain,
    project: Arc<Project>,
    gate: Mutex<()>,
    tickets: AtomicU64,
    state: DomainState,
}

/// A staged build that still holds the domain's gate. Nothing else can build
/// this domain until it is committed or dropped.
pub struct PreparedRebuild<'a> {
    builder: &'a DomainBuilder,
    staged: StagedBuild,
    _gate: MutexGuard<'a, ()>,
}

impl PreparedRebuild<'_> {
    pub async fn commit(self) -> Result<DomainBuild> {
        let graph = self.staged.graph().cloned();
        let runtime = self.builder.project.runtime();
        match self.staged.commit(runtime.as_ref()).await {
            Ok(build) => {
                self.builder
                    .state
                    .complete_build(build.duration.as_millis() as u64, graph);
                Ok(build)
            }
            Err(err) => {
                self.builder.state.fail_build(err.to_string());
                Err(err)
            }
        }
    }
}

impl DomainBuilder {
    pub fn new(project: Arc<Project>, domain: Domain) -> Self {
        Self {
            domain,
            project,
            gate: Mutex::new(()),
            tickets: AtomicU64::new(0),
            state: DomainState::default(),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn status(&self) -> BuildStatus {
        self.state.status()
    }

    /// Whether a change to `path` can change this domain's output: the path
    /// is part of the last live graph or one of the domain's page inputs, or
    /// there is no live graph yet and the path is inside the source root.
    pub fn affected_by(&self, path: &Path) -> bool {
        let src = self.project.src();
        if !path.starts_with(src) {
            return false;
        }
        if self.project.is_page_input(self.domain, path) {
            return true;
        }
        let key = ModulePath::from_fs(src, path);
        self.state
            .with_graph(|graph| graph.is_none_or(|graph| graph.contains(&key)))
    }

    /// Build into staging. `Ok(None)` means a newer request superseded this one.
    pub async fn prepare(&self) -> Result<Option<PreparedRebuild<'_>>> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.gate.lock().await;
        if self.tickets.load(Ordering::SeqCst) != ticket {
            tracing::debug!(domain = %self.domain, ticket, "rebuild superseded");
            return Ok(None);
        }

        self.state.start_build();
        match self.project.build_staged(self.domain).await {
            Ok(staged) => Ok(Some(PreparedRebuild {
                builder: self,
                staged,
                _gate: gate,
            })),
            Err(err) => {
                self.state.fail_build(err.to_string());
                Err(err)
            }
        }
    }

    /// Build and swap in, unless superseded.
    pub async fn rebuild(&self) -> Result<Option<DomainBuild>> {
        match self.prepare().await? {
            Some(prepared) => Ok(Some(prepared.commit().await?)),
            None => Ok(None),
        }
    }
}
