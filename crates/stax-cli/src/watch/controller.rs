//! Rebuild controller: maps file changes to domains, rebuilds them and keeps
//! the server process in step with the live server output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use crate::error::Result;
use crate::project::{Domain, DomainBuild, Project};
use crate::ui;
use crate::watch::domain::DomainBuilder;
use crate::watch::server_process::ServerProcess;

/// Sent after a domain's new output went live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildEvent {
    /// The server was rebuilt and restarted.
    Server,
    /// The web app was rebuilt; connected browsers should reload.
    WebApp,
}

impl RebuildEvent {
    pub fn is_webapp(self) -> bool {
        self == RebuildEvent::WebApp
    }
}

pub struct WatchController {
    project: Arc<Project>,
    server: DomainBuilder,
    webapp: DomainBuilder,
    process: Mutex<ServerProcess>,
    /// Compiled entry the running server was started from.
    server_entry: parking_lot::Mutex<Option<PathBuf>>,
    events: broadcast::Sender<RebuildEvent>,
    run_server: bool,
}

impl WatchController {
    pub fn new(project: Arc<Project>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            server: DomainBuilder::new(Arc::clone(&project), Domain::Server),
            webapp: DomainBuilder::new(Arc::clone(&project), Domain::WebApp),
            project,
            process: Mutex::new(ServerProcess::new()),
            server_entry: parking_lot::Mutex::new(None),
            events,
            run_server: true,
        }
    }

    /// Rebuild without ever launching the server.
    pub fn without_server_process(mut self) -> Self {
        self.run_server = false;
        self
    }

    /// Register for rebuild notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RebuildEvent> {
        self.events.subscribe()
    }

    /// Process id of the server, while one is running.
    pub async fn server_pid(&self) -> Option<u32> {
        let mut process = self.process.lock().await;
        if process.is_running() { process.id() } else { None }
    }

    pub fn builder(&self, domain: Domain) -> &DomainBuilder {
        match domain {
            Domain::Server => &self.server,
            Domain::WebApp => &self.webapp,
        }
    }

    /// First build of both domains, then launch the server. A domain that
    /// fails is reported and left without a graph, so the next change under
    /// the source root retries it.
    pub async fn start(&self) -> Result<Vec<DomainBuild>> {
        let (server, webapp) = tokio::join!(self.server.rebuild(), self.webapp.rebuild());
        let mut builds = Vec::with_capacity(2);
        match server {
            Ok(Some(build)) => {
                self.launch(&build).await?;
                builds.push(build);
            }
            Ok(None) => {}
            Err(err) => ui::error(&format!("Server build failed: {}", err)),
        }
        match webapp {
            Ok(Some(build)) => builds.push(build),
            Ok(None) => {}
            Err(err) => ui::error(&format!("WebApp build failed: {}", err)),
        }
        Ok(builds)
    }

    /// Which domains the given paths affect, as `(server, webapp)`.
    pub fn affected(&self, paths: &[PathBuf]) -> (bool, bool) {
        let server = paths.iter().any(|path| self.server.affected_by(path));
        let webapp = paths.iter().any(|path| self.webapp.affected_by(path));
        (server, webapp)
    }

    /// Rebuild every domain the changes affect, concurrently. Returns the
    /// events that were sent.
    pub async fn handle_changes(&self, paths: &[PathBuf]) -> Vec<RebuildEvent> {
        let (server, webapp) = self.affected(paths);
        if !server && !webapp {
            tracing::debug!(changes = paths.len(), "changes affect no domain");
            return Vec::new();
        }

        let server_rebuild = async {
            if server {
                self.rebuild_server().await
            } else {
                None
            }
        };
        let webapp_rebuild = async {
            if webapp {
                self.rebuild_webapp().await
            } else {
                None
            }
        };
        let (server, webapp) = tokio::join!(server_rebuild, webapp_rebuild);
        server.into_iter().chain(webapp).collect()
    }

    async fn rebuild_server(&self) -> Option<RebuildEvent> {
        let prepared = match self.server.prepare().await {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return None,
            Err(err) => {
                ui::error(&format!("Server rebuild failed: {}", err));
                ui::warning("Keeping the previous server running");
                return None;
            }
        };

        // The old server has to be gone before its files are replaced and
        // the new one binds the same port.
        if self.run_server {
            if let Err(err) = self.process.lock().await.stop().await {
                tracing::warn!("{}", err);
            }
        }

        match prepared.commit().await {
            Ok(build) => {
                if let Err(err) = self.launch(&build).await {
                    ui::error(&err.to_string());
                    return None;
                }
                ui::success("Server Rebuilt");
                self.notify(RebuildEvent::Server)
            }
            Err(err) => {
                ui::error(&format!("Server output could not be replaced: {}", err));
                self.relaunch_previous().await;
                None
            }
        }
    }

    /// Start the server again from the output that is still live.
    async fn relaunch_previous(&self) {
        if !self.run_server {
            return;
        }
        let Some(entry) = self.server_entry.lock().clone() else {
            return;
        };
        if !self.project.runtime().is_file(&entry).await {
            ui::warning("The previous server output is gone; the server stays stopped");
            return;
        }
        match self.spawn_server(&entry).await {
            Ok(()) => ui::warning("Keeping the previous server running"),
            Err(err) => ui::error(&err.to_string()),
        }
    }

    async fn rebuild_webapp(&self) -> Option<RebuildEvent> {
        match self.webapp.rebuild().await {
            Ok(Some(_)) => {
                ui::success("WebApp Rebuilt");
                self.notify(RebuildEvent::WebApp)
            }
            Ok(None) => None,
            Err(err) => {
                ui::error(&format!("WebApp rebuild failed: {}", err));
                None
            }
        }
    }

    fn notify(&self, event: RebuildEvent) -> Option<RebuildEvent> {
        // No subscribers is fine.
        let _ = self.events.send(event);
        Some(event)
    }

    async fn launch(&self, build: &DomainBuild) -> Result<()> {
        if !self.run_server {
            return Ok(());
        }
        let Some(entry) = build.entry_output() else {
            return Ok(());
        };
        self.spawn_server(&entry).await?;
        *self.server_entry.lock() = Some(entry);
        Ok(())
    }

    async fn spawn_server(&self, entry: &Path) -> Result<()> {
        let (program, args) = self.project.server_command(entry);
        let pid = self
            .process
            .lock()
            .await
            .start(&program, &args, self.project.cwd())
            .await?;
        ui::info(&format!("Server running ({} {}, pid {})", program, entry.display(), pid));
        Ok(())
    }

    /// Stop the server, if one is running.
    pub async fn shutdown(&self) -> Result<()> {
        self.process.lock().await.stop().await
    }
}
