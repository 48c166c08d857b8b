//! `stax watch`: initial build, server launch, rebuild on change.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use crate::cli::WatchArgs;
use crate::commands::load_project_config;
use crate::config::ConfigOverrides;
use crate::error::Result;
use crate::project::Project;
use crate::ui;
use crate::watch::{FileWatcher, WatchController};

pub async fn execute(args: WatchArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        server_command: args.command.clone(),
        debounce_ms: args.debounce,
        ..ConfigOverrides::from(&args.project)
    };
    let (cwd, config) = load_project_config(&args.project, overrides)?;
    let project = Arc::new(Project::new(config, &cwd));

    let mut ignore = project.config().watch.ignore.clone();
    // Our own output must never trigger a rebuild.
    if let Ok(relative) = project.out().strip_prefix(project.src()) {
        ignore.push(relative.to_string_lossy().replace('\\', "/"));
    }

    let controller = WatchController::new(Arc::clone(&project));
    ui::info("Performing initial build...");
    for build in controller.start().await? {
        ui::success(&build.summary_row().render());
    }

    let (watcher, mut changes) = FileWatcher::new(
        project.src().to_path_buf(),
        ignore,
        project.config().watch.debounce_ms,
    )?;
    ui::info(&format!("Watching for changes in {}", watcher.root().display()));

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(webapp = event.is_webapp(), "rebuild notification");
        }
    });

    ui::info("Press Ctrl+C to stop");
    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                let mut paths: Vec<PathBuf> = vec![change.path().to_path_buf()];
                // Everything already queued goes into the same rebuild.
                while let Ok(more) = changes.try_recv() {
                    paths.push(more.path().to_path_buf());
                }
                tracing::debug!(changes = paths.len(), first = %paths[0].display(), "files changed");
                controller.handle_changes(&paths).await;
            }
            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break;
            }
        }
    }

    controller.shutdown().await?;
    ui::success("Stopped");
    Ok(())
}
