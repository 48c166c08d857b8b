//! Watch-mode rebuilds driven in-process, without the file watcher. Most
//! tests run without a server child; the restart tests use `sh`.

#![allow(clippy::disallowed_methods)]

mod helpers;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use helpers::{FlakyRuntime, fullstack, read, root, services, write};
use stax_cli::config::StaxConfig;
use stax_cli::project::{Domain, Project};
use stax_cli::watch::{BuildStatus, RebuildEvent, WatchController};
use tempfile::TempDir;

async fn started(dir: &TempDir) -> WatchController {
    let project = Project::new(StaxConfig::default(), &root(dir));
    let controller = WatchController::new(Arc::new(project)).without_server_process();
    let builds = controller.start().await.expect("initial build");
    assert_eq!(builds.len(), 2);
    controller
}

fn changed(dir: &TempDir, path: &str) -> Vec<PathBuf> {
    vec![root(dir).join(path)]
}

#[tokio::test]
async fn test_webapp_change_rebuilds_only_webapp() {
    let dir = fullstack();
    let controller = started(&dir).await;
    let mut events = controller.subscribe();

    write(
        dir.path(),
        "webapp/app.ts",
        "export const mount = (el: HTMLElement): void => {\n  el.textContent = \"changed\";\n};\n",
    );
    let sent = controller.handle_changes(&changed(&dir, "webapp/app.ts")).await;

    assert_eq!(sent, vec![RebuildEvent::WebApp]);
    assert_eq!(events.recv().await.unwrap(), RebuildEvent::WebApp);
    assert!(read(dir.path().join("dist/public/webapp/app.js")).contains("changed"));
    assert!(controller.builder(Domain::WebApp).status().is_success());
}

#[tokio::test]
async fn test_unrelated_file_triggers_nothing() {
    let dir = fullstack();
    let controller = started(&dir).await;

    write(dir.path(), "notes/todo.md", "- ship it\n");
    let sent = controller.handle_changes(&changed(&dir, "notes/todo.md")).await;
    assert!(sent.is_empty());
    assert_eq!(controller.affected(&changed(&dir, "notes/todo.md")), (false, false));
}

#[tokio::test]
async fn test_shared_module_rebuilds_both() {
    let dir = fullstack();
    write(dir.path(), "shared/version.ts", "export const VERSION = 1;\n");
    write(
        dir.path(),
        "server/index.ts",
        "import { VERSION } from \"../shared/version\";\nconsole.log(VERSION);\n",
    );
    write(
        dir.path(),
        "webapp/index.ts",
        "import { VERSION } from \"../shared/version\";\ndocument.title = String(VERSION);\n",
    );
    let controller = started(&dir).await;

    write(dir.path(), "shared/version.ts", "export const VERSION = 2;\n");
    let sent = controller.handle_changes(&changed(&dir, "shared/version.ts")).await;
    assert_eq!(sent, vec![RebuildEvent::Server, RebuildEvent::WebApp]);

    assert!(read(dir.path().join("dist/app/shared/version.js")).contains('2'));
    assert!(read(dir.path().join("dist/public/shared/version.js")).contains('2'));
}

#[tokio::test]
async fn test_failed_rebuild_keeps_live_output() {
    let dir = fullstack();
    let controller = started(&dir).await;
    let before = read(dir.path().join("dist/app/server/greet.js"));

    write(dir.path(), "server/greet.ts", "export function greet( {\n");
    let sent = controller.handle_changes(&changed(&dir, "server/greet.ts")).await;

    assert!(sent.is_empty());
    assert_eq!(read(dir.path().join("dist/app/server/greet.js")), before);
    assert!(!dir.path().join("dist/app.staging").exists());
    assert!(matches!(
        controller.builder(Domain::Server).status(),
        BuildStatus::Failed { .. }
    ));

    // The graph of the live build still routes changes to the server.
    write(
        dir.path(),
        "server/greet.ts",
        "export function greet(name: string): string {\n  return `hi ${name}`;\n}\n",
    );
    let sent = controller.handle_changes(&changed(&dir, "server/greet.ts")).await;
    assert_eq!(sent, vec![RebuildEvent::Server]);
    assert!(controller.builder(Domain::Server).status().is_success());
}

#[tokio::test]
async fn test_failed_initial_build_is_retried_on_change() {
    let dir = fullstack();
    write(dir.path(), "server/greet.ts", "export function greet( {\n");
    let project = Project::new(StaxConfig::default(), &root(&dir));
    let controller = WatchController::new(Arc::new(project)).without_server_process();

    let builds = controller.start().await.expect("start keeps watching");
    assert_eq!(builds.len(), 1);
    assert!(builds[0].domain == Domain::WebApp);
    assert!(!dir.path().join("dist/app").exists());

    // No live server graph yet, so any source change retries the server.
    write(
        dir.path(),
        "server/greet.ts",
        "export function greet(name: string): string {\n  return name;\n}\n",
    );
    let sent = controller.handle_changes(&changed(&dir, "server/greet.ts")).await;
    assert_eq!(sent, vec![RebuildEvent::Server]);
    assert!(dir.path().join("dist/app/server/index.js").is_file());
}

#[tokio::test]
async fn test_page_template_change_rebuilds_webapp() {
    let dir = fullstack();
    write(dir.path(), "webapp/index.html", "<html><head></head><body></body></html>");
    let controller = started(&dir).await;

    write(
        dir.path(),
        "webapp/index.html",
        "<html><head></head><body><main id=\"v2\"></main></body></html>",
    );
    let sent = controller.handle_changes(&changed(&dir, "webapp/index.html")).await;
    assert_eq!(sent, vec![RebuildEvent::WebApp]);
    assert!(read(dir.path().join("dist/public/index.html")).contains("<main id=\"v2\">"));

    // Page files that do not exist yet count too.
    write(dir.path(), "webapp/favicon.png", "PNG");
    let sent = controller.handle_changes(&changed(&dir, "webapp/favicon.png")).await;
    assert_eq!(sent, vec![RebuildEvent::WebApp]);
    assert_eq!(read(dir.path().join("dist/public/favicon.png")), "PNG");
}

#[tokio::test]
async fn test_env_file_change_rebuilds_both() {
    let dir = fullstack();
    let controller = started(&dir).await;

    write(dir.path(), ".env", "APP_DEMO_PORT=8080\n");
    let sent = controller.handle_changes(&changed(&dir, ".env")).await;
    assert_eq!(sent, vec![RebuildEvent::Server, RebuildEvent::WebApp]);
}

/// `sh -c "sleep 30" <entry>`: a server that stays up until it is killed.
#[cfg(unix)]
fn sleeping_server() -> StaxConfig {
    let mut config = StaxConfig::default();
    config.server.command = "sh".to_string();
    config.server.args = vec!["-c".to_string(), "sleep 30".to_string(), "{entry}".to_string()];
    config
}

#[cfg(unix)]
#[tokio::test]
async fn test_server_change_leaves_exactly_one_server() {
    use helpers::process_alive;

    let dir = fullstack();
    let project = Project::new(sleeping_server(), &root(&dir));
    let controller = WatchController::new(Arc::new(project));
    controller.start().await.expect("initial build");
    let first = controller.server_pid().await.expect("server started");

    write(
        dir.path(),
        "server/greet.ts",
        "export function greet(name: string): string {\n  return `hey ${name}`;\n}\n",
    );
    let sent = controller.handle_changes(&changed(&dir, "server/greet.ts")).await;
    assert_eq!(sent, vec![RebuildEvent::Server]);

    let second = controller.server_pid().await.expect("server restarted");
    assert_ne!(first, second);
    assert!(!process_alive(first), "old server {first} still running");
    assert!(process_alive(second));

    controller.shutdown().await.unwrap();
    assert_eq!(controller.server_pid().await, None);
    assert!(!process_alive(second));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_swap_relaunches_previous_server() {
    use helpers::process_alive;

    let dir = fullstack();
    let runtime = Arc::new(FlakyRuntime::default());
    let project = Project::with_services(sleeping_server(), &root(&dir), services(Arc::clone(&runtime)));
    let controller = WatchController::new(Arc::new(project));
    controller.start().await.expect("initial build");
    let first = controller.server_pid().await.expect("server started");
    let before = read(dir.path().join("dist/app/server/greet.js"));

    runtime.fail_swaps.store(true, Ordering::SeqCst);
    write(
        dir.path(),
        "server/greet.ts",
        "export function greet(name: string): string {\n  return `hey ${name}`;\n}\n",
    );
    let sent = controller.handle_changes(&changed(&dir, "server/greet.ts")).await;
    assert!(sent.is_empty());

    // The previous output is back in place and a server runs from it.
    assert_eq!(read(dir.path().join("dist/app/server/greet.js")), before);
    assert!(!dir.path().join("dist/app.staging").exists());
    assert!(!dir.path().join("dist/app.previous").exists());
    let relaunched = controller.server_pid().await.expect("server relaunched");
    assert!(!process_alive(first));
    assert!(process_alive(relaunched));
    assert!(matches!(
        controller.builder(Domain::Server).status(),
        BuildStatus::Failed { .. }
    ));

    controller.shutdown().await.unwrap();
}
