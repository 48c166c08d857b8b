//! The server child process of watch mode.

use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::error::{CliError, Result};

/// Owns at most one running server. Standard streams are inherited, so the
/// server's output interleaves with stax's own.
#[derive(Debug, Default)]
pub struct ServerProcess {
    child: Option<Child>,
}

impl ServerProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process id of the running server, if any.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Whether a server was started and has not exited yet.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub async fn start(&mut self, program: &str, args: &[String], cwd: &Path) -> Result<u32> {
        self.stop().await?;

        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CliError::Process(format!("cannot start `{}`: {}", program, e)))?;
        let pid = child.id().unwrap_or_default();
        tracing::debug!(program, pid, "server started");
        self.child = Some(child);
        Ok(pid)
    }

    /// Kill the server and wait until it is gone.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(%status, "server had already exited");
            }
            _ => {
                child
                    .kill()
                    .await
                    .map_err(|e| CliError::Process(format!("cannot stop server: {}", e)))?;
                tracing::debug!("server stopped");
            }
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sleeper() -> (String, Vec<String>) {
        ("sh".to_string(), vec!["-c".to_string(), "sleep 30".to_string()])
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_child() {
        let (program, args) = sleeper();
        let cwd = std::env::temp_dir();
        let mut server = ServerProcess::new();

        let first = server.start(&program, &args, &cwd).await.unwrap();
        assert!(server.is_running());
        let second = server.start(&program, &args, &cwd).await.unwrap();
        assert_ne!(first, second);
        assert!(server.is_running());

        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert_eq!(server.id(), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_a_process_error() {
        let mut server = ServerProcess::new();
        let err = server
            .start("stax-no-such-program", &[], &std::env::temp_dir())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Process(_)));
    }

    #[tokio::test]
    async fn test_stop_without_child_is_noop() {
        let mut server = ServerProcess::new();
        server.stop().await.unwrap();
    }
}
