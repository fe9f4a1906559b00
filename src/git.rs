//! Commits written notes into a git repository at the vault root.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct GitIntegration {
    repo: PathBuf,
}

#[derive(Debug, Error)]
#[error("{0}")]
struct GitFailure(String);

impl GitIntegration {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    async fn git(&self, args: &[&str]) -> Result<String, GitFailure> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitFailure(format!("can't run git: {e}")))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(GitFailure(format!(
                "git {} exited with {}: {}{}",
                args.join(" "),
                output.status,
                stdout.trim(),
                stderr.trim()
            )))
        }
    }

    async fn ensure_repository(&self) -> Result<(), GitFailure> {
        if self.git(&["rev-parse", "--git-dir"]).await.is_ok() {
            return Ok(());
        }
        info!("Initializing git repository in {:?}", self.repo);
        self.git(&["init"]).await.map(|_| ())
    }

    async fn try_commit(&self, file: &Path, message: &str) -> Result<bool, GitFailure> {
        self.ensure_repository().await?;
        let file = file.strip_prefix(&self.repo).unwrap_or(file);
        let file = file.to_string_lossy();
        self.git(&["add", "--", &file]).await?;
        match self.git(&["commit", "-m", message, "--", &file]).await {
            Ok(_) => Ok(true),
            Err(GitFailure(output))
                if output.contains("nothing to commit")
                    || output.contains("no changes added to commit") =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Adds and commits `file`. Failures are logged and otherwise ignored, the note on disk is
    /// what matters. Returns whether a commit was made.
    pub async fn commit(&self, file: &Path, message: &str) -> bool {
        match self.try_commit(file, message).await {
            Ok(true) => {
                info!("Committed {file:?}: {message}");
                true
            }
            Ok(false) => {
                debug!("Nothing to commit for {file:?}");
                false
            }
            Err(e) => {
                warn!("Git commit skipped: {e}");
                false
            }
        }
    }
}
