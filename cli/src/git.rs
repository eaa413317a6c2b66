//! A real `git`-backed [`VersionControl`] implementation, shelling out to
//! the `git` binary on `PATH` via `tokio::process::Command`. This is the
//! one capability the CLI wires to a real local tool rather than a mock --
//! branch/commit/diff/revert are filesystem-and-subprocess operations, not
//! network or source-parsing concerns.

use std::path::PathBuf;

use async_trait::async_trait;
use tac_core::capabilities::VersionControl;
use tac_core::error::{OrchestratorError, Result};

pub struct GitVersionControl {
    repo_root: PathBuf,
}

impl GitVersionControl {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|e| OrchestratorError::vcs_error(format!("failed to spawn git {args:?}: {e}")))
    }

    async fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(OrchestratorError::vcs_error(format!(
                "git {args:?} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl VersionControl for GitVersionControl {
    async fn current_branch(&self) -> Result<String> {
        self.run_ok(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        let args: Vec<&str> = if create { vec!["checkout", "-B", branch] } else { vec!["checkout", branch] };
        self.run_ok(&args).await.map(|_| ())
    }

    async fn status(&self, ignore_untracked: bool) -> Result<(bool, String)> {
        let args: Vec<&str> = if ignore_untracked {
            vec!["status", "--porcelain", "--untracked-files=no"]
        } else {
            vec!["status", "--porcelain"]
        };
        let porcelain = self.run_ok(&args).await?;
        let branch = self.current_branch().await?;
        Ok((porcelain.is_empty(), branch))
    }

    async fn complete_diff(&self) -> Result<String> {
        self.run_ok(&["diff", "HEAD"]).await
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.run_ok(&["add", "-A"]).await?;
        self.run_ok(&["commit", "-m", message]).await.map(|_| ())
    }

    async fn revert_all_changes_and_clean_untracked(&self) -> Result<()> {
        self.run_ok(&["reset", "--hard", "HEAD"]).await?;
        self.run_ok(&["clean", "-fd"]).await.map(|_| ())
    }
}
