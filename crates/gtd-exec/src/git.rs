use std::path::Path;

use gtd_core::Revision;
use gtd_core::branch::{UNBORN_BRANCH, UNBORN_COMMIT};

use crate::command::CommandLine;
use crate::error::{ExecError, RevisionError};
use crate::executor::{CommandExecutor, RealExecutor};

/// Reads branch and commit of a work dir through the git CLI.
pub struct GitClient<E: CommandExecutor = RealExecutor> {
    executor: E,
}

impl GitClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for GitClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> GitClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Revision of `dir`, or `None` when it is not inside a git work tree.
    ///
    /// A repository without commits reports branch `master` and an all-zero
    /// commit instead of failing.
    pub async fn revision(&self, dir: &Path) -> Result<Option<Revision>, RevisionError> {
        let probe_error = |e| RevisionError::Probe {
            dir: dir.to_path_buf(),
            source: e,
        };

        match self.executor.exec(&git(dir, &["rev-parse", "--git-dir"])).await {
            Ok(_) => {}
            Err(ExecError::NotFound { .. }) => {
                tracing::warn!("git not installed; treating work dir as unversioned");
                return Ok(None);
            }
            Err(e) if e.output().is_some_and(is_not_a_repository) => {
                tracing::debug!(dir = %dir.display(), "not a git repository");
                return Ok(None);
            }
            Err(e) => return Err(probe_error(e)),
        }

        let branch = self
            .read(dir, &["rev-parse", "--abbrev-ref", "HEAD"], UNBORN_BRANCH)
            .await
            .map_err(probe_error)?;
        let commit = self
            .read(dir, &["rev-parse", "HEAD"], UNBORN_COMMIT)
            .await
            .map_err(probe_error)?;

        let revision = Revision::new(branch, &commit);
        tracing::debug!(
            branch = %revision.branch,
            commit = %revision.commit,
            "revision detected"
        );
        Ok(Some(revision))
    }

    /// Run a query, substituting `unborn` when git complains about `HEAD`.
    async fn read(&self, dir: &Path, args: &[&str], unborn: &str) -> Result<String, ExecError> {
        match self.executor.exec(&git(dir, args)).await {
            Ok(out) => Ok(String::from_utf8_lossy(&out).trim().to_owned()),
            Err(e) if e.output().is_some_and(|o| o.contains("HEAD")) => {
                tracing::debug!(args = ?args, fallback = unborn, "unborn HEAD");
                Ok(unborn.to_owned())
            }
            Err(e) => Err(e),
        }
    }
}

fn git(dir: &Path, args: &[&str]) -> CommandLine {
    CommandLine::new("git")
        .args(args.iter().copied())
        .current_dir(dir)
}

fn is_not_a_repository(output: &str) -> bool {
    output.to_ascii_lowercase().contains("not a git repository")
}
