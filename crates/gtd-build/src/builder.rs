use std::path::PathBuf;

use gtd_core::{BuildOptions, ResolveEnv, ResolvedOptions};
use gtd_exec::{CommandExecutor, DockerClient, GitClient, RealExecutor};
use tokio::sync::OnceCell;

use crate::error::{BuildError, Result};

/// Runs pipeline stages over one set of build options.
///
/// The options start unresolved; the first stage call resolves them
/// (defaults, git revision, branch tags) and every later call reuses that
/// result. A builder lives for one CLI invocation.
pub struct Builder<E: CommandExecutor = RealExecutor> {
    options: BuildOptions,
    resolved: OnceCell<ResolvedOptions>,
    pub(crate) executor: E,
    pub(crate) http: reqwest::Client,
}

impl Builder<RealExecutor> {
    pub fn new(options: BuildOptions) -> Self {
        Self::with_executor(options, RealExecutor)
    }
}

impl<E: CommandExecutor> Builder<E> {
    pub fn with_executor(options: BuildOptions, executor: E) -> Self {
        Self {
            options,
            resolved: OnceCell::new(),
            executor,
            http: reqwest::Client::new(),
        }
    }

    /// Replace the HTTP client used for triggers.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Resolved options, computed on first call only.
    pub async fn resolve(&self) -> Result<&ResolvedOptions> {
        self.resolved.get_or_try_init(|| self.resolve_once()).await
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    async fn resolve_once(&self) -> Result<ResolvedOptions> {
        let work_dir = match &self.options.work_dir {
            Some(dir) => std::path::absolute(dir),
            None => std::env::current_dir(),
        }
        .map_err(|e| BuildError::WorkDir { source: e })?;

        let revision = self.git().revision(&work_dir).await?;

        let resolved = self.options.clone().resolve(ResolveEnv {
            work_dir,
            toolchain_root: default_toolchain_root(),
            revision,
        });

        tracing::debug!(
            app = %resolved.app_name,
            work_dir = %resolved.work_dir.display(),
            image = %resolved.image_name(),
            tags = ?resolved.tags,
            "options resolved"
        );
        Ok(resolved)
    }

    pub(crate) fn git(&self) -> GitClient<&E> {
        GitClient::with_executor(&self.executor)
    }

    pub(crate) fn docker(&self) -> DockerClient<&E> {
        DockerClient::with_executor(&self.executor)
    }
}

/// First `GOPATH` entry, else `~/go`.
fn default_toolchain_root() -> Option<PathBuf> {
    std::env::var_os("GOPATH")
        .and_then(|paths| std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()))
        .or_else(|| dirs::home_dir().map(|home| home.join("go")))
}
