use std::path::Path;

use crate::command::CommandLine;
use crate::error::ExecError;
use crate::executor::{CommandExecutor, RealExecutor};

/// Arguments of a one-shot `docker run --rm`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRun {
    pub image: String,
    pub user: Option<String>,
    /// `(host, container)` bind mounts
    pub volumes: Vec<(String, String)>,
    pub workdir: Option<String>,
    pub privileged: bool,
    /// Keep stdin open (`-i`)
    pub interactive: bool,
    pub command: Vec<String>,
}

impl ContainerRun {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn volume(mut self, host: impl Into<String>, container: impl Into<String>) -> Self {
        self.volumes.push((host.into(), container.into()));
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// `docker run` argument vector.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_owned()];
        if self.interactive {
            args.push("-i".to_owned());
        }
        if self.privileged {
            args.push("--privileged".to_owned());
        }
        args.push("--rm".to_owned());
        if let Some(user) = &self.user {
            args.push("-u".to_owned());
            args.push(user.clone());
        }
        for (host, container) in &self.volumes {
            args.push("-v".to_owned());
            args.push(format!("{host}:{container}"));
        }
        if let Some(workdir) = &self.workdir {
            args.push("-w".to_owned());
            args.push(workdir.clone());
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// docker CLI operations, parameterized over the executor for testability.
pub struct DockerClient<E: CommandExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// `docker run`, streaming container output.
    pub async fn run(&self, run: &ContainerRun) -> Result<(), ExecError> {
        self.executor
            .exec_streaming(&CommandLine::new("docker").args(run.to_args()))
            .await
    }

    /// `docker run -i`, feeding `stdin_data` to the container.
    pub async fn run_with_stdin(
        &self,
        run: &ContainerRun,
        stdin_data: &[u8],
    ) -> Result<Vec<u8>, ExecError> {
        let run = ContainerRun {
            interactive: true,
            ..run.clone()
        };
        self.executor
            .exec_with_stdin(&CommandLine::new("docker").args(run.to_args()), stdin_data)
            .await
    }

    /// `docker build -t <ref> ... .` inside `context_dir`.
    pub async fn build(&self, context_dir: &Path, image_refs: &[String]) -> Result<(), ExecError> {
        let mut cmd = CommandLine::new("docker").arg("build");
        for image_ref in image_refs {
            cmd = cmd.arg("-t").arg(image_ref.as_str());
        }
        self.executor
            .exec_streaming(&cmd.arg(".").current_dir(context_dir))
            .await
    }

    /// `docker rmi <ref>...` in a single invocation.
    pub async fn remove_images(&self, image_refs: &[String]) -> Result<(), ExecError> {
        let cmd = CommandLine::new("docker")
            .arg("rmi")
            .args(image_refs.iter().cloned());
        let out = self.executor.exec(&cmd).await?;
        tracing::debug!(output = %String::from_utf8_lossy(&out).trim(), "images removed");
        Ok(())
    }
}
