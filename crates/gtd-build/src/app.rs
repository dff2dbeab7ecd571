use std::path::{Path, PathBuf};

use gtd_core::ResolvedOptions;
use gtd_exec::{CommandExecutor, CommandLine, ContainerRun};

use crate::builder::Builder;
use crate::error::{BuildError, Result};
use crate::resources;

/// Work dir mount point inside the toolchain container.
const CONTAINER_SRC: &str = "/usr/src/app";

/// Toolchain dependency cache mount point inside the toolchain container.
const CONTAINER_GOPATH: &str = "/go";

impl<E: CommandExecutor> Builder<E> {
    /// Compile the application into `<output>/<app>` and copy its resources.
    pub async fn build_app(&self) -> Result<()> {
        let opts = self.resolve().await?;

        if opts.is_local_build() {
            tracing::debug!("using local go build");
            self.executor.exec_streaming(&local_build(opts)).await?;
        } else {
            self.docker().run(&container_build(opts)?).await?;
        }

        let output = opts.output_path();
        let files = resources::expand(&opts.work_dir, &output, &opts.resources)?;
        resources::copy_all(&opts.work_dir, &output, &files)?;

        tracing::info!(
            binary = %opts.binary_path().display(),
            resources = files.len(),
            "app built"
        );
        Ok(())
    }
}

fn go_build(output: &Path, app_name: &str, verbose: bool) -> Vec<String> {
    let mut args = vec![
        "go".to_owned(),
        "build".to_owned(),
        "-o".to_owned(),
        output.join(app_name).to_string_lossy().into_owned(),
    ];
    if verbose {
        args.push("-v".to_owned());
    }
    args
}

fn local_build(opts: &ResolvedOptions) -> CommandLine {
    let argv = go_build(&opts.output_dir, &opts.app_name, opts.verbose);
    let mut cmd = CommandLine::new("go")
        .args(argv.into_iter().skip(1))
        .current_dir(&opts.work_dir);
    if let Some(root) = &opts.toolchain_root {
        cmd = cmd.env("GOPATH", root.to_string_lossy());
    }
    cmd
}

fn container_build(opts: &ResolvedOptions) -> Result<ContainerRun> {
    let output = container_output(opts)?;

    let mut run = ContainerRun::new(opts.builder_image.as_str())
        .volume(opts.work_dir.to_string_lossy(), CONTAINER_SRC);
    if let Some(root) = &opts.toolchain_root {
        run = run.volume(root.to_string_lossy(), CONTAINER_GOPATH);
    }

    Ok(ContainerRun {
        user: opts.builder_image_user.clone(),
        workdir: Some(CONTAINER_SRC.to_owned()),
        ..run
    }
    .command(go_build(&output, &opts.app_name, opts.verbose)))
}

/// Output dir as seen from the container's work dir mount.
fn container_output(opts: &ResolvedOptions) -> Result<PathBuf> {
    if opts.output_dir.is_relative() {
        return Ok(opts.output_dir.clone());
    }
    opts.output_dir
        .strip_prefix(&opts.work_dir)
        .map(Path::to_path_buf)
        .map_err(|_| BuildError::OutputOutsideWorkDir {
            output: opts.output_dir.clone(),
            work_dir: opts.work_dir.clone(),
        })
}
