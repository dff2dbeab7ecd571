use std::path::Path;

use gtd_exec::CommandExecutor;

use crate::builder::Builder;
use crate::dockerfile;
use crate::error::{BuildError, Result};

/// Registry login cache left in the output dir by a push.
pub(crate) const AUTH_CACHE_DIR: &str = ".docker";

impl<E: CommandExecutor> Builder<E> {
    /// Render the Dockerfile template into the output dir and `docker build` it.
    pub async fn build_image(&self) -> Result<()> {
        let opts = self.resolve().await?;
        opts.require_organization()?;

        let output = opts.output_path();
        check_build_output(&output, &opts.binary_path())?;

        let source = dockerfile::load_template(opts)?;
        let content = dockerfile::render(&source, opts, &opts.dockerfile_template)?;

        let dockerfile_path = output.join("Dockerfile");
        std::fs::write(&dockerfile_path, content).map_err(|e| BuildError::WriteDockerfile {
            path: dockerfile_path.clone(),
            source: e,
        })?;

        let stale_auth = output.join(AUTH_CACHE_DIR);
        if stale_auth.exists() {
            std::fs::remove_dir_all(&stale_auth).map_err(|e| BuildError::Remove {
                path: stale_auth.clone(),
                source: e,
            })?;
        }

        let image_refs = opts.image_refs();
        self.docker().build(&output, &image_refs).await?;

        tracing::info!(images = ?image_refs, "image built");
        Ok(())
    }
}

/// The output dir must be a directory holding a non-directory binary.
fn check_build_output(output: &Path, binary: &Path) -> Result<()> {
    match std::fs::metadata(output) {
        Ok(meta) if !meta.is_dir() => return Err(BuildError::OutputNotDir(output.to_path_buf())),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildError::OutputMissing(output.to_path_buf()));
        }
        Err(e) => {
            return Err(BuildError::Stat {
                path: output.to_path_buf(),
                source: e,
            });
        }
    }

    match std::fs::metadata(binary) {
        Ok(meta) if meta.is_dir() => Err(BuildError::BinaryIsDir(binary.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(BuildError::BinaryMissing(binary.to_path_buf()))
        }
        Err(e) => Err(BuildError::Stat {
            path: binary.to_path_buf(),
            source: e,
        }),
    }
}
