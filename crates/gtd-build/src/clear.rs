use gtd_exec::{CommandExecutor, ExecError};

use crate::builder::Builder;
use crate::error::{BuildError, Result};

impl<E: CommandExecutor> Builder<E> {
    /// Remove the build output dir. Refuses empty and root paths.
    pub async fn clear_app(&self) -> Result<()> {
        let opts = self.resolve().await?;

        if opts.output_dir_is_unsafe() {
            tracing::warn!(
                output = %opts.output_dir.display(),
                "refusing to clear unsafe output dir"
            );
            return Ok(());
        }

        let output = opts.output_path();
        match std::fs::remove_dir_all(&output) {
            Ok(()) => {
                tracing::info!(output = %output.display(), "build output removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(output = %output.display(), "nothing to clear");
                Ok(())
            }
            Err(e) => Err(BuildError::Remove {
                path: output,
                source: e,
            }),
        }
    }

    /// Remove every tagged image of the app in one `docker rmi`.
    pub async fn clear_image(&self) -> Result<()> {
        let opts = self.resolve().await?;
        opts.require_organization()?;

        let image_refs = opts.image_refs();
        match self.docker().remove_images(&image_refs).await {
            Ok(()) => {
                tracing::info!(images = ?image_refs, "images removed");
                Ok(())
            }
            Err(ExecError::CommandFailed { output, .. }) => {
                Err(BuildError::RemoveImages { output })
            }
            Err(e) => Err(e.into()),
        }
    }
}
