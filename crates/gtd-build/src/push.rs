use std::path::Path;

use gtd_core::ResolvedOptions;
use gtd_exec::{CommandExecutor, ContainerRun};
use secrecy::ExposeSecret;

use crate::builder::Builder;
use crate::error::Result;
use crate::image::AUTH_CACHE_DIR;

const DIND_IMAGE: &str = "docker:dind";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const CONTAINER_AUTH_DIR: &str = "/root/.docker";

impl<E: CommandExecutor> Builder<E> {
    /// Push every tag of the image through a docker-in-docker helper.
    ///
    /// Credentials, when present, are stored only in a cache dir under the
    /// output dir, which is removed once the stage ends.
    pub async fn push_image(&self) -> Result<()> {
        let opts = self.resolve().await?;
        opts.require_organization()?;

        let auth_dir = opts.output_path().join(AUTH_CACHE_DIR);

        let result = self.login_and_push(opts, &auth_dir).await;
        remove_auth_cache(&auth_dir);
        result
    }

    async fn login_and_push(&self, opts: &ResolvedOptions, auth_dir: &Path) -> Result<()> {
        let docker = self.docker();

        if let Some(username) = &opts.registry_username {
            let password = opts
                .registry_password
                .as_ref()
                .map(|p| p.expose_secret().as_bytes().to_vec())
                .unwrap_or_default();

            let mut login = vec!["docker", "login", "-u", username.as_str(), "--password-stdin"];
            if !opts.registry_host.is_empty() {
                login.push(opts.registry_host.as_str());
            }
            docker
                .run_with_stdin(&dind(auth_dir).command(login), &password)
                .await?;
            tracing::info!(registry = %opts.registry_host, user = %username, "registry login");

            if let Some(dind_user) = &opts.dind_user {
                docker
                    .run(&dind(auth_dir).command([
                        "chown",
                        "-R",
                        dind_user.as_str(),
                        CONTAINER_AUTH_DIR,
                    ]))
                    .await?;
            }
        }

        for image_ref in opts.image_refs() {
            tracing::debug!(image = %image_ref, "pushing");
            docker
                .run(&dind(auth_dir).command(["docker", "push", image_ref.as_str()]))
                .await?;
            tracing::info!(image = %image_ref, "image pushed");
        }
        Ok(())
    }
}

/// Helper container sharing the host docker socket and a private auth dir.
fn dind(auth_dir: &Path) -> ContainerRun {
    ContainerRun {
        privileged: true,
        ..ContainerRun::new(DIND_IMAGE)
    }
    .volume(DOCKER_SOCKET, DOCKER_SOCKET)
    .volume(auth_dir.to_string_lossy(), CONTAINER_AUTH_DIR)
}

/// Best effort: a leftover cache is logged, never fatal.
fn remove_auth_cache(auth_dir: &Path) {
    if !auth_dir.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(auth_dir) {
        tracing::warn!(
            path = %auth_dir.display(),
            error = %e,
            "failed to remove registry auth cache"
        );
    }
}
