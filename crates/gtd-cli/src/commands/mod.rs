mod pipeline;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use gtd_core::{BranchTagsConfig, BuildOptions, ProjectConfig};
use secrecy::SecretString;

pub use pipeline::{Stage, run};

/// Flags shared by every subcommand.
#[derive(Args)]
pub struct BuildArgs {
    /// Application name [default: work dir name]
    #[arg(long)]
    pub name: Option<String>,

    /// Project directory [default: current dir]
    #[arg(short = 'd', long = "workdir")]
    pub work_dir: Option<PathBuf>,

    /// Toolchain image used to compile, or `local` for a host build
    #[arg(long, env = "GTD_BUILDER_IMAGE")]
    pub builder_image: Option<String>,

    /// User the toolchain container runs as
    #[arg(long, env = "GTD_BUILDER_IMAGE_USER")]
    pub builder_image_user: Option<String>,

    /// Resource glob copied next to the binary (repeatable)
    #[arg(long = "res")]
    pub resources: Vec<String>,

    /// Registry host
    #[arg(short = 'r', long, env = "GTD_REGISTRY")]
    pub registry: Option<String>,

    /// Registry organization
    #[arg(short = 'o', long, env = "GTD_ORG")]
    pub organization: Option<String>,

    #[arg(long, env = "GTD_REGISTRY_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "GTD_REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Image tag (repeatable)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// Port exposed by the image (repeatable)
    #[arg(long = "expose")]
    pub exposes: Vec<String>,

    /// Runtime base image
    #[arg(long, env = "GTD_APP_IMAGE")]
    pub app_image: Option<String>,

    #[arg(long, env = "GTD_APP_IMAGE_USER")]
    pub app_image_user: Option<String>,

    /// Dockerfile template
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Trigger URI called after push (repeatable)
    #[arg(short = 'u', long = "uri")]
    pub uris: Vec<String>,

    /// JSON file mapping branches to registry settings and tags
    #[arg(long)]
    pub branch_tags_config: Option<PathBuf>,

    /// Owner of the registry auth cache written by docker-in-docker
    #[arg(long, env = "GTD_DIND_USER")]
    pub dind_user: Option<String>,

    /// Branch name used instead of the checked-out one
    #[arg(long)]
    pub fake_branch: Option<String>,

    /// Toolchain dependency root [default: first GOPATH entry, else ~/go]
    #[arg(long, env = "GOPATH")]
    pub gopath: Option<PathBuf>,

    /// Debug logging and verbose compiler output
    #[arg(long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Merge flags with gtd.toml and the branch tags file.
    ///
    /// Flags (and their env vars) win; gtd.toml fills what they leave
    /// unset; the app name finally falls back to the work dir name.
    pub fn into_options(self) -> anyhow::Result<BuildOptions> {
        let work_dir = match &self.work_dir {
            Some(dir) => std::path::absolute(dir),
            None => std::env::current_dir(),
        }
        .context("failed to resolve work dir")?;

        let config = ProjectConfig::load(&work_dir)?;
        let branch_tags_path = self
            .branch_tags_config
            .clone()
            .or_else(|| config.branch_tags_path(&work_dir));

        let mut options = BuildOptions {
            app_name: self.name,
            work_dir: Some(work_dir.clone()),
            output_dir: None,
            builder_image: self.builder_image,
            builder_image_user: self.builder_image_user,
            toolchain_root: self.gopath.and_then(|paths| first_path(&paths)),
            app_image: self.app_image,
            app_image_user: self.app_image_user,
            dockerfile_template: self.template,
            exposes: self.exposes,
            resources: self.resources,
            registry_host: self.registry,
            registry_org: self.organization,
            registry_username: self.username,
            registry_password: self.password.map(SecretString::from),
            tags: self.tags,
            fake_branch: self.fake_branch,
            branch_tags: BranchTagsConfig::default(),
            trigger_uris: self.uris,
            dind_user: self.dind_user,
            verbose: self.verbose,
        };
        config.apply_to(&mut options, &work_dir);

        if options.app_name.is_none() {
            options.app_name = work_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
        }
        if let Some(path) = branch_tags_path {
            options.branch_tags = BranchTagsConfig::load(&path)?;
        }

        Ok(options)
    }
}

/// First non-empty entry of a `PATH`-style list.
fn first_path(paths: &Path) -> Option<PathBuf> {
    std::env::split_paths(paths).find(|p| !p.as_os_str().is_empty())
}
