use std::path::{Component, Path, PathBuf};

use secrecy::SecretString;
use serde::Serialize;

use crate::branch::{BranchTagsConfig, Revision, derive_tags};

pub const DEFAULT_APP_NAME: &str = "app";
pub const DEFAULT_BUILDER_IMAGE: &str = "golang:1.22-alpine";
pub const DEFAULT_APP_IMAGE: &str = "alpine:latest";
pub const DEFAULT_OUTPUT_DIR: &str = "_output_";

/// Builder image value that selects a host-native build instead of a container.
pub const LOCAL_BUILDER: &str = "local";

/// Template location relative to the toolchain root.
const DEFAULT_TEMPLATE: &str = "gtd/Dockerfile.tmpl";

/// Build configuration as assembled from flags, environment and `gtd.toml`.
///
/// Every `None` / empty field is filled during resolution; see
/// [`BuildOptions::resolve`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub app_name: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub builder_image: Option<String>,
    pub builder_image_user: Option<String>,
    /// Toolchain dependency root, mounted as the build cache.
    pub toolchain_root: Option<PathBuf>,
    pub app_image: Option<String>,
    pub app_image_user: Option<String>,
    pub dockerfile_template: Option<PathBuf>,
    pub exposes: Vec<String>,
    /// Glob patterns copied next to the binary.
    pub resources: Vec<String>,
    pub registry_host: Option<String>,
    pub registry_org: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<SecretString>,
    pub tags: Vec<String>,
    /// Branch name used instead of the checked-out one.
    pub fake_branch: Option<String>,
    pub branch_tags: BranchTagsConfig,
    pub trigger_uris: Vec<String>,
    pub dind_user: Option<String>,
    pub verbose: bool,
}

/// Facts gathered from the environment that resolution depends on.
#[derive(Debug, Clone)]
pub struct ResolveEnv {
    /// Absolute work dir (explicit or current).
    pub work_dir: PathBuf,
    /// Fallback toolchain root when the options carry none.
    pub toolchain_root: Option<PathBuf>,
    /// `None` when the work dir is not under version control.
    pub revision: Option<Revision>,
}

/// Fully resolved configuration, threaded through every stage.
///
/// Serializes (minus credentials) into the image template context, so
/// field names double as template variables.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedOptions {
    pub app_name: String,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub builder_image: String,
    pub builder_image_user: Option<String>,
    pub toolchain_root: Option<PathBuf>,
    pub app_image: String,
    pub app_image_user: Option<String>,
    pub dockerfile_template: PathBuf,
    /// `true` when the template path was not given explicitly.
    #[serde(skip)]
    pub template_is_default: bool,
    pub exposes: Vec<String>,
    pub resources: Vec<String>,
    pub registry_host: String,
    pub registry_org: String,
    pub registry_username: Option<String>,
    #[serde(skip)]
    pub registry_password: Option<SecretString>,
    pub tags: Vec<String>,
    pub revision: Option<Revision>,
    pub trigger_uris: Vec<String>,
    pub dind_user: Option<String>,
    pub verbose: bool,
}

impl BuildOptions {
    /// Fill defaults, apply the branch-tag entry and derive image tags.
    pub fn resolve(self, env: ResolveEnv) -> ResolvedOptions {
        let revision = env.revision.map(|rev| match self.fake_branch.as_deref() {
            Some(fake) if !fake.is_empty() => Revision {
                branch: fake.to_owned(),
                ..rev
            },
            _ => rev,
        });

        let mut registry_host = self.registry_host.unwrap_or_default();
        let mut registry_org = self.registry_org.unwrap_or_default();
        let mut registry_username = self.registry_username;
        let mut registry_password = self.registry_password;

        let entry = revision
            .as_ref()
            .and_then(|rev| self.branch_tags.get(&rev.branch));
        if let Some(entry) = entry {
            tracing::debug!(
                branch = %revision.as_ref().map(|r| r.branch.as_str()).unwrap_or_default(),
                server = %entry.server,
                organization = %entry.organization,
                "applying branch tags entry"
            );
            registry_host = entry.server.clone();
            registry_org = entry.organization.clone();
            registry_username = non_empty(&entry.username);
            registry_password = non_empty(&entry.password).map(SecretString::from);
        }

        let tags = derive_tags(&self.tags, revision.as_ref(), entry);

        let toolchain_root = self.toolchain_root.or(env.toolchain_root);
        let (dockerfile_template, template_is_default) = match self.dockerfile_template {
            Some(path) => (path, false),
            None => (
                toolchain_root
                    .as_deref()
                    .unwrap_or_else(|| Path::new("."))
                    .join(DEFAULT_TEMPLATE),
                true,
            ),
        };

        ResolvedOptions {
            app_name: self
                .app_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_owned()),
            work_dir: env.work_dir,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            builder_image: self
                .builder_image
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_BUILDER_IMAGE.to_owned()),
            builder_image_user: self.builder_image_user.filter(|u| !u.is_empty()),
            toolchain_root,
            app_image: self
                .app_image
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_APP_IMAGE.to_owned()),
            app_image_user: self.app_image_user.filter(|u| !u.is_empty()),
            dockerfile_template,
            template_is_default,
            exposes: self.exposes,
            resources: self.resources,
            registry_host,
            registry_org,
            registry_username: registry_username.filter(|u| !u.is_empty()),
            registry_password,
            tags,
            revision,
            trigger_uris: self.trigger_uris,
            dind_user: self.dind_user.filter(|u| !u.is_empty()),
            verbose: self.verbose,
        }
    }
}

impl ResolvedOptions {
    /// Fail unless a registry organization is configured.
    pub fn require_organization(&self) -> crate::Result<()> {
        if self.registry_org.is_empty() {
            return Err(crate::Error::MissingOrganization);
        }
        Ok(())
    }

    pub fn is_local_build(&self) -> bool {
        self.builder_image == LOCAL_BUILDER
    }

    /// Output dir joined onto the work dir.
    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(&self.output_dir)
    }

    /// Where the build writes the application binary.
    pub fn binary_path(&self) -> PathBuf {
        self.output_path().join(&self.app_name)
    }

    /// `true` when clearing the output dir would remove the work dir, one of
    /// its parents, or the filesystem root.
    pub fn output_dir_is_unsafe(&self) -> bool {
        if self.output_dir.as_os_str().is_empty() {
            return true;
        }
        let output = normalize(&self.output_path());
        normalize(&self.work_dir).starts_with(&output)
    }

    /// `<host>/<org>/<app>`, skipping an empty host.
    pub fn image_name(&self) -> String {
        [
            self.registry_host.as_str(),
            self.registry_org.as_str(),
            self.app_name.as_str(),
        ]
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
    }

    /// One `<image>:<tag>` reference per resolved tag.
    pub fn image_refs(&self) -> Vec<String> {
        let name = self.image_name();
        self.tags.iter().map(|tag| format!("{name}:{tag}")).collect()
    }
}

/// Lexically resolve `.` and `..` components; `..` never climbs above root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_owned())
}
