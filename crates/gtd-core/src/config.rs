use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::options::BuildOptions;

/// File name looked up in the work dir.
pub const CONFIG_FILE: &str = "gtd.toml";

/// gtd.toml configuration
///
/// Every field is optional; values only fill options that flags and
/// environment left unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub app: AppConfig,
    pub build: BuildConfig,
    pub image: ImageConfig,
    pub registry: RegistryConfig,
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Binary and image name
    pub name: Option<String>,
    /// Resource glob patterns copied next to the binary
    pub resources: Vec<String>,
    /// Ports exposed to the image template
    pub exposes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Toolchain image, or `local` for a host build
    pub builder_image: Option<String>,
    pub builder_image_user: Option<String>,
    /// Build output directory, relative to the work dir
    pub output_dir: Option<PathBuf>,
    /// Toolchain dependency root
    pub gopath: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Runtime base image
    pub app_image: Option<String>,
    pub app_image_user: Option<String>,
    /// Dockerfile template path
    pub template: Option<PathBuf>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub server: Option<String>,
    pub organization: Option<String>,
    pub username: Option<String>,
    pub dind_user: Option<String>,
    /// Path of the branch → registry JSON mapping
    pub branch_tags_config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub uris: Vec<String>,
}

impl ProjectConfig {
    /// Load from gtd.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %config_path.display(), "project config loaded");
        Ok(config)
    }

    /// Fill options left unset by flags and environment.
    ///
    /// Relative paths in the file are taken relative to `project_dir`.
    pub fn apply_to(self, options: &mut BuildOptions, project_dir: &Path) {
        let rel = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                project_dir.join(p)
            }
        };

        fill(&mut options.app_name, self.app.name);
        fill_vec(&mut options.resources, self.app.resources);
        fill_vec(&mut options.exposes, self.app.exposes);

        fill(&mut options.builder_image, self.build.builder_image);
        fill(&mut options.builder_image_user, self.build.builder_image_user);
        fill(&mut options.output_dir, self.build.output_dir);
        fill(&mut options.toolchain_root, self.build.gopath.map(rel));

        fill(&mut options.app_image, self.image.app_image);
        fill(&mut options.app_image_user, self.image.app_image_user);
        fill(&mut options.dockerfile_template, self.image.template.map(rel));
        fill_vec(&mut options.tags, self.image.tags);

        fill(&mut options.registry_host, self.registry.server);
        fill(&mut options.registry_org, self.registry.organization);
        fill(&mut options.registry_username, self.registry.username);
        fill(&mut options.dind_user, self.registry.dind_user);

        fill_vec(&mut options.trigger_uris, self.trigger.uris);
    }

    /// Branch tags config path, resolved against `project_dir`.
    pub fn branch_tags_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.registry
            .branch_tags_config
            .as_ref()
            .map(|p| project_dir.join(p))
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn fill_vec<T>(slot: &mut Vec<T>, value: Vec<T>) {
    if slot.is_empty() {
        *slot = value;
    }
}
