use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Branch-tag mapping ──
    #[error("failed to read branch tags config {path}")]
    BranchTagsLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse branch tags config {path}")]
    BranchTagsParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("docker registry organization could not be empty")]
    MissingOrganization,
}
