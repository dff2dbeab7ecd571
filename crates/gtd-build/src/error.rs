use std::path::PathBuf;

use gtd_exec::{ExecError, RevisionError};

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    // ── Preconditions ──
    #[error(transparent)]
    Options(#[from] gtd_core::Error),

    #[error("build output {0} not found, please build app first")]
    OutputMissing(PathBuf),

    #[error("output path {0} should be a dir, not a file")]
    OutputNotDir(PathBuf),

    #[error("binary {0} not found, please build app first")]
    BinaryMissing(PathBuf),

    #[error("{0} should be an executable file")]
    BinaryIsDir(PathBuf),

    #[error("output dir {output} must be inside work dir {work_dir} for a containerized build")]
    OutputOutsideWorkDir { output: PathBuf, work_dir: PathBuf },

    #[error("resource {path} is outside work dir {work_dir}")]
    ResourceOutsideWorkDir { path: PathBuf, work_dir: PathBuf },

    // ── External processes ──
    #[error(transparent)]
    Revision(#[from] RevisionError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("docker rmi failed:\n{output}")]
    RemoveImages { output: String },

    // ── Filesystem ──
    #[error("failed to resolve work dir")]
    WorkDir { source: std::io::Error },

    #[error("failed to inspect {path}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid resource pattern {pattern:?}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to read resource match")]
    GlobEntry { source: glob::GlobError },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {from} to {to}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read Dockerfile template {path}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render Dockerfile template {path}")]
    TemplateRender { path: PathBuf, source: tera::Error },

    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Triggers ──
    #[error("trigger request to {uri} failed")]
    TriggerRequest { uri: String, source: reqwest::Error },

    #[error("uri: {uri}\nstatus code: {status}, body:\n{body}")]
    TriggerStatus {
        uri: String,
        status: u16,
        body: String,
    },
}
