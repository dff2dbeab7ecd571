use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{program} not found in PATH")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("command failed: {command}\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("i/o error while running {command}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to write to stdin of {command}")]
    StdinWrite {
        command: String,
        source: std::io::Error,
    },
}

impl ExecError {
    /// Captured output of a failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RevisionError {
    #[error("git revision probe failed in {dir}")]
    Probe { dir: PathBuf, source: ExecError },
}
