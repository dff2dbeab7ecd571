//! External process plumbing for gtd.
//!
//! Every command goes through a [`CommandExecutor`]; [`RealExecutor`]
//! spawns processes, tests substitute a mock. [`GitClient`] reads the
//! revision of a work dir and [`DockerClient`] speaks the docker CLI.

pub mod command;
pub mod docker;
pub mod error;
pub mod executor;
pub mod git;

pub use command::CommandLine;
pub use docker::{ContainerRun, DockerClient};
pub use error::{ExecError, RevisionError};
pub use executor::{CommandExecutor, RealExecutor};
pub use git::GitClient;
