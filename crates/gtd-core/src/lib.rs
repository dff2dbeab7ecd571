//! Core types and configuration for gtd.
//!
//! This crate defines the unresolved [`BuildOptions`] record, its resolved
//! counterpart [`ResolvedOptions`], the branch-to-registry mapping
//! ([`BranchTagsConfig`]) with the pure tag derivation ([`derive_tags`]),
//! the `gtd.toml` schema ([`ProjectConfig`]), and shared error types.

pub mod branch;
pub mod config;
pub mod error;
pub mod options;

pub use branch::{BranchTag, BranchTagsConfig, Revision, derive_tags};
pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use options::{BuildOptions, ResolveEnv, ResolvedOptions};
