//! Pipeline stages for gtd.
//!
//! # Pipeline
//!
//! ```text
//! gtd all
//!   1. build app     ── go build (toolchain container or local) → _output_/<app>
//!                      + resource globs copied into _output_/
//!   2. build image   ── Dockerfile template → _output_/Dockerfile
//!                      docker build -t <host>/<org>/<app>:<tag> ...
//!   3. push image    ── docker:dind helper: login, chown, push per tag
//!   4. push trigger  ── HTTP GET per trigger URI, 200 required
//!
//! gtd clear
//!   app              ── rm -r _output_/
//!   image            ── docker rmi <host>/<org>/<app>:<tag> ...
//! ```
//!
//! # Option resolution
//!
//! A [`Builder`] holds unresolved [`gtd_core::BuildOptions`]. The first stage
//! call fills defaults, reads the git revision of the work dir and derives
//! the image tags; the result is cached for every later stage. Stages never
//! change the process working directory.

mod app;
pub mod builder;
mod clear;
pub mod dockerfile;
pub mod error;
mod image;
mod push;
pub mod resources;
mod trigger;

pub use builder::Builder;
pub use error::{BuildError, Result};
