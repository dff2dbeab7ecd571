use std::path::Path;

use gtd_core::ResolvedOptions;
use tera::{Context, Tera};

use crate::error::{BuildError, Result};

/// Template used when no template file is configured or found.
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/Dockerfile.tmpl");

/// Load the configured template source.
///
/// A defaulted template path that does not exist falls back to
/// [`BUILTIN_TEMPLATE`]; an explicit one must exist.
pub fn load_template(options: &ResolvedOptions) -> Result<String> {
    let path = &options.dockerfile_template;
    if options.template_is_default && !path.exists() {
        tracing::debug!(path = %path.display(), "default template missing, using built-in");
        return Ok(BUILTIN_TEMPLATE.to_owned());
    }

    tracing::debug!(path = %path.display(), "using Dockerfile template");
    std::fs::read_to_string(path).map_err(|e| BuildError::TemplateRead {
        path: path.clone(),
        source: e,
    })
}

/// Render `source` with every resolved option as a template variable.
pub fn render(source: &str, options: &ResolvedOptions, origin: &Path) -> Result<String> {
    let render_error = |e| BuildError::TemplateRender {
        path: origin.to_path_buf(),
        source: e,
    };
    let context = Context::from_serialize(options).map_err(render_error)?;
    Tera::one_off(source, &context, false).map_err(render_error)
}
