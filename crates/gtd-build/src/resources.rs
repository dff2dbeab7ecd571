//! Resource files shipped next to the application binary.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// Expand glob patterns into file paths relative to `work_dir`.
///
/// Relative patterns are matched from `work_dir`; absolute patterns must
/// land inside it. Directories and anything already under `output_dir` are
/// skipped.
pub fn expand(work_dir: &Path, output_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let escaped_root = glob::Pattern::escape(&work_dir.to_string_lossy());
    let mut files = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            Path::new(&escaped_root)
                .join(pattern)
                .to_string_lossy()
                .into_owned()
        };

        let entries = glob::glob(&full).map_err(|e| BuildError::Pattern {
            pattern: pattern.clone(),
            source: e,
        })?;

        let mut matched = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| BuildError::GlobEntry { source: e })?;
            if path.is_dir() || path.starts_with(output_dir) {
                continue;
            }
            let relative = path
                .strip_prefix(work_dir)
                .map_err(|_| BuildError::ResourceOutsideWorkDir {
                    path: path.clone(),
                    work_dir: work_dir.to_path_buf(),
                })?
                .to_path_buf();
            if !files.contains(&relative) {
                files.push(relative);
                matched += 1;
            }
        }

        if matched == 0 {
            tracing::warn!(pattern = %pattern, "resource pattern matched no files");
        }
    }

    Ok(files)
}

/// Copy each relative path from `work_dir` to the same place under `output_dir`.
///
/// Stops at the first failure; files already copied stay in place.
pub fn copy_all(work_dir: &Path, output_dir: &Path, files: &[PathBuf]) -> Result<()> {
    for relative in files {
        let from = work_dir.join(relative);
        let to = output_dir.join(relative);

        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        tracing::debug!(from = %from.display(), to = %to.display(), "copying resource");
        copy_file(&from, &to).map_err(|e| BuildError::CopyFile {
            from: from.clone(),
            to: to.clone(),
            source: e,
        })?;
    }
    Ok(())
}

/// Byte copy followed by an fsync of the destination.
fn copy_file(from: &Path, to: &Path) -> std::io::Result<()> {
    let mut input = File::open(from)?;
    let mut output = File::create(to)?;
    std::io::copy(&mut input, &mut output)?;
    output.sync_all()
}
