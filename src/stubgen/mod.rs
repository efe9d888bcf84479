//! Stub generation: one four-line Python script per eligible operation,
//! laid out in a directory tree mirroring each operation's menu path.
//!
//! Stub files are a pure function of the descriptor, so regenerating into the
//! same tree overwrites byte-identical content. Batch generation is
//! fail-fast.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::log_debug;
use crate::registry::{APPLICATION_MENU_ROOT, OperationInfo, OperationRegistry};

pub const STUB_INTERPRETER: &str = "#!/usr/bin/env python";
pub const STUB_MODULE: &str = "script_bridge";
pub const STUB_ENTRY_POINT: &str = "ScriptRunner";
pub const STUB_EXTENSION: &str = "py";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid stub directory: {}", path.display())]
    InvalidDirectory { path: PathBuf },
    #[error("operation has no identifier: {title}")]
    Unidentifiable { title: String },
    #[error("cannot write stub {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An operation gets a stub when it has an identifier, hangs off the
/// application menu root, and (when `headless_only`) can run headless.
/// Pure predicate; callers decide whether a skip is worth reporting.
pub fn is_eligible(op: &dyn OperationInfo, headless_only: bool) -> bool {
    op.identifier().is_some()
        && op.menu_root() == APPLICATION_MENU_ROOT
        && (!headless_only || op.can_run_headless())
}

/// Filesystem-safe form of one menu component: spaces and slashes become
/// underscores, trailing ellipses are stripped. Idempotent.
pub fn sanitize(component: &str) -> String {
    let mut cleaned: String = component
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    while cleaned.ends_with("...") {
        cleaned.truncate(cleaned.len() - 3);
    }
    cleaned
}

/// Stub location for a descriptor: one subdirectory per non-leaf menu
/// component, the sanitized leaf as the file name. Operations without a menu
/// path land directly in `dir` under their sanitized title.
pub fn stub_path(dir: &Path, op: &dyn OperationInfo) -> PathBuf {
    match op.menu_path().split_last() {
        None => dir.join(format!("{}.{STUB_EXTENSION}", sanitize(op.title()))),
        Some((leaf, parents)) => {
            let mut path = dir.to_path_buf();
            for component in parents {
                path.push(sanitize(component));
            }
            path.push(format!("{}.{STUB_EXTENSION}", sanitize(leaf)));
            path
        }
    }
}

fn render_stub(identifier: &str) -> String {
    let escaped = identifier.replace('\n', "\\n");
    format!(
        "{STUB_INTERPRETER}\nimport {STUB_MODULE}, sys\nid = \"{escaped}\"\n{STUB_MODULE}.{STUB_ENTRY_POINT}.main(id)\n"
    )
}

/// Write the stub for one descriptor, creating menu subdirectories as
/// needed. An existing stub at the same path is overwritten silently.
pub fn generate(op: &dyn OperationInfo, dir: &Path) -> Result<PathBuf, GenerateError> {
    if !dir.is_dir() {
        return Err(GenerateError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }
    let identifier = op.identifier().ok_or_else(|| GenerateError::Unidentifiable {
        title: op.title().to_string(),
    })?;

    let path = stub_path(dir, op);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| GenerateError::Write {
            path: path.clone(),
            source,
        })?;
    }
    fs::write(&path, render_stub(identifier)).map_err(|source| GenerateError::Write {
        path: path.clone(),
        source,
    })?;
    log_debug!("wrote stub {}", path.display());
    Ok(path)
}

/// Generate stubs for every eligible operation in the registry. Returns the
/// number written. The first per-operation failure aborts the remainder of
/// the batch.
pub fn generate_all(
    registry: &dyn OperationRegistry,
    dir: &Path,
    headless_only: bool,
) -> Result<usize, GenerateError> {
    if !dir.is_dir() {
        return Err(GenerateError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }
    let mut written = 0;
    for op in registry.operations() {
        if !is_eligible(op, headless_only) {
            log_debug!("skipping ineligible operation: {}", op.title());
            continue;
        }
        generate(op, dir)?;
        written += 1;
    }
    Ok(written)
}
