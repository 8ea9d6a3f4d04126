//! Patch-set applicator - resolves a set's target and drives the engine
//!
//! This module connects loaded configuration to the file engine:
//! - Resolves the target file (explicit override, else `meta.target` under the root)
//! - Compiles step and cleanup definitions into engine types
//! - Applies them in one read/patch/write pass, or simulates the pass

use crate::config::schema::PatchSet;
use crate::engine::{self, ApplyOptions, EngineError, FileReport};
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors during patch-set application
#[derive(Debug)]
pub enum ApplicationError {
    /// Neither an override nor `meta.target` names a file
    MissingTarget { set: String },
    /// Reading or writing the target failed
    Engine(EngineError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::MissingTarget { set } => {
                write!(
                    f,
                    "patch set '{}' has no meta.target and no target file was given",
                    set
                )
            }
            ApplicationError::Engine(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Engine(e) => Some(e),
            ApplicationError::MissingTarget { .. } => None,
        }
    }
}

impl From<EngineError> for ApplicationError {
    fn from(e: EngineError) -> Self {
        ApplicationError::Engine(e)
    }
}

/// Resolve the file a patch set applies to.
///
/// An explicit override wins and is used as given; otherwise `meta.target`
/// is joined onto `root` unless it is already absolute.
pub fn resolve_target(
    set: &PatchSet,
    root: &Path,
    target_override: Option<&Path>,
) -> Result<PathBuf, ApplicationError> {
    if let Some(path) = target_override {
        return Ok(path.to_path_buf());
    }
    match set.meta.target.as_deref().map(str::trim) {
        Some(target) if !target.is_empty() => Ok(root.join(target)),
        _ => Err(ApplicationError::MissingTarget {
            set: set.meta.name.clone(),
        }),
    }
}

/// Apply a patch set to its target file
///
/// # Arguments
///
/// * `set` - The loaded patch set
/// * `root` - Directory `meta.target` is relative to
/// * `target_override` - Explicit file to patch instead of `meta.target`
/// * `options` - Engine options (dry run)
pub fn apply_patch_set(
    set: &PatchSet,
    root: &Path,
    target_override: Option<&Path>,
    options: ApplyOptions,
) -> Result<FileReport, ApplicationError> {
    let path = resolve_target(set, root, target_override)?;
    let steps = set.steps();
    let artifacts = set.artifacts();
    Ok(engine::apply_to_file(&path, &steps, &artifacts, options)?)
}

/// Report what applying the set would do, without touching the file.
pub fn check_patch_set(
    set: &PatchSet,
    root: &Path,
    target_override: Option<&Path>,
) -> Result<FileReport, ApplicationError> {
    apply_patch_set(set, root, target_override, ApplyOptions { dry_run: true })
}
