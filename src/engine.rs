//! Whole-file driver: read once, patch in memory, write once.
//!
//! Nothing touches the target until every step and cleanup descriptor has
//! run. The final write goes through a temp file in the same directory,
//! fsync and rename, so the file holds either the old or the new content.

use crate::buffer::LineBuffer;
use crate::cleanup::{self, CleanupReport, StaleArtifact};
use crate::runner::{self, RunReport};
use crate::step::PatchStep;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Patch in memory and report, but leave the file alone
    pub dry_run: bool,
}

/// Step and cleanup results of one pass over a buffer.
#[derive(Debug, Clone, Default)]
pub struct PatchReport {
    pub run: RunReport,
    pub cleanup: Vec<CleanupReport>,
}

impl PatchReport {
    pub fn removed_stale_lines(&self) -> usize {
        self.cleanup
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .map(|o| o.removed_lines())
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.run.failures().next().is_some() || self.cleanup.iter().any(|c| c.result.is_err())
    }
}

/// Result of patching one file.
#[derive(Debug, Clone)]
#[must_use = "FileReport should be checked for failures"]
pub struct FileReport {
    pub path: PathBuf,
    pub report: PatchReport,
    pub original: String,
    pub patched: String,
    /// Whether the patched content was written back
    pub written: bool,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.fingerprint_before() != self.fingerprint_after()
    }

    pub fn fingerprint_before(&self) -> u64 {
        xxh3_64(self.original.as_bytes())
    }

    pub fn fingerprint_after(&self) -> u64 {
        xxh3_64(self.patched.as_bytes())
    }
}

/// Run the steps, then the cleanup pass, against one buffer.
pub fn patch_buffer(
    buffer: &mut LineBuffer,
    steps: &[PatchStep],
    artifacts: &[StaleArtifact],
) -> PatchReport {
    let run = runner::run(buffer, steps);
    let cleanup = cleanup::cleanup(buffer, artifacts);
    PatchReport { run, cleanup }
}

/// Patch the file at `path` in place.
pub fn apply_to_file(
    path: &Path,
    steps: &[PatchStep],
    artifacts: &[StaleArtifact],
    options: ApplyOptions,
) -> Result<FileReport, EngineError> {
    let original = fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut buffer = LineBuffer::parse(&original);
    let report = patch_buffer(&mut buffer, steps, artifacts);
    let patched = buffer.render();

    debug!(
        path = %path.display(),
        revision = buffer.revision(),
        applied = report.run.applied(),
        "patched in memory"
    );

    let needs_write = patched != original;
    let written = needs_write && !options.dry_run;
    if written {
        atomic_write(path, patched.as_bytes()).map_err(|source| EngineError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = patched.len(), "wrote patched file");
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        report,
        original,
        patched,
        written,
    })
}

/// Atomic file write: tempfile + fsync + rename, keeping the original permissions.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem.
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
