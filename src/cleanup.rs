//! Corrective pass for stale declarations.
//!
//! Earlier, less precise patch runs replaced too few lines and left the old
//! declaration behind the new one. Each [`StaleArtifact`] names such a
//! leftover by the line it must follow and the literal text it carries;
//! nothing else is ever removed.

use crate::anchor::window::first_match;
use crate::anchor::{Matcher, Window};
use crate::buffer::LineBuffer;
use crate::mutation::{IndentSource, Mutation};
use crate::runner::StepError;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct StaleArtifact {
    pub id: String,
    /// Line the stale construct is found after
    pub boundary: Matcher,
    /// The stale line itself
    pub stale: Matcher,
    /// Number of lines after the boundary that are searched
    pub scope: usize,
    /// Comment directly above the stale line that goes with it
    pub leading_comment: Option<Matcher>,
    /// Where the boundary is searched
    pub window: Window,
}

impl StaleArtifact {
    pub fn new(id: impl Into<String>, boundary: Matcher, stale: Matcher, scope: usize) -> Self {
        Self {
            id: id.into(),
            boundary,
            stale,
            scope,
            leading_comment: None,
            window: Window::Whole,
        }
    }

    #[must_use]
    pub fn with_leading_comment(mut self, comment: Matcher) -> Self {
        self.leading_comment = Some(comment);
        self
    }

    #[must_use]
    pub fn within(mut self, window: Window) -> Self {
        self.window = window;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Deleted `lines` lines starting at `at`
    Removed { at: usize, lines: usize },
    NothingStale,
    BoundaryNotFound,
}

impl CleanupOutcome {
    pub fn removed_lines(&self) -> usize {
        match self {
            CleanupOutcome::Removed { lines, .. } => *lines,
            _ => 0,
        }
    }
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupOutcome::Removed { at, lines } => {
                write!(f, "Removed {lines} stale line(s) at line {}", at + 1)
            }
            CleanupOutcome::NothingStale => write!(f, "Nothing stale"),
            CleanupOutcome::BoundaryNotFound => write!(f, "Skipped (boundary not found)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanupReport {
    pub id: String,
    pub result: Result<CleanupOutcome, StepError>,
}

/// Run every descriptor once, in order, against the patched buffer.
pub fn cleanup(buffer: &mut LineBuffer, artifacts: &[StaleArtifact]) -> Vec<CleanupReport> {
    artifacts
        .iter()
        .map(|artifact| {
            let result = remove_stale(buffer, artifact);
            match &result {
                Ok(CleanupOutcome::Removed { at, lines }) => {
                    info!(artifact = %artifact.id, line = at + 1, lines, "removed stale lines")
                }
                Ok(outcome) => debug!(artifact = %artifact.id, %outcome, "cleanup finished"),
                Err(err) => debug!(artifact = %artifact.id, error = %err, "cleanup rejected"),
            }
            CleanupReport {
                id: artifact.id.clone(),
                result,
            }
        })
        .collect()
}

fn remove_stale(
    buffer: &mut LineBuffer,
    artifact: &StaleArtifact,
) -> Result<CleanupOutcome, StepError> {
    let Some(range) = artifact.window.resolve(buffer) else {
        return Ok(CleanupOutcome::BoundaryNotFound);
    };
    let Some(boundary) = first_match(buffer, &artifact.boundary, range) else {
        return Ok(CleanupOutcome::BoundaryNotFound);
    };

    let scope = boundary + 1..(boundary + 1).saturating_add(artifact.scope).min(buffer.len());
    let Some(stale) = first_match(buffer, &artifact.stale, scope) else {
        return Ok(CleanupOutcome::NothingStale);
    };

    let with_comment = stale > boundary + 1
        && artifact
            .leading_comment
            .as_ref()
            .zip(buffer.get(stale - 1))
            .is_some_and(|(comment, line)| comment.matches(line));
    let (at, count) = if with_comment {
        (stale - 1, 2)
    } else {
        (stale, 1)
    };

    let effect = Mutation::delete(count).apply(buffer, at, IndentSource::Anchor, None)?;
    Ok(CleanupOutcome::Removed {
        at,
        lines: effect.removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_output() -> LineBuffer {
        LineBuffer::from_lines([
            "// Get quote and swap transaction based on DEX", // 0
            "let swapTransaction: any;",                      // 1
            "if (raydium) {",                                 // 2
            "\tswapTransaction = raydium();",                 // 3
            "}",                                              // 4
            "// Get swap transaction",                        // 5
            "const swapTransaction = await rpc.getJupiterSwapTransaction(q);", // 6
            "",                                               // 7
            "result = {",                                     // 8
        ])
    }

    #[test]
    fn test_removes_stale_line_only() {
        let mut buffer = legacy_output();
        let artifact = StaleArtifact::new(
            "stale-swap",
            Matcher::contains("let swapTransaction: any;"),
            Matcher::contains("const swapTransaction = await rpc.getJupiterSwapTransaction"),
            20,
        );
        let reports = cleanup(&mut buffer, &[artifact]);

        assert_eq!(
            reports[0].result,
            Ok(CleanupOutcome::Removed { at: 6, lines: 1 })
        );
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.get(5), Some("// Get swap transaction"));
        assert_eq!(buffer.get(6), Some(""));
    }

    #[test]
    fn test_removes_leading_comment_with_stale_line() {
        let mut buffer = legacy_output();
        let artifact = StaleArtifact::new(
            "stale-swap",
            Matcher::contains("let swapTransaction: any;"),
            Matcher::contains("const swapTransaction = await"),
            20,
        )
        .with_leading_comment(Matcher::contains("// Get swap transaction"));
        let reports = cleanup(&mut buffer, &[artifact.clone()]);

        assert_eq!(
            reports[0].result,
            Ok(CleanupOutcome::Removed { at: 5, lines: 2 })
        );
        assert_eq!(buffer.get(4), Some("}"));
        assert_eq!(buffer.get(5), Some(""));

        let again = cleanup(&mut buffer, &[artifact]);
        assert_eq!(again[0].result, Ok(CleanupOutcome::NothingStale));
    }

    #[test]
    fn test_stale_outside_scope_is_kept() {
        let mut buffer = legacy_output();
        let artifact = StaleArtifact::new(
            "narrow",
            Matcher::contains("let swapTransaction: any;"),
            Matcher::contains("const swapTransaction"),
            3,
        );
        let reports = cleanup(&mut buffer, &[artifact]);
        assert_eq!(reports[0].result, Ok(CleanupOutcome::NothingStale));
        assert_eq!(buffer, legacy_output());
    }

    #[test]
    fn test_absent_stale_marker_changes_nothing() {
        let mut buffer = legacy_output();
        let artifact = StaleArtifact::new(
            "never",
            Matcher::contains("let swapTransaction: any;"),
            Matcher::contains("const advSwapTransaction"),
            20,
        );
        let reports = cleanup(&mut buffer, &[artifact]);
        assert_eq!(reports[0].result.as_ref().map(CleanupOutcome::removed_lines), Ok(0));
        assert_eq!(buffer, legacy_output());
    }

    #[test]
    fn test_missing_boundary() {
        let mut buffer = legacy_output();
        let artifact = StaleArtifact::new(
            "no-boundary",
            Matcher::contains("let advSwapTransaction: any;"),
            Matcher::contains("const advSwapTransaction"),
            20,
        );
        let reports = cleanup(&mut buffer, &[artifact]);
        assert_eq!(reports[0].result, Ok(CleanupOutcome::BoundaryNotFound));
    }
}
