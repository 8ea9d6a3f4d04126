//! Patch sequence runner.
//!
//! Steps run strictly in list order against the live buffer, so every step
//! sees the lines inserted or removed by the steps before it. A step that
//! finds nothing is skipped, never fatal; the returned [`RunReport`] lets a
//! caller tell "everything matched" apart from "something silently did
//! nothing".

use crate::anchor::{self, Location, NearMiss};
use crate::buffer::{BufferError, LineBuffer};
use crate::guard;
use crate::step::PatchStep;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Terminal state of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[must_use = "StepOutcome should be reported"]
pub enum StepOutcome {
    Applied {
        at: usize,
        inserted: usize,
        removed: usize,
    },
    SkippedAlreadyApplied {
        at: usize,
    },
    SkippedNoMatch {
        hint: Option<NearMiss>,
    },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Applied {
                at,
                inserted,
                removed,
            } => write!(
                f,
                "Applied at line {} (+{inserted} -{removed})",
                at + 1
            ),
            StepOutcome::SkippedAlreadyApplied { at } => {
                write!(f, "Already applied at line {}", at + 1)
            }
            StepOutcome::SkippedNoMatch { hint: None } => write!(f, "Skipped (no match)"),
            StepOutcome::SkippedNoMatch { hint: Some(hint) } => write!(
                f,
                "Skipped (no match; closest is line {}: {:?})",
                hint.line + 1,
                hint.text
            ),
        }
    }
}

/// Step-level failure. Recovered locally: the run goes on without this step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("malformed mutation result: {0}")]
    Malformed(#[from] BufferError),
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub id: String,
    pub result: Result<StepOutcome, StepError>,
}

/// Ordered per-step results of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Applied { .. }))
    }

    pub fn already_applied(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::SkippedAlreadyApplied { .. }))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::SkippedNoMatch { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StepError)> {
        self.steps
            .iter()
            .filter_map(|s| s.result.as_ref().err().map(|e| (s.id.as_str(), e)))
    }

    /// True when no step reported `SkippedNoMatch`.
    pub fn all_matched(&self) -> bool {
        self.unmatched() == 0
    }

    /// Every step matched and none failed.
    pub fn is_clean(&self) -> bool {
        self.all_matched() && self.failures().next().is_none()
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps
            .iter()
            .filter(|s| s.result.as_ref().is_ok_and(&pred))
            .count()
    }
}

/// Run `steps` in order against `buffer`.
pub fn run(buffer: &mut LineBuffer, steps: &[PatchStep]) -> RunReport {
    let steps = steps
        .iter()
        .map(|step| {
            let result = run_step(buffer, step);
            match &result {
                Ok(outcome) => debug!(step = %step.id, %outcome, "step finished"),
                Err(err) => warn!(step = %step.id, error = %err, "step rejected"),
            }
            StepReport {
                id: step.id.clone(),
                result,
            }
        })
        .collect();
    RunReport { steps }
}

/// Execute a single step: locate, guard, mutate.
pub fn run_step(buffer: &mut LineBuffer, step: &PatchStep) -> Result<StepOutcome, StepError> {
    let at = match anchor::locate(buffer, &step.anchor, &step.window) {
        Location::FoundAt(at) => at,
        Location::NotFound => {
            return Ok(StepOutcome::SkippedNoMatch {
                hint: anchor::near_miss(buffer, &step.anchor, &step.window),
            });
        }
    };

    if guard::already_applied(buffer, at, &step.guard, &step.id) {
        return Ok(StepOutcome::SkippedAlreadyApplied { at });
    }

    let stamp = step.stamp();
    let effect = step
        .mutation
        .apply(buffer, at, step.indent, stamp.as_deref())?;
    Ok(StepOutcome::Applied {
        at: effect.at,
        inserted: effect.inserted,
        removed: effect.removed,
    })
}
