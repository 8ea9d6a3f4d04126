//! Anchor location: line predicates, search windows and first-match lookup.
//!
//! The locator never tries to be clever about ambiguity. It returns the
//! first matching line inside the window; callers narrow the window until
//! the first match is the intended one.

pub mod matcher;
pub mod window;

pub use matcher::Matcher;
pub use window::Window;

use crate::buffer::LineBuffer;
use serde::Serialize;

/// Outcome of an anchor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    FoundAt(usize),
    NotFound,
}

impl Location {
    pub fn index(self) -> Option<usize> {
        match self {
            Location::FoundAt(idx) => Some(idx),
            Location::NotFound => None,
        }
    }
}

/// Find the first line in `window` satisfying `matcher`.
pub fn locate(buffer: &LineBuffer, matcher: &Matcher, window: &Window) -> Location {
    window
        .resolve(buffer)
        .and_then(|range| window::first_match(buffer, matcher, range))
        .map_or(Location::NotFound, Location::FoundAt)
}

/// Minimum normalized Levenshtein similarity for a line to count as a near miss.
const NEAR_MISS_THRESHOLD: f64 = 0.6;

/// Closest line to an anchor that matched nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearMiss {
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

/// Look for the line most similar to the matcher's needle.
///
/// Searches the resolved window, or the whole buffer when the window's
/// boundary is itself missing.
pub fn near_miss(buffer: &LineBuffer, matcher: &Matcher, window: &Window) -> Option<NearMiss> {
    let needle = matcher.needle()?.trim();
    if needle.is_empty() {
        return None;
    }
    let range = window.resolve(buffer).unwrap_or(0..buffer.len());

    range
        .filter_map(|idx| buffer.get(idx).map(|line| (idx, line)))
        .map(|(idx, line)| {
            let similarity = strsim::normalized_levenshtein(needle, line.trim());
            (idx, line, similarity)
        })
        .filter(|(_, _, similarity)| *similarity >= NEAR_MISS_THRESHOLD)
        .max_by(|a, b| a.2.total_cmp(&b.2).then(b.0.cmp(&a.0)))
        .map(|(line, text, similarity)| NearMiss {
            line,
            text: text.trim().to_string(),
            similarity,
        })
}
