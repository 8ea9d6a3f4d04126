//! Idempotency guards.
//!
//! A guard looks at a few lines right after the anchor for a token the step's
//! own mutation would have produced. It is a presence check: unrelated text
//! carrying the same token fools it, which is why [`Guard::Tag`] exists.

use crate::buffer::LineBuffer;
use serde::{Deserialize, Serialize};

fn default_lookahead() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    /// No idempotency check; re-running relies on the anchor disappearing
    #[default]
    None,
    /// Applied if any of the `lookahead` lines after the anchor contains `token`
    Marker {
        token: String,
        #[serde(default = "default_lookahead")]
        lookahead: usize,
    },
    /// Like `Marker`, with the token `patch:<step id>` stamped by the executor.
    /// The anchor line is scanned too, since a replacement stamps its first
    /// produced line in the anchor's place.
    Tag {
        #[serde(default = "default_lookahead")]
        lookahead: usize,
    },
}

impl Guard {
    pub fn marker(token: impl Into<String>) -> Self {
        Guard::Marker {
            token: token.into(),
            lookahead: 1,
        }
    }

    pub fn tag() -> Self {
        Guard::Tag { lookahead: 1 }
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Guard::Tag { .. })
    }
}

/// Token a tag guard looks for and the executor writes.
pub fn tag_token(step_id: &str) -> String {
    format!("patch:{step_id}")
}

/// Decide whether the step anchored at `anchor` has already been applied.
pub fn already_applied(buffer: &LineBuffer, anchor: usize, guard: &Guard, step_id: &str) -> bool {
    let (token, first, lookahead) = match guard {
        Guard::None => return false,
        Guard::Marker { token, lookahead } => (token.clone(), anchor + 1, *lookahead),
        Guard::Tag { lookahead } => (tag_token(step_id), anchor, *lookahead),
    };

    (first..=anchor.saturating_add(lookahead))
        .map_while(|idx| buffer.get(idx))
        .any(|line| line.contains(token.as_str()))
}
