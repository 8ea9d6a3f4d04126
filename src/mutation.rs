//! The mutation executor: the only code path that changes a [`LineBuffer`].
//!
//! Every step and every cleanup action compiles down to one [`Mutation`]
//! applied at a located index. Produced lines are validated before the
//! buffer is touched, so a rejected mutation leaves it exactly as it was.

use crate::buffer::{BufferError, LineBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type Generator = dyn Fn(&str) -> Vec<String> + Send + Sync;

/// Lines a mutation produces, given the derived indentation.
#[derive(Clone)]
pub enum Content {
    /// Template lines; each non-empty line is prefixed with the indentation
    Lines(Vec<String>),
    /// Arbitrary generator receiving the indentation
    Generated(Arc<Generator>),
}

impl Content {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Content::Lines(lines.into_iter().map(Into::into).collect())
    }

    pub fn generated<F>(f: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        Content::Generated(Arc::new(f))
    }

    pub fn render(&self, indent: &str) -> Vec<String> {
        match self {
            Content::Lines(lines) => lines
                .iter()
                .map(|line| {
                    if line.is_empty() {
                        String::new()
                    } else {
                        format!("{indent}{line}")
                    }
                })
                .collect(),
            Content::Generated(f) => f(indent),
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Lines(lines) => f.debug_tuple("Lines").field(lines).finish(),
            Content::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// Which line seeds the indentation of produced content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentSource {
    /// The anchor line itself
    #[default]
    Anchor,
    /// The line after the anchor (falls back to the anchor at end of buffer)
    NextLine,
}

impl IndentSource {
    pub fn resolve(self, buffer: &LineBuffer, at: usize) -> String {
        let line = match self {
            IndentSource::Anchor => buffer.get(at),
            IndentSource::NextLine => buffer.get(at + 1).or_else(|| buffer.get(at)),
        };
        line.map(leading_whitespace).unwrap_or_default().to_string()
    }
}

/// The leading run of spaces and tabs.
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// One buffer transition, applied at a located index.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert produced lines immediately after the index
    InsertAfter { content: Content },
    /// Replace `count` lines starting at the index
    ReplaceRange { count: usize, content: Content },
    /// Remove `count` lines starting at the index
    DeleteRange { count: usize },
}

impl Mutation {
    pub fn insert_after(content: Content) -> Self {
        Mutation::InsertAfter { content }
    }

    pub fn replace(count: usize, content: Content) -> Self {
        Mutation::ReplaceRange { count, content }
    }

    pub fn delete(count: usize) -> Self {
        Mutation::DeleteRange { count }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::InsertAfter { .. } => "insert_after",
            Mutation::ReplaceRange { .. } => "replace_range",
            Mutation::DeleteRange { .. } => "delete_range",
        }
    }

    /// Apply at `at`. `tag`, when given, is appended to the first produced line
    /// (an empty first line gets the indentation before it).
    pub fn apply(
        &self,
        buffer: &mut LineBuffer,
        at: usize,
        indent: IndentSource,
        tag: Option<&str>,
    ) -> Result<MutationEffect, BufferError> {
        if at >= buffer.len() {
            return Err(BufferError::RangeOutOfBounds {
                start: at,
                count: 1,
                len: buffer.len(),
            });
        }

        let indent = indent.resolve(buffer, at);
        let produce = |content: &Content| {
            let mut lines = content.render(&indent);
            if let (Some(tag), Some(first)) = (tag, lines.first_mut()) {
                if first.is_empty() {
                    first.push_str(&indent);
                } else {
                    first.push(' ');
                }
                first.push_str(tag);
            }
            lines
        };

        match self {
            Mutation::InsertAfter { content } => {
                let lines = produce(content);
                let inserted = lines.len();
                buffer.insert_at(at + 1, lines)?;
                Ok(MutationEffect {
                    at,
                    inserted,
                    removed: 0,
                })
            }
            Mutation::ReplaceRange { count, content } => {
                let lines = produce(content);
                let inserted = lines.len();
                let removed = buffer.replace_range(at, *count, lines)?.len();
                Ok(MutationEffect {
                    at,
                    inserted,
                    removed,
                })
            }
            Mutation::DeleteRange { count } => {
                let removed = buffer.delete_range(at, *count)?.len();
                Ok(MutationEffect {
                    at,
                    inserted: 0,
                    removed,
                })
            }
        }
    }
}

/// What a mutation did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutationEffect {
    pub at: usize,
    pub inserted: usize,
    pub removed: usize,
}
