//! The line buffer every patch step operates on.
//!
//! A [`LineBuffer`] is parsed once from the target file and rendered once at
//! the end of a run. Parsing and rendering round-trip byte-for-byte: the
//! line-ending convention and the presence of a final newline are remembered,
//! and lines never contain `\n`.

use std::fmt;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Line terminator used when rendering the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// CRLF only when every `\n` in the text is preceded by `\r`.
    ///
    /// Mixed files are treated as LF so that stray `\r` bytes stay inside the
    /// line content and rendering reproduces the input exactly.
    fn detect(text: &str) -> Self {
        let mut saw_newline = false;
        let bytes = text.as_bytes();
        for (idx, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                saw_newline = true;
                if idx == 0 || bytes[idx - 1] != b'\r' {
                    return LineEnding::Lf;
                }
            }
        }
        if saw_newline {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

/// Buffer invariant violations, detected before any mutation takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("range [{start}, {start}+{count}) exceeds buffer of {len} lines")]
    RangeOutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },

    #[error("insert position {index} is past the end of a buffer of {len} lines")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("produced line {index} contains an embedded line break")]
    EmbeddedLineBreak { index: usize },
}

/// Ordered, versioned sequence of text lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
    ending: LineEnding,
    trailing_newline: bool,
    revision: u64,
}

impl LineBuffer {
    /// Split `text` into lines, remembering how to put it back together.
    pub fn parse(text: &str) -> Self {
        let ending = LineEnding::detect(text);
        let trailing_newline = text.ends_with('\n');

        let body = if trailing_newline {
            &text[..text.len() - ending.as_str().len()]
        } else {
            text
        };

        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split(ending.as_str()).map(str::to_string).collect()
        };

        Self {
            lines,
            ending,
            trailing_newline,
            revision: 0,
        }
    }

    /// Build an LF buffer with a final newline from individual lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ending: LineEnding::Lf,
            trailing_newline: true,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// Number of mutations applied since the buffer was parsed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Render the buffer back to text with the original conventions.
    pub fn render(&self) -> String {
        let separator = self.ending.as_str();
        let mut out = self.lines.join(separator);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(separator);
        }
        out
    }

    /// xxh3 hash of the rendered text.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.render().as_bytes())
    }

    pub(crate) fn insert_at(
        &mut self,
        index: usize,
        new_lines: Vec<String>,
    ) -> Result<(), BufferError> {
        if index > self.lines.len() {
            return Err(BufferError::IndexOutOfBounds {
                index,
                len: self.lines.len(),
            });
        }
        check_produced(&new_lines)?;
        if new_lines.is_empty() {
            return Ok(());
        }
        self.lines.splice(index..index, new_lines);
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn delete_range(
        &mut self,
        start: usize,
        count: usize,
    ) -> Result<Vec<String>, BufferError> {
        self.replace_range(start, count, Vec::new())
    }

    /// Remove `count` lines at `start` and put `new_lines` in their place.
    ///
    /// Returns the removed lines. Validation happens before anything moves.
    pub(crate) fn replace_range(
        &mut self,
        start: usize,
        count: usize,
        new_lines: Vec<String>,
    ) -> Result<Vec<String>, BufferError> {
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.lines.len())
            .ok_or(BufferError::RangeOutOfBounds {
                start,
                count,
                len: self.lines.len(),
            })?;
        check_produced(&new_lines)?;

        if count == 0 && new_lines.is_empty() {
            return Ok(Vec::new());
        }
        let removed: Vec<String> = self.lines.splice(start..end, new_lines).collect();
        self.revision += 1;
        Ok(removed)
    }
}

impl fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn check_produced(lines: &[String]) -> Result<(), BufferError> {
    match lines.iter().position(|l| l.contains('\n') || l.contains('\r')) {
        Some(index) => Err(BufferError::EmbeddedLineBreak { index }),
        None => Ok(()),
    }
}
