use crate::anchor::matcher::Matcher;
use crate::buffer::LineBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// The part of the buffer an anchor search may match in.
///
/// Boundaries are re-resolved against the live buffer every time, so lines
/// inserted by earlier steps shift the window along with the text it names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    /// The whole buffer
    #[default]
    Whole,
    /// Absolute half-open line range `[start, end)`, clamped to the buffer
    Lines { start: usize, end: usize },
    /// `span` lines beginning at the first line matching `boundary`
    After { boundary: Matcher, span: usize },
    /// From the first `start` line through the first `end` line after it
    Between { start: Matcher, end: Matcher },
    /// `inner` resolved inside the range of `outer`
    Nested { outer: Box<Window>, inner: Box<Window> },
}

impl Window {
    pub fn after(boundary: Matcher, span: usize) -> Self {
        Window::After { boundary, span }
    }

    pub fn between(start: Matcher, end: Matcher) -> Self {
        Window::Between { start, end }
    }

    pub fn nested(outer: Window, inner: Window) -> Self {
        Window::Nested {
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }

    /// Resolve to a concrete line range, or `None` when a boundary is missing.
    pub fn resolve(&self, buffer: &LineBuffer) -> Option<Range<usize>> {
        self.resolve_in(buffer, 0..buffer.len())
    }

    fn resolve_in(&self, buffer: &LineBuffer, range: Range<usize>) -> Option<Range<usize>> {
        match self {
            Window::Whole => Some(range),
            Window::Lines { start, end } => {
                let start = (*start).clamp(range.start, range.end);
                let end = (*end).clamp(start, range.end);
                Some(start..end)
            }
            Window::After { boundary, span } => {
                let at = first_match(buffer, boundary, range.clone())?;
                Some(at..at.saturating_add(*span).min(range.end))
            }
            Window::Between { start, end } => {
                let from = first_match(buffer, start, range.clone())?;
                let to = first_match(buffer, end, from + 1..range.end)?;
                Some(from..to + 1)
            }
            Window::Nested { outer, inner } => {
                let outer_range = outer.resolve_in(buffer, range)?;
                inner.resolve_in(buffer, outer_range)
            }
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Whole => write!(f, "whole buffer"),
            Window::Lines { start, end } => write!(f, "lines [{start}, {end})"),
            Window::After { boundary, span } => write!(f, "{span} lines from [{boundary}]"),
            Window::Between { start, end } => write!(f, "between [{start}] and [{end}]"),
            Window::Nested { outer, inner } => write!(f, "{inner} within {outer}"),
        }
    }
}

pub(crate) fn first_match(
    buffer: &LineBuffer,
    matcher: &Matcher,
    range: Range<usize>,
) -> Option<usize> {
    range
        .into_iter()
        .find(|&idx| buffer.get(idx).is_some_and(|line| matcher.matches(line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LineBuffer {
        LineBuffer::from_lines([
            "case 'a':",       // 0
            "  result = {",    // 1
            "  };",            // 2
            "  break;",        // 3
            "case 'b':",       // 4
            "  result = {",    // 5
            "  } catch (e) {", // 6
            "  result = {",    // 7
            "  break;",        // 8
        ])
    }

    #[test]
    fn test_whole_and_lines() {
        let buffer = sample();
        assert_eq!(Window::Whole.resolve(&buffer), Some(0..9));
        assert_eq!(
            Window::Lines { start: 2, end: 50 }.resolve(&buffer),
            Some(2..9)
        );
        assert_eq!(
            Window::Lines { start: 20, end: 30 }.resolve(&buffer),
            Some(9..9)
        );
    }

    #[test]
    fn test_after_clamps_span() {
        let buffer = sample();
        let window = Window::after(Matcher::contains("case 'b'"), 100);
        assert_eq!(window.resolve(&buffer), Some(4..9));
        let window = Window::after(Matcher::contains("case 'b'"), 2);
        assert_eq!(window.resolve(&buffer), Some(4..6));
    }

    #[test]
    fn test_between_is_inclusive() {
        let buffer = sample();
        let window = Window::between(Matcher::contains("case 'b'"), Matcher::equals("break;"));
        assert_eq!(window.resolve(&buffer), Some(4..9));
    }

    #[test]
    fn test_missing_boundary_resolves_to_none() {
        let buffer = sample();
        assert_eq!(
            Window::after(Matcher::contains("case 'z'"), 3).resolve(&buffer),
            None
        );
        let open_ended = Window::between(Matcher::contains("case 'b'"), Matcher::contains("nope"));
        assert_eq!(open_ended.resolve(&buffer), None);
    }

    #[test]
    fn test_nested_searches_inside_outer() {
        let buffer = sample();
        let window = Window::nested(
            Window::between(Matcher::contains("case 'b'"), Matcher::equals("break;")),
            Window::after(Matcher::starts_with("} catch"), 2),
        );
        assert_eq!(window.resolve(&buffer), Some(6..8));
    }

    #[test]
    fn test_deserialize_window() {
        let window: Window = toml_edit::de::from_str(
            r#"
kind = "between"
start = { contains = "case 'b'" }
end = { equals = "break;" }
"#,
        )
        .unwrap();
        assert_eq!(
            window,
            Window::between(Matcher::contains("case 'b'"), Matcher::equals("break;"))
        );
    }
}
