use serde::{Deserialize, Serialize};
use std::fmt;

/// A textual predicate over a single line.
///
/// Deserializes from externally tagged TOML tables, e.g.
/// `{ contains = "result = {" }` or `{ all_of = [{ contains = "a" }, { not = { equals = "}" } }] }`.
/// `blank` is written as the bare string `"blank"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Line contains the needle anywhere
    Contains(String),
    /// Line equals the needle once surrounding whitespace is trimmed
    Equals(String),
    /// Line starts with the needle, ignoring indentation
    StartsWith(String),
    /// Line ends with the needle, ignoring trailing whitespace
    EndsWith(String),
    /// Line is empty or whitespace only
    Blank,
    AllOf(Vec<Matcher>),
    AnyOf(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub fn contains(needle: impl Into<String>) -> Self {
        Matcher::Contains(needle.into())
    }

    pub fn equals(needle: impl Into<String>) -> Self {
        Matcher::Equals(needle.into())
    }

    pub fn starts_with(needle: impl Into<String>) -> Self {
        Matcher::StartsWith(needle.into())
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Contains(needle) => line.contains(needle.as_str()),
            Matcher::Equals(needle) => line.trim() == needle.trim(),
            Matcher::StartsWith(needle) => line.trim_start().starts_with(needle.as_str()),
            Matcher::EndsWith(needle) => line.trim_end().ends_with(needle.as_str()),
            Matcher::Blank => line.trim().is_empty(),
            Matcher::AllOf(all) => all.iter().all(|m| m.matches(line)),
            Matcher::AnyOf(any) => any.iter().any(|m| m.matches(line)),
            Matcher::Not(inner) => !inner.matches(line),
        }
    }

    /// First positive literal needle, used for near-miss hints.
    pub fn needle(&self) -> Option<&str> {
        match self {
            Matcher::Contains(n)
            | Matcher::Equals(n)
            | Matcher::StartsWith(n)
            | Matcher::EndsWith(n) => Some(n.as_str()),
            Matcher::AllOf(list) | Matcher::AnyOf(list) => list.iter().find_map(Matcher::needle),
            Matcher::Blank | Matcher::Not(_) => None,
        }
    }

    /// Literal needles that are empty after trimming. Such matchers match every line.
    pub(crate) fn has_blank_needle(&self) -> bool {
        match self {
            Matcher::Contains(n)
            | Matcher::Equals(n)
            | Matcher::StartsWith(n)
            | Matcher::EndsWith(n) => n.trim().is_empty(),
            Matcher::AllOf(list) | Matcher::AnyOf(list) => {
                list.is_empty() || list.iter().any(Matcher::has_blank_needle)
            }
            Matcher::Not(inner) => inner.has_blank_needle(),
            Matcher::Blank => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, list: &[Matcher]) -> fmt::Result {
            write!(f, "{op}(")?;
            for (idx, m) in list.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{m}")?;
            }
            write!(f, ")")
        }

        match self {
            Matcher::Contains(n) => write!(f, "contains {n:?}"),
            Matcher::Equals(n) => write!(f, "equals {n:?}"),
            Matcher::StartsWith(n) => write!(f, "starts with {n:?}"),
            Matcher::EndsWith(n) => write!(f, "ends with {n:?}"),
            Matcher::Blank => write!(f, "blank"),
            Matcher::AllOf(list) => join(f, "all_of", list),
            Matcher::AnyOf(list) => join(f, "any_of", list),
            Matcher::Not(inner) => write!(f, "not({inner})"),
        }
    }
}
