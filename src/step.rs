use crate::anchor::{Matcher, Window};
use crate::guard::{self, Guard};
use crate::mutation::{IndentSource, Mutation};

/// Comment prefix used to stamp tag-guarded content when none is configured.
pub const DEFAULT_COMMENT_PREFIX: &str = "//";

/// One named, independently applicable transformation.
#[derive(Debug, Clone)]
pub struct PatchStep {
    pub id: String,
    pub anchor: Matcher,
    pub window: Window,
    pub guard: Guard,
    pub indent: IndentSource,
    pub mutation: Mutation,
    pub comment_prefix: String,
}

impl PatchStep {
    /// A step searching the whole buffer with no guard.
    pub fn new(id: impl Into<String>, anchor: Matcher, mutation: Mutation) -> Self {
        Self {
            id: id.into(),
            anchor,
            window: Window::Whole,
            guard: Guard::None,
            indent: IndentSource::Anchor,
            mutation,
            comment_prefix: DEFAULT_COMMENT_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn within(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn guarded_by(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn indent_from(mut self, indent: IndentSource) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn comment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.comment_prefix = prefix.into();
        self
    }

    /// Text appended to the first produced line, for tag guards only.
    pub fn stamp(&self) -> Option<String> {
        self.guard.is_tag().then(|| {
            format!(
                "{} {}",
                self.comment_prefix.trim_end(),
                guard::tag_token(&self.id)
            )
        })
    }
}
