use crate::anchor::{Matcher, Window};
use crate::cleanup::StaleArtifact;
use crate::guard::Guard;
use crate::mutation::{Content, IndentSource, Mutation};
use crate::step::{PatchStep, DEFAULT_COMMENT_PREFIX};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub cleanup: Vec<CleanupDefinition>,
}

impl PatchSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.steps.is_empty() && self.cleanup.is_empty() {
            issues.push(ValidationIssue::EmptyPatchSet);
        }

        let mut seen = HashSet::new();
        let ids = self
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .chain(self.cleanup.iter().map(|c| c.id.as_str()));
        for id in ids {
            if id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    id: None,
                    field: "id",
                });
            } else if !seen.insert(id) {
                issues.push(ValidationIssue::DuplicateId { id: id.to_string() });
            }
        }

        for step in &self.steps {
            let id = Some(step.id.clone());

            if step.anchor.has_blank_needle() {
                issues.push(ValidationIssue::MissingField {
                    id: id.clone(),
                    field: "anchor",
                });
            }
            check_window(&step.window, &id, "window", &mut issues);

            match &step.guard {
                Guard::Marker { token, lookahead } => {
                    if token.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            id: id.clone(),
                            field: "guard.token",
                        });
                    }
                    if *lookahead == 0 {
                        issues.push(ValidationIssue::InvalidCombo {
                            id: id.clone(),
                            message: "guard.lookahead must be at least 1".to_string(),
                        });
                    }
                }
                Guard::Tag { lookahead } => {
                    if *lookahead == 0 {
                        issues.push(ValidationIssue::InvalidCombo {
                            id: id.clone(),
                            message: "guard.lookahead must be at least 1".to_string(),
                        });
                    }
                    if matches!(step.mutation, MutationDefinition::DeleteRange { .. }) {
                        issues.push(ValidationIssue::InvalidCombo {
                            id: id.clone(),
                            message: "tag guard needs a mutation that produces lines".to_string(),
                        });
                    }
                }
                Guard::None => {}
            }

            match &step.mutation {
                MutationDefinition::InsertAfter { lines } => {
                    if lines.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            id: id.clone(),
                            field: "mutation.lines",
                        });
                    }
                }
                MutationDefinition::ReplaceRange { count, lines } => {
                    if *count == 0 && lines.is_empty() {
                        issues.push(ValidationIssue::InvalidCombo {
                            id: id.clone(),
                            message: "replace_range with count 0 and no lines does nothing"
                                .to_string(),
                        });
                    }
                }
                MutationDefinition::DeleteRange { count } => {
                    if *count == 0 {
                        issues.push(ValidationIssue::InvalidCombo {
                            id: id.clone(),
                            message: "delete_range count must be at least 1".to_string(),
                        });
                    }
                }
            }

            if step.mutation.lines().iter().any(|l| l.contains(['\n', '\r'])) {
                issues.push(ValidationIssue::InvalidCombo {
                    id: id.clone(),
                    message: "mutation.lines entries must be single lines".to_string(),
                });
            }
        }

        for artifact in &self.cleanup {
            let id = Some(artifact.id.clone());
            if artifact.boundary.has_blank_needle() {
                issues.push(ValidationIssue::MissingField {
                    id: id.clone(),
                    field: "boundary",
                });
            }
            if artifact.stale.has_blank_needle() {
                issues.push(ValidationIssue::MissingField {
                    id: id.clone(),
                    field: "stale",
                });
            }
            if artifact.scope == 0 {
                issues.push(ValidationIssue::InvalidCombo {
                    id: id.clone(),
                    message: "scope must be at least 1".to_string(),
                });
            }
            check_window(&artifact.window, &id, "window", &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Engine steps in declaration order.
    pub fn steps(&self) -> Vec<PatchStep> {
        let prefix = self
            .meta
            .comment_prefix
            .as_deref()
            .unwrap_or(DEFAULT_COMMENT_PREFIX);
        self.steps.iter().map(|s| s.to_step(prefix)).collect()
    }

    /// Cleanup descriptors in declaration order.
    pub fn artifacts(&self) -> Vec<StaleArtifact> {
        self.cleanup.iter().map(CleanupDefinition::to_artifact).collect()
    }
}

fn check_window(
    window: &Window,
    id: &Option<String>,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) {
    match window {
        Window::Whole => {}
        Window::Lines { start, end } => {
            if start > end {
                issues.push(ValidationIssue::InvalidCombo {
                    id: id.clone(),
                    message: format!("{field} lines start {start} is after end {end}"),
                });
            }
        }
        Window::After { boundary, span } => {
            if boundary.has_blank_needle() {
                issues.push(ValidationIssue::MissingField {
                    id: id.clone(),
                    field: "window.boundary",
                });
            }
            if *span == 0 {
                issues.push(ValidationIssue::InvalidCombo {
                    id: id.clone(),
                    message: format!("{field} span must be at least 1"),
                });
            }
        }
        Window::Between { start, end } => {
            if start.has_blank_needle() || end.has_blank_needle() {
                issues.push(ValidationIssue::MissingField {
                    id: id.clone(),
                    field: "window.start/end",
                });
            }
        }
        Window::Nested { outer, inner } => {
            check_window(outer, id, field, issues);
            check_window(inner, id, field, issues);
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// File the set patches, relative to the patch root
    #[serde(default)]
    pub target: Option<String>,
    /// Comment syntax of the target, for tag guards
    #[serde(default)]
    pub comment_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StepDefinition {
    pub id: String,
    pub anchor: Matcher,
    #[serde(default)]
    pub window: Window,
    #[serde(default)]
    pub guard: Guard,
    #[serde(default)]
    pub indent: IndentSource,
    pub mutation: MutationDefinition,
}

impl StepDefinition {
    pub fn to_step(&self, comment_prefix: &str) -> PatchStep {
        PatchStep::new(self.id.clone(), self.anchor.clone(), self.mutation.to_mutation())
            .within(self.window.clone())
            .guarded_by(self.guard.clone())
            .indent_from(self.indent)
            .comment_prefix(comment_prefix)
    }
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationDefinition {
    InsertAfter {
        lines: Vec<String>,
    },
    ReplaceRange {
        #[serde(default = "default_count")]
        count: usize,
        #[serde(default)]
        lines: Vec<String>,
    },
    DeleteRange {
        #[serde(default = "default_count")]
        count: usize,
    },
}

impl MutationDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            MutationDefinition::InsertAfter { .. } => "insert_after",
            MutationDefinition::ReplaceRange { .. } => "replace_range",
            MutationDefinition::DeleteRange { .. } => "delete_range",
        }
    }

    pub fn lines(&self) -> &[String] {
        match self {
            MutationDefinition::InsertAfter { lines }
            | MutationDefinition::ReplaceRange { lines, .. } => lines,
            MutationDefinition::DeleteRange { .. } => &[],
        }
    }

    pub fn to_mutation(&self) -> Mutation {
        match self {
            MutationDefinition::InsertAfter { lines } => {
                Mutation::insert_after(Content::Lines(lines.clone()))
            }
            MutationDefinition::ReplaceRange { count, lines } => {
                Mutation::replace(*count, Content::Lines(lines.clone()))
            }
            MutationDefinition::DeleteRange { count } => Mutation::delete(*count),
        }
    }
}

fn default_scope() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleanupDefinition {
    pub id: String,
    pub boundary: Matcher,
    pub stale: Matcher,
    #[serde(default = "default_scope")]
    pub scope: usize,
    #[serde(default)]
    pub leading_comment: Option<Matcher>,
    #[serde(default)]
    pub window: Window,
}

impl CleanupDefinition {
    pub fn to_artifact(&self) -> StaleArtifact {
        let artifact = StaleArtifact::new(
            self.id.clone(),
            self.boundary.clone(),
            self.stale.clone(),
            self.scope,
        )
        .within(self.window.clone());
        match &self.leading_comment {
            Some(comment) => artifact.with_leading_comment(comment.clone()),
            None => artifact,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPatchSet,
    DuplicateId {
        id: String,
    },
    MissingField {
        id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchSet => {
                write!(f, "patch set contains no steps and no cleanup entries")
            }
            ValidationIssue::DuplicateId { id } => write!(f, "id '{id}' is used more than once"),
            ValidationIssue::MissingField { id, field } => match id {
                Some(id) => write!(f, "entry '{id}' missing required field '{field}'"),
                None => write!(f, "entry missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { id, message } => match id {
                Some(id) => write!(f, "entry '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch set configuration: {message}"),
            },
        }
    }
}
