//! Lint rule trait and traversal descriptor.

use super::context::RuleContext;
use super::fix::Violation;
use crate::tree::TreeError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// When a rule is scheduled by the fix loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LintPhase {
    /// Interacting rules, re-run until the tree stops changing.
    #[default]
    Main,
    /// Non-interacting formatting rules, run once to fix and once to confirm.
    Post,
}

/// Static description of a rule and how the crawler visits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDescriptor {
    /// Short rule code (e.g., "LT01").
    pub code: &'static str,
    /// Dotted name (e.g., "layout.spacing").
    pub name: &'static str,
    /// One-line description of what the rule checks.
    pub description: &'static str,
    /// When false, the rule is evaluated exactly once with the root.
    pub recurse_into: bool,
    /// When false, unparsable nodes and their descendants are skipped.
    pub works_on_unparsable: bool,
    /// When true, each visit receives the leaves crawled so far.
    pub needs_raw_stack: bool,
    pub lint_phase: LintPhase,
    /// Opts in to fixes that touch templated or block slices.
    pub template_aware: bool,
}

impl RuleDescriptor {
    pub const fn new(code: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            code,
            name,
            description,
            recurse_into: true,
            works_on_unparsable: true,
            needs_raw_stack: false,
            lint_phase: LintPhase::Main,
            template_aware: false,
        }
    }

    pub const fn no_recurse(self) -> Self {
        Self {
            recurse_into: false,
            ..self
        }
    }

    pub const fn skip_unparsable(self) -> Self {
        Self {
            works_on_unparsable: false,
            ..self
        }
    }

    pub const fn with_raw_stack(self) -> Self {
        Self {
            needs_raw_stack: true,
            ..self
        }
    }

    pub const fn post_phase(self) -> Self {
        Self {
            lint_phase: LintPhase::Post,
            ..self
        }
    }

    pub const fn template_aware(self) -> Self {
        Self {
            template_aware: true,
            ..self
        }
    }
}

/// Failure reported by a rule's `evaluate`. Caught at the call site and
/// surfaced as a `RULE_INTERNAL_ERROR` issue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{0}")]
    Message(String),

    #[error("invalid value {value:?} for option `{key}`")]
    InvalidOption { key: String, value: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl RuleError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A lint rule evaluated by the crawler.
///
/// Implementations must be stateless across calls: the same rule instance
/// is shared between passes and, through a shared [`super::Linter`],
/// between threads.
pub trait LintRule: Send + Sync {
    fn descriptor(&self) -> RuleDescriptor;

    fn code(&self) -> &'static str {
        self.descriptor().code
    }

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    fn description(&self) -> &'static str {
        self.descriptor().description
    }

    /// Inspect the context's current node and report violations.
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;
}
