//! Results returned by [`super::Linter::lint`] and [`super::Linter::fix`].

use super::fix::Violation;
use super::rule::LintPhase;
use crate::types::{Issue, Severity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Trace of one crawl made by the fix loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassRecord {
    pub phase: LintPhase,
    /// 1-based pass number within the phase.
    pub index: usize,
    pub violations_found: usize,
    pub fixes_applied: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    /// Unresolved violations, deduplicated and ordered by position.
    pub violations: Vec<Violation>,
    /// Parse problems, rule failures and rejected fixes.
    pub diagnostics: Vec<Issue>,
    pub passes: Vec<PassRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixResult {
    /// Rendered text of the final tree generation.
    pub fixed_sql: String,
    /// The fixed original source, when it can be rebuilt through the slice map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_source: Option<String>,
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Issue>,
    pub passes: Vec<PassRecord>,
    /// False when the main phase stopped at its runaway limit.
    pub converged: bool,
    /// True if at least one fix was applied.
    pub changed: bool,
}

impl LintResult {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

impl FixResult {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// Number of main-phase passes the loop ran.
    pub fn main_passes(&self) -> usize {
        self.passes
            .iter()
            .filter(|pass| pass.phase == LintPhase::Main)
            .count()
    }
}

fn has_errors(diagnostics: &[Issue]) -> bool {
    diagnostics
        .iter()
        .any(|issue| issue.severity == Severity::Error)
}
