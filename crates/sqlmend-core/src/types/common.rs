//! Common types shared between the engine, the adapters and the API surface.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A byte range in the rendered SQL string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of SQL string (inclusive)
    pub start: usize,
    /// Byte offset from start of SQL string (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `offset`, used for insertion points.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Half-open overlap. Zero-width spans never overlap anything here; use
    /// [`Span::contains_point_strictly`] for insertion points.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `offset` lies strictly inside the span (not on either boundary).
    pub fn contains_point_strictly(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }
}

/// A diagnostic that is not a lint violation: parse problems, rule crashes,
/// discarded fixes and convergence warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Severity level
    pub severity: Severity,

    /// Machine-readable issue code
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Optional: location in the rendered SQL where the issue occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// Optional: the rule this issue is attributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_code: Option<String>,
}

impl Issue {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, message)
    }

    fn with_severity(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            span: None,
            rule_code: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_rule(mut self, rule_code: impl Into<String>) -> Self {
        self.rule_code = Some(rule_code.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Machine-readable issue codes.
pub mod issue_codes {
    /// A statement could not be parsed and was kept as an unparsable node.
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    /// A rule returned an error or panicked while evaluating.
    pub const RULE_INTERNAL_ERROR: &str = "RULE_INTERNAL_ERROR";
    /// A fix overlapped a region already claimed earlier in the same pass.
    pub const FIX_CONFLICT: &str = "FIX_CONFLICT";
    /// A fix touched templated or block source without opting in.
    pub const TEMPLATE_BOUNDARY: &str = "TEMPLATE_BOUNDARY";
    /// A fix referenced a node that no longer exists in the current tree.
    pub const STALE_FIX_ANCHOR: &str = "STALE_FIX_ANCHOR";
    /// A fix could not be applied to the tree.
    pub const INVALID_FIX: &str = "INVALID_FIX";
    /// The main phase hit its pass budget before reaching zero violations.
    pub const RUNAWAY_LIMIT_EXCEEDED: &str = "RUNAWAY_LIMIT_EXCEEDED";
    /// The templater failed to render the source.
    pub const TEMPLATE_ERROR: &str = "TEMPLATE_ERROR";

    pub const LINT_LT_001: &str = "LT01";
    pub const LINT_LT_002: &str = "LT02";
    pub const LINT_LT_004: &str = "LT04";
    pub const LINT_LT_012: &str = "LT12";
    pub const LINT_CP_001: &str = "CP01";
}
