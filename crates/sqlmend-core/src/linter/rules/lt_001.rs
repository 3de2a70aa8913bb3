//! LINT_LT_001: Excess whitespace.
//!
//! Runs of more than one space between two tokens on the same line collapse
//! to a single space. Indentation and whitespace before a comment or line
//! end are left to other rules.

use crate::linter::context::RuleContext;
use crate::linter::fix::{Fix, Violation};
use crate::linter::rule::{LintRule, RuleDescriptor, RuleError};
use crate::tree::{node_types, Segment};
use crate::types::issue_codes;

pub struct ExcessWhitespace;

const DESCRIPTOR: RuleDescriptor = RuleDescriptor::new(
    issue_codes::LINT_LT_001,
    "layout.spacing",
    "Inappropriate spacing between tokens.",
);

impl LintRule for ExcessWhitespace {
    fn descriptor(&self) -> RuleDescriptor {
        DESCRIPTOR
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let segment = ctx.segment();
        if !segment.is_type(&[node_types::WHITESPACE]) || segment.text().len() <= 1 {
            return Ok(Vec::new());
        }

        let starts_line = ctx
            .siblings_pre()
            .last()
            .is_none_or(|prev| prev.is_type(&[node_types::NEWLINE]));
        let ends_line = ctx
            .siblings_post()
            .first()
            .is_none_or(|next| next.is_type(&[node_types::NEWLINE]) || next.is_comment());
        if starts_line || ends_line {
            return Ok(Vec::new());
        }

        Ok(vec![ctx
            .violation("Expected only single space.", &segment)
            .with_fix(Fix::replace(
                &segment,
                vec![Segment::leaf(node_types::WHITESPACE, " ")],
            ))])
    }
}
