//! LINT_LT_002: Trailing whitespace.
//!
//! Uses the raw stack to see the leaf crawled just before each newline, so
//! whitespace is found even when it sits at the end of a statement node and
//! the newline belongs to the file.

use crate::linter::context::RuleContext;
use crate::linter::fix::{Fix, Violation};
use crate::linter::rule::{LintRule, RuleDescriptor, RuleError};
use crate::tree::node_types;
use crate::types::issue_codes;

pub struct TrailingWhitespace;

const DESCRIPTOR: RuleDescriptor = RuleDescriptor::new(
    issue_codes::LINT_LT_002,
    "layout.trailing_whitespace",
    "Trailing whitespace.",
)
.with_raw_stack();

impl LintRule for TrailingWhitespace {
    fn descriptor(&self) -> RuleDescriptor {
        DESCRIPTOR
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let segment = ctx.segment();
        let trailing = if segment.is_type(&[node_types::NEWLINE]) {
            ctx.raw_segment_pre()
                .filter(|prev| prev.is_type(&[node_types::WHITESPACE]))
        } else if segment.is_type(&[node_types::WHITESPACE])
            && segment.span().end == ctx.tree.span_len()
        {
            Some(segment)
        } else {
            None
        };

        Ok(trailing
            .map(|whitespace| {
                ctx.violation("Unnecessary trailing whitespace.", &whitespace)
                    .with_fix(Fix::delete(&whitespace))
            })
            .into_iter()
            .collect())
    }
}
