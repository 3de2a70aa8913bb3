//! LINT_LT_004: Space before comma.
//!
//! Commas hug the preceding token. Statements that did not parse are
//! skipped since their commas may not be list separators at all.

use crate::linter::context::RuleContext;
use crate::linter::fix::{Fix, Violation};
use crate::linter::rule::{LintRule, RuleDescriptor, RuleError};
use crate::tree::node_types;
use crate::types::issue_codes;

pub struct SpaceBeforeComma;

const DESCRIPTOR: RuleDescriptor = RuleDescriptor::new(
    issue_codes::LINT_LT_004,
    "layout.commas",
    "Commas should not be preceded by whitespace.",
)
.skip_unparsable();

impl LintRule for SpaceBeforeComma {
    fn descriptor(&self) -> RuleDescriptor {
        DESCRIPTOR
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        if !ctx.segment().is_type(&[node_types::COMMA]) {
            return Ok(Vec::new());
        }
        let before = ctx.siblings_pre().reversed();
        let Some(whitespace) = before.first().filter(|prev| prev.is_type(&[node_types::WHITESPACE])) else {
            return Ok(Vec::new());
        };
        // Leading commas on their own line are a layout choice, not spacing.
        if before
            .get(1)
            .is_none_or(|prev| prev.is_type(&[node_types::NEWLINE]))
        {
            return Ok(Vec::new());
        }

        Ok(vec![ctx
            .violation("Unexpected whitespace before comma.", &whitespace)
            .with_fix(Fix::delete(&whitespace))])
    }
}
