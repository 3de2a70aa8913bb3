//! LINT_LT_012: Layout end of file.
//!
//! Multi-line files end with exactly one trailing newline. Single-line
//! snippets are left alone. The rule looks at the file as a whole, so it
//! runs once per crawl with the root.
//!
//! Only literal trailing whitespace is rewritten; newlines produced by a
//! template stay, and a literal newline is inserted when none is left.

use crate::linter::context::RuleContext;
use crate::linter::fix::{Fix, Violation};
use crate::linter::rule::{LintRule, RuleDescriptor, RuleError};
use crate::query::NodeRef;
use crate::tree::{node_types, Segment};
use crate::types::{issue_codes, Span};

pub struct LayoutEndOfFile;

const DESCRIPTOR: RuleDescriptor = RuleDescriptor::new(
    issue_codes::LINT_LT_012,
    "layout.end_of_file",
    "File should end with a single trailing newline.",
)
.post_phase()
.no_recurse()
.template_aware();

impl LintRule for LayoutEndOfFile {
    fn descriptor(&self) -> RuleDescriptor {
        DESCRIPTOR
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let root = ctx.segment();
        let children = root.children();
        let content_at = children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.is_whitespace())
            .map(|(index, _)| index)
            .last();
        let Some(content_at) = content_at else {
            return Ok(Vec::new());
        };
        if !root.leaves().any(|leaf| leaf.is_type(&[node_types::NEWLINE])) {
            return Ok(Vec::new());
        }

        let Some(content) = children.get(content_at) else {
            return Ok(Vec::new());
        };
        // Generated trailing text is left to the template.
        let trailing: Vec<NodeRef<'_>> = children
            .iter()
            .skip(content_at + 1)
            .filter(|leaf| !ctx.is_templated(leaf.span()))
            .collect();
        let first_newline = trailing
            .iter()
            .position(|leaf| leaf.is_type(&[node_types::NEWLINE]));
        if first_newline == Some(0) && trailing.len() == 1 {
            return Ok(Vec::new());
        }

        let violation = ctx.violation("Files must end with a single trailing newline.", &content);
        let mut fixes = Vec::with_capacity(trailing.len() + 1);
        if first_newline.is_none() {
            if !ctx
                .slices
                .edit_is_template_safe(Span::point(content.span().end))
            {
                return Ok(vec![violation]);
            }
            fixes.push(Fix::insert_after(
                &content,
                vec![Segment::leaf(node_types::NEWLINE, "\n")],
            ));
        }
        fixes.extend(
            trailing
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != first_newline)
                .map(|(_, leaf)| Fix::delete(leaf)),
        );

        Ok(vec![violation.with_fixes(fixes)])
    }
}
