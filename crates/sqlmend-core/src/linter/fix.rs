//! Fix model and validator.
//!
//! A [`Violation`] carries zero or more [`Fix`]es. Before any of them touch
//! the tree, the [`FixValidator`] checks the whole set against the slice map,
//! the current tree generation and the fixes already accepted in this pass.
//! A violation's fixes are accepted or rejected together.

use crate::query::NodeRef;
use crate::slice::SliceMap;
use crate::tree::{NodeId, Segment, Tree, TreeError};
use crate::types::{issue_codes, Issue, Span};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixKind {
    InsertBefore,
    InsertAfter,
    Replace,
    Delete,
}

/// One tree-surgery operation relative to an anchor node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    kind: FixKind,
    anchor: NodeId,
    anchor_span: Span,
    edit: Vec<Segment>,
    /// Spans the edit content was copied from; they must be template safe too.
    source: Vec<Span>,
    identity: bool,
}

impl Fix {
    fn new(kind: FixKind, anchor: &NodeRef<'_>, edit: Vec<Segment>) -> Self {
        let identity = kind == FixKind::Replace
            && matches!(edit.as_slice(), [only] if *only == anchor.tree().to_segment(anchor.id()));
        Self {
            kind,
            anchor: anchor.id(),
            anchor_span: anchor.span(),
            edit,
            source: Vec::new(),
            identity,
        }
    }

    pub fn insert_before(anchor: &NodeRef<'_>, edit: Vec<Segment>) -> Self {
        Self::new(FixKind::InsertBefore, anchor, edit)
    }

    pub fn insert_after(anchor: &NodeRef<'_>, edit: Vec<Segment>) -> Self {
        Self::new(FixKind::InsertAfter, anchor, edit)
    }

    pub fn replace(anchor: &NodeRef<'_>, edit: Vec<Segment>) -> Self {
        Self::new(FixKind::Replace, anchor, edit)
    }

    pub fn delete(anchor: &NodeRef<'_>) -> Self {
        Self::new(FixKind::Delete, anchor, Vec::new())
    }

    /// Declares that the edit content was taken from `node`.
    pub fn with_source(mut self, node: &NodeRef<'_>) -> Self {
        self.source.push(node.span());
        self
    }

    pub fn kind(&self) -> FixKind {
        self.kind
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Span of the anchor when the fix was created.
    pub fn anchor_span(&self) -> Span {
        self.anchor_span
    }

    pub fn edit(&self) -> &[Segment] {
        &self.edit
    }

    /// Content spliced into the tree (nothing for deletes).
    pub(crate) fn splice_content(&self) -> &[Segment] {
        match self.kind {
            FixKind::Delete => &[],
            _ => &self.edit,
        }
    }

    /// Inserts of nothing and replacements with an identical subtree.
    pub fn is_trivial(&self) -> bool {
        match self.kind {
            FixKind::InsertBefore | FixKind::InsertAfter => {
                self.edit.iter().all(|segment| segment.raw().is_empty())
            }
            FixKind::Replace => self.identity,
            FixKind::Delete => false,
        }
    }

    /// Region of rendered text the fix claims.
    pub fn target_span(&self) -> Span {
        match self.kind {
            FixKind::InsertBefore => Span::point(self.anchor_span.start),
            FixKind::InsertAfter => Span::point(self.anchor_span.end),
            FixKind::Replace | FixKind::Delete => self.anchor_span,
        }
    }
}

/// A rule finding, with the fixes that would resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_code: String,
    pub description: String,
    pub anchor: NodeId,
    /// Rendered span of the anchor.
    pub span: Span,
    #[serde(skip)]
    pub fixes: Vec<Fix>,
    /// Whether the fix set passed validation in the pass that reported it.
    #[serde(default)]
    pub fixable: bool,
}

impl Violation {
    pub fn new(rule_code: impl Into<String>, description: impl Into<String>, anchor: &NodeRef<'_>) -> Self {
        Self {
            rule_code: rule_code.into(),
            description: description.into(),
            anchor: anchor.id(),
            span: anchor.span(),
            fixes: Vec::new(),
            fixable: false,
        }
    }

    /// Adds `fix` unless it is trivial.
    pub fn with_fix(mut self, fix: Fix) -> Self {
        if !fix.is_trivial() {
            self.fixes.push(fix);
        }
        self
    }

    pub fn with_fixes(self, fixes: impl IntoIterator<Item = Fix>) -> Self {
        fixes.into_iter().fold(self, Violation::with_fix)
    }

    pub fn has_fixes(&self) -> bool {
        !self.fixes.is_empty()
    }

    /// Identity used for deduplicating the final report.
    pub fn dedup_key(&self) -> (&str, Span, &str) {
        (&self.rule_code, self.span, &self.description)
    }
}

/// Why a violation's fixes were discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixRejection {
    #[error("fix at {}..{} touches templated or block source", span.start, span.end)]
    TemplateBoundary { span: Span },

    #[error("fix at {}..{} spans more than one template block", span.start, span.end)]
    MultipleBlocks { span: Span },

    #[error("fix anchor {anchor} is stale in the current tree")]
    StaleAnchor { anchor: NodeId },

    #[error("fix at {}..{} overlaps an accepted fix at {}..{}", span.start, span.end, claimed.start, claimed.end)]
    Conflict { span: Span, claimed: Span },

    #[error("fix could not be applied: {0}")]
    Apply(#[from] TreeError),
}

impl FixRejection {
    pub fn issue_code(&self) -> &'static str {
        match self {
            Self::TemplateBoundary { .. } | Self::MultipleBlocks { .. } => {
                issue_codes::TEMPLATE_BOUNDARY
            }
            Self::StaleAnchor { .. } => issue_codes::STALE_FIX_ANCHOR,
            Self::Conflict { .. } => issue_codes::FIX_CONFLICT,
            Self::Apply(_) => issue_codes::INVALID_FIX,
        }
    }

    pub fn to_issue(&self, violation: &Violation) -> Issue {
        Issue::info(
            self.issue_code(),
            format!("{}: {}", violation.description, self),
        )
        .with_span(violation.span)
        .with_rule(violation.rule_code.clone())
    }
}

struct Claim {
    span: Span,
    anchor: NodeId,
}

/// Validates fixes for one pass against one tree generation.
pub struct FixValidator<'a> {
    tree: &'a Tree,
    slices: &'a SliceMap,
    claimed: Vec<Claim>,
}

impl<'a> FixValidator<'a> {
    pub fn new(tree: &'a Tree, slices: &'a SliceMap) -> Self {
        Self {
            tree,
            slices,
            claimed: Vec::new(),
        }
    }

    /// Checks `fixes` without claiming their spans.
    pub fn check(&self, fixes: &[Fix], template_aware: bool) -> Result<(), FixRejection> {
        for fix in fixes {
            self.check_template(fix, template_aware)?;
            self.check_live(fix)?;
            self.check_overlap(fix)?;
        }
        Ok(())
    }

    /// Checks `fixes` and, on success, claims their target spans so later
    /// overlapping fixes in this pass are rejected.
    pub fn claim(&mut self, fixes: &[Fix], template_aware: bool) -> Result<(), FixRejection> {
        self.check(fixes, template_aware)?;
        self.claimed.extend(fixes.iter().map(|fix| Claim {
            span: fix.target_span(),
            anchor: fix.anchor,
        }));
        Ok(())
    }

    fn check_template(&self, fix: &Fix, template_aware: bool) -> Result<(), FixRejection> {
        let target = fix.target_span();
        if self.slices.spans_multiple_blocks(target) {
            return Err(FixRejection::MultipleBlocks { span: target });
        }
        if template_aware {
            return Ok(());
        }
        let spans = [fix.anchor_span, target];
        for span in spans.iter().chain(&fix.source) {
            if !self.slices.edit_is_template_safe(*span) {
                return Err(FixRejection::TemplateBoundary { span: *span });
            }
        }
        Ok(())
    }

    fn check_live(&self, fix: &Fix) -> Result<(), FixRejection> {
        let current = self
            .tree
            .is_live(fix.anchor)
            .then(|| self.tree.node(fix.anchor).span());
        if current == Some(fix.anchor_span) {
            Ok(())
        } else {
            Err(FixRejection::StaleAnchor { anchor: fix.anchor })
        }
    }

    fn check_overlap(&self, fix: &Fix) -> Result<(), FixRejection> {
        let span = fix.target_span();
        match self
            .claimed
            .iter()
            .find(|claim| claim.anchor == fix.anchor || spans_conflict(claim.span, span))
        {
            Some(claim) => Err(FixRejection::Conflict {
                span,
                claimed: claim.span,
            }),
            None => Ok(()),
        }
    }
}

fn spans_conflict(a: Span, b: Span) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (false, false) => a.overlaps(&b),
        (true, true) => a.start == b.start,
        (true, false) => b.contains_point_strictly(a.start),
        (false, true) => a.contains_point_strictly(b.start),
    }
}
