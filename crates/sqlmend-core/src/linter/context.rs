//! Per-visit context handed to [`super::LintRule::evaluate`].

use super::fix::Violation;
use crate::query::{NodeRef, Segments};
use crate::slice::SliceMap;
use crate::tree::{NodeId, Tree};
use crate::types::{Dialect, Span};

/// Everything a rule may look at for one visit. Built by the crawler right
/// before the call and dropped right after it.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub tree: &'a Tree,
    pub slices: &'a SliceMap,
    pub dialect: Dialect,
    /// Node being visited.
    pub segment: NodeId,
    /// Ancestors of `segment`, root first.
    pub parent_stack: &'a [NodeId],
    /// Position of `segment` among its parent's children.
    pub segment_idx: usize,
    /// Leaves crawled before `segment`, only for rules that asked for them.
    pub raw_stack: Option<&'a [NodeId]>,
    /// True when the caller will apply fixes.
    pub fix_mode: bool,
    pub(crate) rule_code: &'static str,
}

impl<'a> RuleContext<'a> {
    pub fn segment(&self) -> NodeRef<'a> {
        NodeRef::new(self.tree, self.segment)
    }

    pub fn root(&self) -> NodeRef<'a> {
        NodeRef::new(self.tree, self.tree.root())
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.parent_stack
            .last()
            .map(|id| NodeRef::new(self.tree, *id))
    }

    pub fn parents(&self) -> Segments<'a> {
        Segments::new(self.tree, self.parent_stack.to_vec())
    }

    /// Siblings before the current node, in document order.
    pub fn siblings_pre(&self) -> Segments<'a> {
        match self.parent() {
            Some(parent) => {
                let children = parent.node().children();
                let end = self.segment_idx.min(children.len());
                Segments::new(self.tree, children[..end].to_vec())
            }
            None => Segments::empty(self.tree),
        }
    }

    /// Siblings after the current node, in document order.
    pub fn siblings_post(&self) -> Segments<'a> {
        match self.parent() {
            Some(parent) => {
                let children = parent.node().children();
                let start = (self.segment_idx + 1).min(children.len());
                Segments::new(self.tree, children[start..].to_vec())
            }
            None => Segments::empty(self.tree),
        }
    }

    /// Leaves crawled so far; empty for rules that did not ask for them.
    pub fn raw_stack(&self) -> Segments<'a> {
        Segments::new(self.tree, self.raw_stack.unwrap_or_default().to_vec())
    }

    /// The leaf crawled immediately before the current node.
    pub fn raw_segment_pre(&self) -> Option<NodeRef<'a>> {
        self.raw_stack?
            .last()
            .map(|id| NodeRef::new(self.tree, *id))
    }

    /// True if `span` touches anything other than literal source.
    pub fn is_templated(&self, span: Span) -> bool {
        self.slices
            .slices_touching(span)
            .iter()
            .any(|slice| !slice.is_literal())
    }

    /// Starts a violation for the evaluating rule.
    pub fn violation(&self, description: impl Into<String>, anchor: &NodeRef<'_>) -> Violation {
        Violation::new(self.rule_code, description, anchor)
    }
}
