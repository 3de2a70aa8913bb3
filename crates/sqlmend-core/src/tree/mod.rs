//! Position-addressable, lossless syntax tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Children are
//! ordered id lists; parents are never stored on a node and are looked up
//! through [`Tree::path_to`] when a caller needs them. Structural edits never
//! mutate a tree in place: [`Tree::splice`] returns a new generation that
//! shares no mutable state with the old one.
//!
//! The round-trip invariant holds for every generation: concatenating the
//! leaf text in document order reproduces the rendered source exactly.

mod builder;
mod edit;
pub mod node_types;

pub use builder::{Segment, TreeBuilder};

use crate::types::Span;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Stable index of a node within a [`Tree`] arena.
///
/// Ids survive edits: a node untouched by a fix keeps its id in the next
/// generation, while removed nodes stop being live.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised while building or editing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("tree builder finished with {open} unclosed node(s)")]
    UnbalancedBuilder { open: usize },

    #[error("finish_node called without a matching start_node")]
    NoOpenNode,

    #[error("node {0} is not part of the current tree generation")]
    StaleNode(NodeId),

    #[error("splice range {start}..{end} is out of bounds for node {parent} with {len} children")]
    SpliceOutOfBounds {
        parent: NodeId,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("cannot edit around a root that is a leaf")]
    LeafRoot,

    #[error("round-trip check failed: expected {expected_len} bytes, tree renders {actual_len} bytes")]
    RoundTrip {
        expected_len: usize,
        actual_len: usize,
    },
}

/// A tree element. Leaves own their text; compound nodes own children and
/// their span is the union of their children's spans.
#[derive(Debug, Clone)]
pub struct Node {
    node_type: Arc<str>,
    span: Span,
    text: Arc<str>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Literal text of a leaf. Empty for compound nodes.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_type(&self, types: &[&str]) -> bool {
        types.iter().any(|t| *t == &*self.node_type)
    }

    pub fn is_unparsable(&self) -> bool {
        &*self.node_type == node_types::UNPARSABLE
    }
}

/// One generation of the syntax tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    live: Vec<bool>,
    root: NodeId,
    generation: u64,
}

/// The text-level effect of one splice, in coordinates of the old generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    /// Region of the old rendered text that was replaced (zero-width for inserts).
    pub span: Span,
    /// Byte length of the text that now occupies that region.
    pub replacement_len: usize,
}

impl TextEdit {
    /// Signed change in total text length.
    pub fn delta(&self) -> isize {
        self.replacement_len as isize - self.span.len() as isize
    }

    /// Applies the edit to `text`, the old generation's rendered text.
    pub fn apply_to(&self, text: &str, inserted: &str) -> Option<String> {
        let head = text.get(..self.span.start)?;
        let tail = text.get(self.span.end..)?;
        Some(format!("{head}{inserted}{tail}"))
    }
}

impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Monotonic counter bumped by every structural edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree's arena lineage.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// True if `id` is reachable from the root in this generation.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.live.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.span_len() == 0
    }

    /// Byte length of the rendered text.
    pub fn span_len(&self) -> usize {
        self.node(self.root).span.len()
    }

    /// Reconstructs the rendered text from the leaves.
    pub fn raw(&self) -> String {
        self.raw_of(self.root)
    }

    /// Reconstructs the text covered by `id`.
    pub fn raw_of(&self, id: NodeId) -> String {
        let mut out = String::with_capacity(self.node(id).span.len());
        for leaf in self.leaves_of(id) {
            out.push_str(self.node(leaf).text());
        }
        out
    }

    /// All leaves of the tree in document order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.leaves_of(self.root)
    }

    /// Leaves under `id` in document order (`id` itself if it is a leaf).
    pub fn leaves_of(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .into_iter()
            .filter(|node| self.node(*node).is_leaf())
            .collect()
    }

    /// `id` followed by all of its descendants, pre-order.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    /// The chain of ids from the root down to `target`, inclusive of both.
    pub fn path_to(&self, target: NodeId) -> Option<Vec<NodeId>> {
        if !self.is_live(target) {
            return None;
        }
        let target_span = self.node(target).span;
        let mut path = vec![self.root];
        if self.find_path(self.root, target, target_span, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_path(&self, current: NodeId, target: NodeId, span: Span, path: &mut Vec<NodeId>) -> bool {
        if current == target {
            return true;
        }
        for child in &self.node(current).children {
            let child_span = self.node(*child).span;
            if child_span.start > span.start || child_span.end < span.end {
                continue;
            }
            path.push(*child);
            if self.find_path(*child, target, span, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Immediate parent of `id`, computed by lookup.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let path = self.path_to(id)?;
        path.len().checked_sub(2).map(|index| path[index])
    }

    /// True if `id` or any of its ancestors is unparsable.
    pub fn is_within_unparsable(&self, id: NodeId) -> bool {
        self.path_to(id)
            .map(|path| path.iter().any(|node| self.node(*node).is_unparsable()))
            .unwrap_or(false)
    }

    /// Verifies the round-trip invariant against `expected`.
    pub fn check_round_trip(&self, expected: &str) -> Result<(), TreeError> {
        let actual = self.raw();
        if actual == expected {
            Ok(())
        } else {
            Err(TreeError::RoundTrip {
                expected_len: expected.len(),
                actual_len: actual.len(),
            })
        }
    }

    /// Replaces `parent`'s children in `range` with freshly allocated copies of
    /// `insert`, returning the next generation and the resulting text edit.
    ///
    /// Removed subtrees stop being live; every other id keeps its meaning.
    pub fn splice(
        &self,
        parent: NodeId,
        range: Range<usize>,
        insert: &[Segment],
    ) -> Result<(Tree, TextEdit), TreeError> {
        if !self.is_live(parent) {
            return Err(TreeError::StaleNode(parent));
        }
        let parent_node = self.node(parent);
        let len = parent_node.children.len();
        if range.start > range.end || range.end > len {
            return Err(TreeError::SpliceOutOfBounds {
                parent,
                start: range.start,
                end: range.end,
                len,
            });
        }

        let old_span = if range.is_empty() {
            let offset = parent_node
                .children
                .get(range.start)
                .map_or(parent_node.span.end, |child| self.node(*child).span.start);
            Span::point(offset)
        } else {
            Span::new(
                self.node(parent_node.children[range.start]).span.start,
                self.node(parent_node.children[range.end - 1]).span.end,
            )
        };

        let mut next = Tree {
            nodes: self.nodes.clone(),
            live: self.live.clone(),
            root: self.root,
            generation: self.generation + 1,
        };

        let removed: Vec<NodeId> = parent_node.children[range.clone()].to_vec();
        for id in removed {
            for node in self.preorder(id) {
                next.live[node.index()] = false;
            }
        }

        let new_ids: Vec<NodeId> = insert
            .iter()
            .map(|segment| next.alloc_segment(segment))
            .collect();
        drop(next.nodes[parent.index()].children.splice(range, new_ids));
        next.recompute_spans();

        let replacement_len = insert.iter().map(|segment| segment.raw().len()).sum();
        Ok((
            next,
            TextEdit {
                span: old_span,
                replacement_len,
            },
        ))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        self.live.push(true);
        id
    }

    fn alloc_segment(&mut self, segment: &Segment) -> NodeId {
        match segment {
            Segment::Leaf { node_type, text } => self.alloc(Node {
                node_type: node_type.clone(),
                span: Span::point(0),
                text: text.clone(),
                children: Vec::new(),
            }),
            Segment::Compound {
                node_type,
                children,
            } => {
                let child_ids = children
                    .iter()
                    .map(|child| self.alloc_segment(child))
                    .collect();
                self.alloc(Node {
                    node_type: node_type.clone(),
                    span: Span::point(0),
                    text: Arc::from(""),
                    children: child_ids,
                })
            }
        }
    }

    fn recompute_spans(&mut self) {
        let root = self.root;
        self.assign_spans(root, 0);
    }

    fn assign_spans(&mut self, id: NodeId, start: usize) -> usize {
        let children = self.nodes[id.index()].children.clone();
        let end = if children.is_empty() {
            start + self.nodes[id.index()].text.len()
        } else {
            children
                .into_iter()
                .fold(start, |offset, child| self.assign_spans(child, offset))
        };
        self.nodes[id.index()].span = Span::new(start, end);
        end
    }

    /// Extracts `id`'s subtree as a detached [`Segment`], e.g. to move it.
    pub fn to_segment(&self, id: NodeId) -> Segment {
        let node = self.node(id);
        if node.is_leaf() {
            Segment::Leaf {
                node_type: node.node_type.clone(),
                text: node.text.clone(),
            }
        } else {
            Segment::Compound {
                node_type: node.node_type.clone(),
                children: node.children.iter().map(|c| self.to_segment(*c)).collect(),
            }
        }
    }

    /// Builds a tree whose root is `segment`.
    pub fn from_segment(segment: &Segment) -> Tree {
        let mut tree = Tree {
            nodes: Vec::new(),
            live: Vec::new(),
            root: NodeId::from_index(0),
            generation: 0,
        };
        tree.root = tree.alloc_segment(segment);
        tree.recompute_spans();
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::from_segment(&Segment::compound(
            node_types::FILE,
            vec![Segment::compound(
                node_types::STATEMENT,
                vec![
                    Segment::leaf(node_types::KEYWORD, "select"),
                    Segment::leaf(node_types::WHITESPACE, "   "),
                    Segment::leaf(node_types::NUMERIC_LITERAL, "1"),
                ],
            )],
        ))
    }

    #[test]
    fn spans_and_raw_round_trip() {
        let tree = sample();
        assert_eq!(tree.raw(), "select   1");
        let statement = tree.node(tree.root()).children()[0];
        assert_eq!(tree.node(statement).span(), Span::new(0, 10));
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(tree.node(leaves[1]).span(), Span::new(6, 9));
        tree.check_round_trip("select   1").unwrap();
        assert!(tree.check_round_trip("select 1").is_err());
    }

    #[test]
    fn path_and_parent_lookup() {
        let tree = sample();
        let statement = tree.node(tree.root()).children()[0];
        let literal = tree.node(statement).children()[2];
        assert_eq!(
            tree.path_to(literal).unwrap(),
            vec![tree.root(), statement, literal]
        );
        assert_eq!(tree.parent_of(literal), Some(statement));
        assert_eq!(tree.parent_of(tree.root()), None);
    }

    #[test]
    fn splice_creates_new_generation_and_preserves_ids() {
        let tree = sample();
        let statement = tree.node(tree.root()).children()[0];
        let whitespace = tree.node(statement).children()[1];
        let literal = tree.node(statement).children()[2];

        let (next, edit) = tree
            .splice(statement, 1..2, &[Segment::leaf(node_types::WHITESPACE, " ")])
            .unwrap();

        assert_eq!(tree.raw(), "select   1");
        assert_eq!(next.raw(), "select 1");
        assert_eq!(next.generation(), tree.generation() + 1);
        assert!(!next.is_live(whitespace));
        assert!(tree.is_live(whitespace));
        assert!(next.is_live(literal));
        assert_eq!(next.node(literal).span(), Span::new(7, 8));
        assert_eq!(edit.span, Span::new(6, 9));
        assert_eq!(edit.replacement_len, 1);
        assert_eq!(edit.delta(), -2);
    }

    #[test]
    fn splice_empty_range_inserts() {
        let tree = sample();
        let statement = tree.node(tree.root()).children()[0];
        let (next, edit) = tree
            .splice(tree.root(), 1..1, &[Segment::leaf(node_types::NEWLINE, "\n")])
            .unwrap();
        assert_eq!(next.raw(), "select   1\n");
        assert_eq!(edit.span, Span::point(10));
        assert!(next.is_live(statement));
    }

    #[test]
    fn splice_rejects_out_of_bounds_and_stale_parents() {
        let tree = sample();
        assert!(matches!(
            tree.splice(tree.root(), 0..5, &[]),
            Err(TreeError::SpliceOutOfBounds { .. })
        ));
        let statement = tree.node(tree.root()).children()[0];
        let (next, _) = tree.splice(tree.root(), 0..1, &[]).unwrap();
        assert_eq!(
            next.splice(statement, 0..0, &[]).unwrap_err(),
            TreeError::StaleNode(statement)
        );
    }
}
