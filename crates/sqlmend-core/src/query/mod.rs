//! Functional query API over a tree generation.
//!
//! Rules navigate with [`NodeRef`] and [`Segments`] instead of hand-written
//! recursion. Every operation is read-only and returns a fresh result set,
//! so queries compose freely:
//!
//! ```
//! use sqlmend_core::query::{predicates as sp, NodeRef};
//! use sqlmend_core::tree::{node_types, Segment, Tree};
//!
//! let tree = Tree::from_segment(&Segment::compound(
//!     node_types::STATEMENT,
//!     vec![
//!         Segment::leaf(node_types::KEYWORD, "select"),
//!         Segment::leaf(node_types::WHITESPACE, " "),
//!         Segment::leaf(node_types::NUMERIC_LITERAL, "1"),
//!     ],
//! ));
//! let root = NodeRef::new(&tree, tree.root());
//! let code = root.children().select(sp::is_code());
//! assert_eq!(code.raw(), "select1");
//! ```

pub mod predicates;

use crate::tree::{node_types, Node, NodeId, Tree};
use crate::types::Span;

/// A read-only handle to one node of a tree generation.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> NodeRef<'t> {
    pub fn new(tree: &'t Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn node(&self) -> &'t Node {
        self.tree.node(self.id)
    }

    pub fn node_type(&self) -> &'t str {
        self.node().node_type()
    }

    pub fn span(&self) -> Span {
        self.node().span()
    }

    /// Leaf text; empty for compound nodes (see [`NodeRef::raw`]).
    pub fn text(&self) -> &'t str {
        self.node().text()
    }

    /// Full text covered by the node.
    pub fn raw(&self) -> String {
        if self.is_leaf() {
            self.text().to_string()
        } else {
            self.tree.raw_of(self.id)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn is_type(&self, types: &[&str]) -> bool {
        self.node().is_type(types)
    }

    pub fn is_unparsable(&self) -> bool {
        self.node().is_unparsable()
    }

    /// Leaves: code unless whitespace or comment. Compounds: any code leaf.
    pub fn is_code(&self) -> bool {
        if self.is_leaf() {
            node_types::is_code(self.node_type())
        } else {
            self.leaves().any(|leaf| leaf.is_code())
        }
    }

    pub fn is_whitespace(&self) -> bool {
        if self.is_leaf() {
            node_types::is_whitespace(self.node_type())
        } else {
            let leaves = self.leaves();
            !leaves.is_empty() && leaves.all(|leaf| leaf.is_whitespace())
        }
    }

    pub fn is_comment(&self) -> bool {
        if self.is_leaf() {
            node_types::is_comment(self.node_type())
        } else {
            let leaves = self.leaves();
            !leaves.is_empty() && leaves.all(|leaf| leaf.is_comment())
        }
    }

    pub fn children(&self) -> Segments<'t> {
        Segments::new(self.tree, self.node().children().to_vec())
    }

    pub fn leaves(&self) -> Segments<'t> {
        Segments::new(self.tree, self.tree.leaves_of(self.id))
    }

    /// Looked up from the root; nodes never store their parent.
    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.tree
            .parent_of(self.id)
            .map(|id| NodeRef::new(self.tree, id))
    }

    /// Ancestors from the root down to (excluding) this node.
    pub fn ancestors(&self) -> Segments<'t> {
        let mut path = self.tree.path_to(self.id).unwrap_or_default();
        path.pop();
        Segments::new(self.tree, path)
    }

    /// Following siblings in document order.
    pub fn siblings_after(&self) -> Segments<'t> {
        self.siblings(|index, position| index > position)
    }

    /// Preceding siblings in document order.
    pub fn siblings_before(&self) -> Segments<'t> {
        self.siblings(|index, position| index < position)
    }

    fn siblings(&self, keep: impl Fn(usize, usize) -> bool) -> Segments<'t> {
        let Some(parent) = self.parent() else {
            return Segments::empty(self.tree);
        };
        let children = parent.node().children();
        let Some(position) = children.iter().position(|child| *child == self.id) else {
            return Segments::empty(self.tree);
        };
        let ids = children
            .iter()
            .enumerate()
            .filter(|(index, _)| keep(*index, position))
            .map(|(_, id)| *id)
            .collect();
        Segments::new(self.tree, ids)
    }

    pub fn as_segments(&self) -> Segments<'t> {
        Segments::new(self.tree, vec![self.id])
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

/// An ordered, independent set of nodes from one tree generation.
#[derive(Debug, Clone)]
pub struct Segments<'t> {
    tree: &'t Tree,
    ids: Vec<NodeId>,
}

impl<'t> Segments<'t> {
    pub fn new(tree: &'t Tree, ids: Vec<NodeId>) -> Self {
        Self { tree, ids }
    }

    pub fn empty(tree: &'t Tree) -> Self {
        Self::new(tree, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NodeRef<'t>> {
        self.ids.get(index).map(|id| NodeRef::new(self.tree, *id))
    }

    pub fn first(&self) -> Option<NodeRef<'t>> {
        self.get(0)
    }

    pub fn last(&self) -> Option<NodeRef<'t>> {
        self.ids.last().map(|id| NodeRef::new(self.tree, *id))
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'t>> + '_ {
        self.ids.iter().map(|id| NodeRef::new(self.tree, *id))
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn spans(&self) -> Vec<Span> {
        self.iter().map(|node| node.span()).collect()
    }

    /// Concatenated text of every member, in order.
    pub fn raw(&self) -> String {
        self.iter().map(|node| node.raw()).collect()
    }

    pub fn select(&self, predicate: impl Fn(&NodeRef<'t>) -> bool) -> Segments<'t> {
        self.filtered(|node| predicate(node))
    }

    /// Leading members for which `predicate` holds.
    pub fn take_while(&self, predicate: impl Fn(&NodeRef<'t>) -> bool) -> Segments<'t> {
        let ids = self
            .iter()
            .take_while(|node| predicate(node))
            .map(|node| node.id)
            .collect();
        Segments::new(self.tree, ids)
    }

    /// Members after the leading run for which `predicate` holds.
    pub fn skip_while(&self, predicate: impl Fn(&NodeRef<'t>) -> bool) -> Segments<'t> {
        let ids = self
            .iter()
            .skip_while(|node| predicate(node))
            .map(|node| node.id)
            .collect();
        Segments::new(self.tree, ids)
    }

    pub fn any(&self, predicate: impl Fn(&NodeRef<'t>) -> bool) -> bool {
        self.iter().any(|node| predicate(&node))
    }

    pub fn all(&self, predicate: impl Fn(&NodeRef<'t>) -> bool) -> bool {
        self.iter().all(|node| predicate(&node))
    }

    /// Children of every member, in order.
    pub fn children(&self) -> Segments<'t> {
        let ids = self
            .iter()
            .flat_map(|node| node.node().children().iter().copied())
            .collect();
        Segments::new(self.tree, ids)
    }

    /// Members and their descendants (pre-order) matching `predicate`.
    ///
    /// Nodes matching `stop` are still tested but their subtrees are not
    /// searched, unless the node is itself a member of this set.
    pub fn recursive_crawl(
        &self,
        predicate: impl Fn(&NodeRef<'t>) -> bool,
        stop: impl Fn(&NodeRef<'t>) -> bool,
    ) -> Segments<'t> {
        let mut out = Vec::new();
        for start in &self.ids {
            let mut stack = vec![*start];
            while let Some(id) = stack.pop() {
                let node = NodeRef::new(self.tree, id);
                if predicate(&node) {
                    out.push(id);
                }
                if id == *start || !stop(&node) {
                    stack.extend(node.node().children().iter().rev().copied());
                }
            }
        }
        Segments::new(self.tree, out)
    }

    pub fn reversed(&self) -> Segments<'t> {
        let mut ids = self.ids.clone();
        ids.reverse();
        Segments::new(self.tree, ids)
    }

    pub fn concat(&self, other: &Segments<'t>) -> Segments<'t> {
        let mut ids = self.ids.clone();
        ids.extend_from_slice(&other.ids);
        Segments::new(self.tree, ids)
    }

    fn filtered(&self, keep: impl Fn(&NodeRef<'t>) -> bool) -> Segments<'t> {
        let ids = self
            .iter()
            .filter(|node| keep(node))
            .map(|node| node.id)
            .collect();
        Segments::new(self.tree, ids)
    }
}
