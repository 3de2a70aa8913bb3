//! Tree construction.
//!
//! [`TreeBuilder`] assembles a tree from a stream of start/leaf/finish events
//! with spans computed from leaf lengths. [`Segment`] is the detached form
//! used by fixes to describe replacement content.

use super::{Node, NodeId, Tree, TreeError};
use crate::types::Span;
use std::sync::Arc;

/// A detached subtree not yet placed in any arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Leaf {
        node_type: Arc<str>,
        text: Arc<str>,
    },
    Compound {
        node_type: Arc<str>,
        children: Vec<Segment>,
    },
}

impl Segment {
    pub fn leaf(node_type: &str, text: &str) -> Self {
        Segment::Leaf {
            node_type: Arc::from(node_type),
            text: Arc::from(text),
        }
    }

    pub fn compound(node_type: &str, children: Vec<Segment>) -> Self {
        Segment::Compound {
            node_type: Arc::from(node_type),
            children,
        }
    }

    pub fn node_type(&self) -> &str {
        match self {
            Segment::Leaf { node_type, .. } | Segment::Compound { node_type, .. } => node_type,
        }
    }

    /// Concatenated leaf text.
    pub fn raw(&self) -> String {
        match self {
            Segment::Leaf { text, .. } => text.to_string(),
            Segment::Compound { children, .. } => children.iter().map(Segment::raw).collect(),
        }
    }
}

struct OpenNode {
    node_type: Arc<str>,
    start: usize,
    children: Vec<NodeId>,
}

/// Event-driven builder that produces the first generation of a [`Tree`].
///
/// ```
/// use sqlmend_core::tree::{node_types, TreeBuilder};
///
/// let mut builder = TreeBuilder::new(node_types::FILE);
/// builder.start_node(node_types::STATEMENT);
/// builder.leaf(node_types::KEYWORD, "select");
/// builder.leaf(node_types::WHITESPACE, " ");
/// builder.leaf(node_types::NUMERIC_LITERAL, "1");
/// builder.finish_node().unwrap();
/// let tree = builder.finish().unwrap();
/// assert_eq!(tree.raw(), "select 1");
/// ```
pub struct TreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<OpenNode>,
    offset: usize,
}

impl TreeBuilder {
    /// Starts a builder with an open root node of type `root_type`.
    pub fn new(root_type: &str) -> Self {
        Self {
            nodes: Vec::new(),
            stack: vec![OpenNode {
                node_type: Arc::from(root_type),
                start: 0,
                children: Vec::new(),
            }],
            offset: 0,
        }
    }

    /// Current byte offset into the text being built.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn start_node(&mut self, node_type: &str) {
        self.stack.push(OpenNode {
            node_type: Arc::from(node_type),
            start: self.offset,
            children: Vec::new(),
        });
    }

    pub fn leaf(&mut self, node_type: &str, text: &str) -> NodeId {
        let span = Span::new(self.offset, self.offset + text.len());
        self.offset = span.end;
        let id = self.push(Node {
            node_type: Arc::from(node_type),
            span,
            text: Arc::from(text),
            children: Vec::new(),
        });
        self.attach(id);
        id
    }

    /// Closes the innermost open node. The root can only be closed by
    /// [`TreeBuilder::finish`].
    pub fn finish_node(&mut self) -> Result<NodeId, TreeError> {
        if self.stack.len() <= 1 {
            return Err(TreeError::NoOpenNode);
        }
        let open = self.stack.pop().ok_or(TreeError::NoOpenNode)?;
        let id = self.close(open);
        self.attach(id);
        Ok(id)
    }

    /// Number of open nodes below the root.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    pub fn finish(mut self) -> Result<Tree, TreeError> {
        if self.stack.len() != 1 {
            return Err(TreeError::UnbalancedBuilder {
                open: self.stack.len().saturating_sub(1),
            });
        }
        let root = self.stack.pop().ok_or(TreeError::NoOpenNode)?;
        let root = self.close(root);
        let live = vec![true; self.nodes.len()];
        Ok(Tree {
            nodes: self.nodes,
            live,
            root,
            generation: 0,
        })
    }

    fn close(&mut self, open: OpenNode) -> NodeId {
        self.push(Node {
            node_type: open.node_type,
            span: Span::new(open.start, self.offset),
            text: Arc::from(""),
            children: open.children,
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn attach(&mut self, id: NodeId) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(id);
        }
    }
}
