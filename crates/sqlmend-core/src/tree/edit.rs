//! Fix application: one [`Fix`] in, one new tree generation out.

use super::{TextEdit, Tree, TreeError};
use crate::linter::{Fix, FixKind};

impl Tree {
    /// Applies `fix` and returns the next generation with the text edit it
    /// caused. The receiver is left untouched.
    ///
    /// Fixes anchored at the root edit the root's children: inserts land at
    /// the start or end of the file, replace and delete swap out everything.
    pub fn apply_fix(&self, fix: &Fix) -> Result<(Tree, TextEdit), TreeError> {
        let anchor = fix.anchor();
        if !self.is_live(anchor) {
            return Err(TreeError::StaleNode(anchor));
        }

        if anchor == self.root() {
            let root = self.node(anchor);
            if root.is_leaf() {
                return Err(TreeError::LeafRoot);
            }
            let len = root.children().len();
            let range = match fix.kind() {
                FixKind::InsertBefore => 0..0,
                FixKind::InsertAfter => len..len,
                FixKind::Replace | FixKind::Delete => 0..len,
            };
            return self.splice(anchor, range, fix.splice_content());
        }

        let parent = self.parent_of(anchor).ok_or(TreeError::StaleNode(anchor))?;
        let index = self
            .node(parent)
            .children()
            .iter()
            .position(|child| *child == anchor)
            .ok_or(TreeError::StaleNode(anchor))?;
        let range = match fix.kind() {
            FixKind::InsertBefore => index..index,
            FixKind::InsertAfter => index + 1..index + 1,
            FixKind::Replace | FixKind::Delete => index..index + 1,
        };
        self.splice(parent, range, fix.splice_content())
    }
}
