use crate::syntax::{GreenNode, TextSize};
use std::sync::Arc;

/// Finds subtrees of an edited tree that start at a given offset.
#[derive(Debug, Clone)]
pub(crate) struct ReuseCursor {
    root: Arc<GreenNode>,
}

impl ReuseCursor {
    pub fn new(root: Arc<GreenNode>) -> Self {
        Self { root }
    }

    /// Interior nodes that begin exactly at `offset`, outermost first.
    pub fn candidates(&self, offset: usize) -> Vec<Arc<GreenNode>> {
        let mut found = Vec::new();
        let mut node = &self.root;
        let mut start = 0usize;
        while let Some(index) = offset
            .checked_sub(start)
            .and_then(|relative| node.child_position(TextSize::of(relative)))
        {
            let child = &node.children()[index];
            let child_start = start + child.offset.byte_len();
            if child_start == offset && !child.node.is_leaf() {
                found.push(child.node.clone());
            }
            node = &child.node;
            start = child_start;
        }
        found
    }
}
