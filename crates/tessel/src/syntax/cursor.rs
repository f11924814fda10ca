use crate::syntax::SyntaxNode;

/// Stateful walk over a syntax tree.
///
/// The cursor never moves above the node it was created from.
#[derive(Debug, Clone)]
pub struct TreeCursor {
    root: SyntaxNode,
    node: SyntaxNode,
    depth: usize,
}

impl TreeCursor {
    #[must_use]
    pub fn new(root: SyntaxNode) -> Self {
        Self {
            node: root.clone(),
            root,
            depth: 0,
        }
    }

    #[must_use]
    pub fn node(&self) -> &SyntaxNode {
        &self.node
    }

    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        if self.depth == 0 {
            return None;
        }
        self.node.field_name()
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub fn goto_first_child(&mut self) -> bool {
        match self.node.first_child() {
            Some(child) => {
                self.node = child;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    pub fn goto_last_child(&mut self) -> bool {
        match self.node.last_child() {
            Some(child) => {
                self.node = child;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        match self.node.next_sibling() {
            Some(sibling) => {
                self.node = sibling;
                true
            }
            None => false,
        }
    }

    pub fn goto_prev_sibling(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        match self.node.prev_sibling() {
            Some(sibling) => {
                self.node = sibling;
                true
            }
            None => false,
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        match self.node.parent() {
            Some(parent) => {
                self.node = parent;
                self.depth -= 1;
                true
            }
            None => false,
        }
    }

    /// Move to the first child that extends past `byte`, returning its index.
    pub fn goto_first_child_for_byte(&mut self, byte: usize) -> Option<usize> {
        let child = self.node.children().find(|child| child.end_byte() > byte)?;
        let index = child.index();
        self.node = child;
        self.depth += 1;
        Some(index)
    }

    pub fn reset(&mut self) {
        self.node = self.root.clone();
        self.depth = 0;
    }
}
