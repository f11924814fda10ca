//! # Incremental Reparsing
//!
//! Reparsing after an edit happens in two steps:
//!
//! 1. [`Tree::edit`](crate::Tree::edit) translates the old tree into the
//!    coordinates of the new text. Nodes entirely before the edit, and
//!    entirely after it, are shared untouched; every node whose span or
//!    lookahead touches the edited region is copied and marked changed.
//! 2. [`Parser::parse`](crate::Parser::parse) with the edited tree as
//!    `old_tree` reuses unchanged subtrees where the parser reaches them in
//!    the same state, and parses everything else from scratch.
//!
//! Reuse never changes the result: the reparsed tree is structurally equal
//! to a fresh parse of the new text.
//!
//! ## Example
//!
//! ```rust
//! use tessel::grammar::*;
//! use tessel::{InputEdit, Language, Parser};
//!
//! let grammar = GrammarBuilder::new("sum")
//!     .rule("sum", choice([seq([sym("sum"), lit("+"), sym("num")]), sym("num")]))
//!     .token("num", pat("[0-9]+"))
//!     .build()
//!     .unwrap();
//! let language = Language::compile(&grammar).unwrap();
//! let mut parser = Parser::new(language);
//!
//! let old_text = b"1+2+3";
//! let tree = parser.parse(old_text, None).unwrap();
//!
//! let (new_text, edit) = InputEdit::replace(old_text, 4..5, b"42");
//! let edited = tree.edit(&edit);
//! let new_tree = parser.parse(&new_text, Some(&edited)).unwrap();
//! assert_eq!(new_tree.root_node().end_byte(), 6);
//! ```

mod changed;
pub(crate) mod reuse;

pub use changed::changed_ranges;

use crate::syntax::{GreenChild, GreenNode, Length, Point, TextSize};
use std::ops::Range;
use std::sync::Arc;

/// A text edit, in bytes and in row/column points.
///
/// The bytes `start_byte..old_end_byte` of the old text were replaced by
/// `start_byte..new_end_byte` of the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl InputEdit {
    /// Describe replacing `range` of `old_text` with `replacement`.
    ///
    /// `range` is clamped to the text.
    #[must_use]
    pub fn from_replacement(old_text: &[u8], range: Range<usize>, replacement: &[u8]) -> Self {
        let start_byte = range.start.min(old_text.len());
        let old_end_byte = range.end.clamp(start_byte, old_text.len());
        let start = Length::at_offset(old_text, start_byte);
        let old_end = Length::at_offset(old_text, old_end_byte);
        let new_end = start + Length::of(replacement);
        Self {
            start_byte,
            old_end_byte,
            new_end_byte: new_end.byte_len(),
            start_position: start.extent,
            old_end_position: old_end.extent,
            new_end_position: new_end.extent,
        }
    }

    /// Apply a replacement to `old_text`, returning the new text and the
    /// edit describing it.
    #[must_use]
    pub fn replace(old_text: &[u8], range: Range<usize>, replacement: &[u8]) -> (Vec<u8>, Self) {
        let edit = Self::from_replacement(old_text, range, replacement);
        let mut text = Vec::with_capacity(old_text.len() + replacement.len());
        text.extend_from_slice(&old_text[..edit.start_byte]);
        text.extend_from_slice(replacement);
        text.extend_from_slice(&old_text[edit.old_end_byte..]);
        (text, edit)
    }

    fn old_end(&self) -> Length {
        Length::new(TextSize::of(self.old_end_byte), self.old_end_position)
    }

    fn new_end(&self) -> Length {
        Length::new(TextSize::of(self.new_end_byte), self.new_end_position)
    }

    /// Where an old position ends up in the new text. Positions inside the
    /// replaced range move to its new end.
    #[must_use]
    pub fn map(&self, position: Length) -> Length {
        let offset = position.byte_len();
        if offset < self.start_byte {
            position
        } else if offset >= self.old_end_byte {
            self.new_end() + Length::between(self.old_end(), position)
        } else {
            self.new_end()
        }
    }

    /// Change in text length.
    #[must_use]
    pub fn delta(&self) -> isize {
        self.new_end_byte as isize - self.old_end_byte as isize
    }
}

/// Translate `root` into the coordinates of the edited text.
pub(crate) fn edit_root(root: &Arc<GreenNode>, edit: &InputEdit) -> Arc<GreenNode> {
    tracing::trace!(
        start = edit.start_byte,
        old_end = edit.old_end_byte,
        new_end = edit.new_end_byte,
        "editing tree"
    );
    if untouched(root, Length::zero(), edit) {
        return root.clone();
    }

    // Post-order over the touched nodes; untouched subtrees are shared.
    let mut stack = vec![EditFrame::new(root, Length::zero(), Length::zero())];
    while let Some(frame) = stack.last_mut() {
        let node: &Arc<GreenNode> = frame.node;
        if let Some(child) = node.children().get(frame.children.len()) {
            let child_old = frame.old_start + child.offset;
            let child_new = edit.map(child_old);
            if untouched(&child.node, child_old, edit) {
                frame.children.push(GreenChild {
                    offset: Length::between(frame.new_start, child_new),
                    node: child.node.clone(),
                    field: child.field,
                });
            } else {
                stack.push(EditFrame::new(&child.node, child_old, child_new));
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let new_len = Length::between(done.new_start, edit.map(done.old_start + done.node.len()));
        let edited = Arc::new(done.node.edited(new_len, done.children));
        let Some(parent) = stack.last_mut() else {
            return edited;
        };
        let field = parent.node.children()[parent.children.len()].field;
        parent.children.push(GreenChild {
            offset: Length::between(parent.new_start, done.new_start),
            node: edited,
            field,
        });
    }
    root.clone()
}

/// A node being rebuilt: `old_start` is its position in the old text,
/// `new_start` where it begins in the new one.
struct EditFrame<'a> {
    node: &'a Arc<GreenNode>,
    old_start: Length,
    new_start: Length,
    children: Vec<GreenChild>,
}

impl<'a> EditFrame<'a> {
    fn new(node: &'a Arc<GreenNode>, old_start: Length, new_start: Length) -> Self {
        Self {
            node,
            old_start,
            new_start,
            children: Vec::with_capacity(node.child_count()),
        }
    }
}

/// Whether neither the span nor the lookahead of a node starting at
/// `old_start` reaches the edited region.
fn untouched(node: &GreenNode, old_start: Length, edit: &InputEdit) -> bool {
    let start = old_start.byte_len();
    let examined_end = start + node.len().byte_len() + node.lookahead_bytes() as usize;
    examined_end <= edit.start_byte || (start >= edit.old_end_byte && start > edit.start_byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{StateId, Symbol};

    fn leaf(kind: u16, text: &[u8]) -> Arc<GreenNode> {
        Arc::new(GreenNode::leaf(Symbol(kind), Length::of(text), StateId(0), 1))
    }

    /// `(3 (1 "ab") (1 "cd") (1 "ef"))` over "abcdef".
    fn tree() -> Arc<GreenNode> {
        let children = [leaf(1, b"ab"), leaf(1, b"cd"), leaf(1, b"ef")]
            .into_iter()
            .map(|node| (node, None));
        Arc::new(GreenNode::branch(Symbol(3), children, StateId(0)))
    }

    #[test]
    fn test_replacement_positions() {
        let (text, edit) = InputEdit::replace(b"ab\ncd", 3..4, b"xy\nz");
        assert_eq!(text, b"ab\nxy\nzd");
        assert_eq!(edit.start_byte, 3);
        assert_eq!(edit.old_end_byte, 4);
        assert_eq!(edit.new_end_byte, 7);
        assert_eq!(edit.start_position, Point::new(1, 0));
        assert_eq!(edit.old_end_position, Point::new(1, 1));
        assert_eq!(edit.new_end_position, Point::new(2, 1));
        assert_eq!(edit.delta(), 3);
    }

    #[test]
    fn test_range_is_clamped() {
        let edit = InputEdit::from_replacement(b"abc", 2..10, b"");
        assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (2, 3, 2));
    }

    #[test]
    fn test_map_positions() {
        let (_, edit) = InputEdit::replace(b"abcdef", 2..4, b"x");
        let text = b"abcdef";
        assert_eq!(edit.map(Length::at_offset(text, 1)).byte_len(), 1);
        assert_eq!(edit.map(Length::at_offset(text, 3)).byte_len(), 3);
        assert_eq!(edit.map(Length::at_offset(text, 4)).byte_len(), 3);
        assert_eq!(edit.map(Length::at_offset(text, 6)).byte_len(), 5);
    }

    #[test]
    fn test_edit_shares_untouched_nodes() {
        let root = tree();
        let (_, edit) = InputEdit::replace(b"abcdef", 3..4, b"xyz");
        let edited = edit_root(&root, &edit);
        assert_eq!(edited.len().byte_len(), 8);
        assert!(edited.is_changed());

        let children = edited.children();
        assert!(Arc::ptr_eq(&children[0].node, &root.children()[0].node));
        assert!(children[1].node.is_changed());
        assert_eq!(children[1].node.len().byte_len(), 4);
        assert!(Arc::ptr_eq(&children[2].node, &root.children()[2].node));
        assert_eq!(children[2].offset.byte_len(), 6);
    }

    #[test]
    fn test_lookahead_marks_preceding_node() {
        let wide = Arc::new(GreenNode::leaf(Symbol(1), Length::of(b"ab"), StateId(0), 2));
        let children = [wide, leaf(1, b"cd")].into_iter().map(|node| (node, None));
        let root = Arc::new(GreenNode::branch(Symbol(3), children, StateId(0)));
        let (_, edit) = InputEdit::replace(b"abcd", 3..4, b"x");
        let edited = edit_root(&root, &edit);
        assert!(edited.children()[0].node.is_changed());
        assert_eq!(edited.children()[0].node.len().byte_len(), 2);
    }

    #[test]
    fn test_insertion_at_start_keeps_root_at_zero() {
        let root = tree();
        let (_, edit) = InputEdit::replace(b"abcdef", 0..0, b"zz");
        let edited = edit_root(&root, &edit);
        assert_eq!(edited.len().byte_len(), 8);
        assert_eq!(edited.children()[0].offset.byte_len(), 2);
    }
}
