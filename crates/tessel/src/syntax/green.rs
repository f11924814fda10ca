use crate::syntax::{FieldId, Length, StateId, Symbol, TextSize};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Immutable, shareable tree node.
///
/// Green nodes know their own kind and length but not their absolute
/// position or their parent, so the same `Arc<GreenNode>` can appear in
/// several tree versions. Leaves (tokens) are green nodes without children.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GreenNode {
    kind: Symbol,
    len: Length,
    children: GreenChildren,
    error_count: u32,
    lookahead_bytes: u32,
    parse_state: StateId,
    /// Lex mode of the token that followed the node when it was reduced.
    next_lex_mode: u16,
    flags: NodeFlags,
}

/// A child slot: relative offset, node, and the field it fills (if any).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GreenChild {
    pub offset: Length,
    pub node: Arc<GreenNode>,
    pub field: Option<FieldId>,
}

/// Children storage optimized for different sizes
///
/// - Empty: leaves and empty productions
/// - One: unary wrappers, very common in precedence chains
/// - Inline: short sequences without a separate allocation
/// - Many: everything else
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
enum GreenChildren {
    Empty,
    One(GreenChild),
    Inline(SmallVec<[GreenChild; 4]>),
    Many(Box<[GreenChild]>),
}

impl GreenChildren {
    const INLINE_LIMIT: usize = 4;

    fn from_vec(mut children: Vec<GreenChild>) -> Self {
        match children.len() {
            0 => Self::Empty,
            1 => match children.pop() {
                Some(child) => Self::One(child),
                None => Self::Empty,
            },
            n if n <= Self::INLINE_LIMIT => Self::Inline(children.into_iter().collect()),
            _ => Self::Many(children.into_boxed_slice()),
        }
    }

    /// Move the child nodes out, leaving `Empty`.
    fn drain_into(&mut self, out: &mut Vec<Arc<GreenNode>>) {
        match std::mem::replace(self, Self::Empty) {
            Self::Empty => {}
            Self::One(child) => out.push(child.node),
            Self::Inline(children) => out.extend(children.into_iter().map(|child| child.node)),
            Self::Many(children) => out.extend(children.into_vec().into_iter().map(|child| child.node)),
        }
    }

    fn as_slice(&self) -> &[GreenChild] {
        match self {
            Self::Empty => &[],
            Self::One(child) => std::slice::from_ref(child),
            Self::Inline(children) => children,
            Self::Many(children) => children,
        }
    }
}

/// Per-node bit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NodeFlags(u8);

impl NodeFlags {
    /// Node was pushed as an extra (trivia or recovered error).
    pub const EXTRA: u8 = 1;
    /// Node overlaps an edit and must not be reused.
    pub const CHANGED: u8 = 1 << 1;
    /// Node was built while several parse versions were alive.
    pub const FRAGILE: u8 = 1 << 2;

    #[must_use]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[must_use]
    pub const fn with(self, flag: u8) -> Self {
        Self(self.0 | flag)
    }

    #[must_use]
    pub const fn without(self, flag: u8) -> Self {
        Self(self.0 & !flag)
    }
}

impl GreenNode {
    /// Create a leaf covering `len` bytes.
    #[must_use]
    pub fn leaf(kind: Symbol, len: Length, parse_state: StateId, lookahead_bytes: u32) -> Self {
        Self {
            kind,
            len,
            children: GreenChildren::Empty,
            error_count: u32::from(kind.is_error()),
            lookahead_bytes: lookahead_bytes.max(1),
            parse_state,
            next_lex_mode: 0,
            flags: NodeFlags::default(),
        }
    }

    /// Create an interior node whose span is the concatenation of its
    /// children.
    pub fn branch<I>(kind: Symbol, children: I, parse_state: StateId) -> Self
    where
        I: IntoIterator<Item = (Arc<GreenNode>, Option<FieldId>)>,
    {
        let mut len = Length::zero();
        let mut error_count = u32::from(kind.is_error());
        let mut lookahead_end = 0u32;
        let mut fragile = false;
        let mut slots = Vec::new();
        for (node, field) in children {
            let node_end = len + node.len;
            lookahead_end = lookahead_end.max(node_end.bytes.into().saturating_add(node.lookahead_bytes));
            error_count = error_count.saturating_add(node.error_count);
            fragile |= node.is_fragile();
            slots.push(GreenChild {
                offset: len,
                node,
                field,
            });
            len = node_end;
        }
        let mut flags = NodeFlags::default();
        if fragile {
            flags = flags.with(NodeFlags::FRAGILE);
        }
        Self {
            kind,
            len,
            children: GreenChildren::from_vec(slots),
            error_count,
            lookahead_bytes: lookahead_end.saturating_sub(len.bytes.into()).max(1),
            parse_state,
            next_lex_mode: 0,
            flags,
        }
    }

    /// Copy of this node with a different span and child list, marked as
    /// changed by an edit.
    #[must_use]
    pub fn edited(&self, len: Length, children: Vec<GreenChild>) -> Self {
        Self {
            kind: self.kind,
            len,
            children: GreenChildren::from_vec(children),
            error_count: self.error_count,
            lookahead_bytes: self.lookahead_bytes,
            parse_state: self.parse_state,
            next_lex_mode: self.next_lex_mode,
            flags: self.flags.with(NodeFlags::CHANGED),
        }
    }

    /// Widen the recorded lookahead so that it reaches `examined_end` bytes
    /// past the node start.
    #[must_use]
    pub fn with_lookahead_end(mut self, examined_end: u32) -> Self {
        let past_end = examined_end.saturating_sub(self.len.bytes.into());
        self.lookahead_bytes = self.lookahead_bytes.max(past_end).max(1);
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: u8) -> Self {
        self.flags = self.flags.with(flag);
        self
    }

    #[must_use]
    pub fn with_parse_state(mut self, state: StateId) -> Self {
        self.parse_state = state;
        self
    }

    #[must_use]
    pub fn with_next_lex_mode(mut self, mode: u16) -> Self {
        self.next_lex_mode = mode;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> Symbol {
        self.kind
    }

    #[must_use]
    pub const fn len(&self) -> Length {
        self.len
    }

    #[must_use]
    pub const fn text_len(&self) -> TextSize {
        self.len.bytes
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len.is_empty()
    }

    #[must_use]
    pub fn children(&self) -> &[GreenChild] {
        self.children.as_slice()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&GreenChild> {
        self.children().get(index)
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.children, GreenChildren::Empty)
    }

    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error_count > 0
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.kind.is_error()
    }

    #[must_use]
    pub const fn lookahead_bytes(&self) -> u32 {
        self.lookahead_bytes
    }

    #[must_use]
    pub const fn parse_state(&self) -> StateId {
        self.parse_state
    }

    /// Lex mode the following token was read in. Reusing the node must read
    /// that token the same way.
    #[must_use]
    pub const fn next_lex_mode(&self) -> u16 {
        self.next_lex_mode
    }

    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_extra(&self) -> bool {
        self.flags.contains(NodeFlags::EXTRA)
    }

    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.flags.contains(NodeFlags::CHANGED)
    }

    #[must_use]
    pub const fn is_fragile(&self) -> bool {
        self.flags.contains(NodeFlags::FRAGILE)
    }

    /// Leftmost leaf of this subtree (the node itself for leaves and empty
    /// interior nodes).
    #[must_use]
    pub fn first_leaf(&self) -> &Self {
        let mut node = self;
        while let Some(first) = node.children().first() {
            node = &first.node;
        }
        node
    }

    /// Index of the child containing `offset` (relative to this node).
    ///
    /// Empty children never contain an offset. Uses binary search over the
    /// child offsets.
    #[must_use]
    pub fn child_position(&self, offset: TextSize) -> Option<usize> {
        let children = self.children();
        let index = children.partition_point(|child| child.offset.bytes + child.node.len.bytes <= offset);
        children
            .get(index)
            .filter(|child| child.offset.bytes <= offset)
            .map(|_| index)
    }

    /// Number of nodes in this subtree, including the node itself.
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children().iter().map(|child| child.node.as_ref()));
        }
        count
    }

    /// Compare kinds and spans of two subtrees, ignoring bookkeeping such as
    /// parse states, lookahead and flags.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if std::ptr::eq(a, b) {
                continue;
            }
            if a.kind != b.kind || a.len != b.len || a.child_count() != b.child_count() {
                return false;
            }
            for (left, right) in a.children().iter().zip(b.children()) {
                if left.offset != right.offset {
                    return false;
                }
                pending.push((left.node.as_ref(), right.node.as_ref()));
            }
        }
        true
    }
}

// Iterative, so that dropping a deeply nested tree cannot overflow the stack.
impl Drop for GreenNode {
    fn drop(&mut self) {
        if self.is_leaf() {
            return;
        }
        let mut pending = Vec::new();
        self.children.drain_into(&mut pending);
        while let Some(node) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                node.children.drain_into(&mut pending);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: u16, text: &[u8]) -> Arc<GreenNode> {
        Arc::new(GreenNode::leaf(Symbol(kind), Length::of(text), StateId(0), 1))
    }

    #[test]
    fn test_branch_accumulates_children() {
        let node = GreenNode::branch(
            Symbol(10),
            [(leaf(1, b"12"), None), (leaf(2, b"+"), None), (leaf(1, b"3"), Some(FieldId(0)))],
            StateId(0),
        );
        assert_eq!(node.text_len(), TextSize::from(4));
        assert_eq!(node.child_count(), 3);
        assert_eq!(node.children()[2].offset.bytes, TextSize::from(3));
        assert_eq!(node.children()[2].field, Some(FieldId(0)));
        assert!(!node.has_error());
    }

    #[test]
    fn test_error_count_propagates() {
        let error = Arc::new(GreenNode::branch(Symbol::ERROR, [(leaf(2, b"+"), None)], StateId::NONE));
        let node = GreenNode::branch(Symbol(10), [(leaf(1, b"1"), None), (error, None)], StateId(0));
        assert_eq!(node.error_count(), 1);
        assert!(node.has_error());
        assert!(!node.is_error());
    }

    #[test]
    fn test_lookahead_reaches_past_last_child() {
        let token = Arc::new(GreenNode::leaf(Symbol(1), Length::of(b"abc"), StateId(0), 4));
        let node = GreenNode::branch(Symbol(10), [(token, None)], StateId(0));
        assert_eq!(node.lookahead_bytes(), 4);
        let widened = node.with_lookahead_end(10);
        assert_eq!(widened.lookahead_bytes(), 7);
    }

    #[test]
    fn test_child_position_skips_empty_children() {
        let empty = Arc::new(GreenNode::branch(Symbol(11), [], StateId(0)));
        let node = GreenNode::branch(
            Symbol(10),
            [(leaf(1, b"ab"), None), (empty, None), (leaf(1, b"cd"), None)],
            StateId(0),
        );
        assert_eq!(node.child_position(TextSize::from(0)), Some(0));
        assert_eq!(node.child_position(TextSize::from(2)), Some(2));
        assert_eq!(node.child_position(TextSize::from(4)), None);
    }

    #[test]
    fn test_fragile_propagates_upwards() {
        let fragile = Arc::new(GreenNode::leaf(Symbol(1), Length::of(b"x"), StateId(0), 1).with_flag(NodeFlags::FRAGILE));
        let node = GreenNode::branch(Symbol(10), [(fragile, None)], StateId(0));
        assert!(node.is_fragile());
        assert!(!node.is_changed());
    }

    #[test]
    fn test_structurally_eq_ignores_bookkeeping() {
        let a = GreenNode::branch(Symbol(10), [(leaf(1, b"1"), None)], StateId(3));
        let b = GreenNode::branch(Symbol(10), [(leaf(1, b"1"), None)], StateId(7));
        let c = GreenNode::branch(Symbol(10), [(leaf(1, b"12"), None)], StateId(3));
        assert!(a.structurally_eq(&b));
        assert!(!a.structurally_eq(&c));
    }

    #[test]
    fn test_first_leaf() {
        let inner = Arc::new(GreenNode::branch(Symbol(11), [(leaf(5, b"x"), None)], StateId(0)));
        let node = GreenNode::branch(Symbol(10), [(inner, None), (leaf(1, b"y"), None)], StateId(0));
        assert_eq!(node.first_leaf().kind(), Symbol(5));
    }
}
