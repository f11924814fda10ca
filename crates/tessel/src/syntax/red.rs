use crate::language::Language;
use crate::syntax::{FieldId, GreenNode, Length, Point, Symbol, SyntaxKind, TextRange, TextSize, TreeCursor};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Positioned view of a green node.
///
/// A `SyntaxNode` pairs a shared green node with its absolute start position
/// and a link to the view of its parent. Green nodes never point at their
/// parents, so the parent link lives only in these transient views and is
/// used for navigation, never for ownership of the tree.
#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

struct NodeData {
    green: Arc<GreenNode>,
    parent: Option<SyntaxNode>,
    index: usize,
    start: Length,
    field: Option<FieldId>,
    language: Language,
}

impl Drop for NodeData {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            parent = match Arc::try_unwrap(node.data) {
                Ok(mut data) => data.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl SyntaxNode {
    #[must_use]
    pub fn new_root(green: Arc<GreenNode>, language: Language) -> Self {
        Self {
            data: Arc::new(NodeData {
                green,
                parent: None,
                index: 0,
                start: Length::zero(),
                field: None,
                language,
            }),
        }
    }

    fn new_child(&self, index: usize) -> Option<Self> {
        let slot = self.data.green.child(index)?;
        Some(Self {
            data: Arc::new(NodeData {
                green: slot.node.clone(),
                parent: Some(self.clone()),
                index,
                start: self.data.start + slot.offset,
                field: slot.field,
                language: self.data.language.clone(),
            }),
        })
    }

    #[must_use]
    pub fn green(&self) -> &Arc<GreenNode> {
        &self.data.green
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.data.language
    }

    #[inline]
    #[must_use]
    pub fn kind_id(&self) -> Symbol {
        self.data.green.kind()
    }

    /// Name of this node's kind, as declared in the grammar.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.data.language.symbol_name(self.kind_id())
    }

    /// Typed kind, for languages that provide a [`SyntaxKind`] enum.
    #[must_use]
    pub fn kind_as<K: SyntaxKind>(&self) -> Option<K> {
        K::from_symbol(self.kind_id())
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.data.language.symbol_is_named(self.kind_id())
    }

    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.data.green.is_extra()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.data.green.is_error()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.data.green.has_error()
    }

    /// Whether this node overlaps an edit that has not been reparsed yet.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.data.green.is_changed()
    }

    #[must_use]
    pub fn start_byte(&self) -> usize {
        self.data.start.byte_len()
    }

    #[must_use]
    pub fn end_byte(&self) -> usize {
        (self.data.start + self.data.green.len()).byte_len()
    }

    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    #[inline]
    #[must_use]
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.start.bytes, self.data.green.text_len())
    }

    #[must_use]
    pub fn start_position(&self) -> Point {
        self.data.start.extent
    }

    #[must_use]
    pub fn end_position(&self) -> Point {
        (self.data.start + self.data.green.len()).extent
    }

    pub(crate) fn start_length(&self) -> Length {
        self.data.start
    }

    /// Source text of this node.
    ///
    /// # Errors
    ///
    /// Returns an error if the covered bytes are not valid UTF-8.
    pub fn utf8_text<'a>(&self, source: &'a [u8]) -> Result<&'a str, std::str::Utf8Error> {
        let range = self.byte_range();
        let end = range.end.min(source.len());
        let start = range.start.min(end);
        std::str::from_utf8(&source[start..end])
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data.green.child_count()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<Self> {
        self.new_child(index)
    }

    pub fn children(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.child_count()).filter_map(move |index| self.new_child(index))
    }

    #[must_use]
    pub fn named_child_count(&self) -> usize {
        self.data
            .green
            .children()
            .iter()
            .filter(|slot| self.data.language.symbol_is_named(slot.node.kind()))
            .count()
    }

    #[must_use]
    pub fn named_child(&self, index: usize) -> Option<Self> {
        self.named_children().nth(index)
    }

    pub fn named_children(&self) -> impl Iterator<Item = Self> + '_ {
        self.children().filter(Self::is_named)
    }

    #[must_use]
    pub fn first_child(&self) -> Option<Self> {
        self.new_child(0)
    }

    #[must_use]
    pub fn last_child(&self) -> Option<Self> {
        self.child_count().checked_sub(1).and_then(|index| self.new_child(index))
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.data.parent.clone()
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Self> {
        self.data.parent.as_ref()?.new_child(self.data.index + 1)
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<Self> {
        let index = self.data.index.checked_sub(1)?;
        self.data.parent.as_ref()?.new_child(index)
    }

    #[must_use]
    pub fn next_named_sibling(&self) -> Option<Self> {
        let mut sibling = self.next_sibling();
        while let Some(node) = sibling {
            if node.is_named() {
                return Some(node);
            }
            sibling = node.next_sibling();
        }
        None
    }

    #[must_use]
    pub fn prev_named_sibling(&self) -> Option<Self> {
        let mut sibling = self.prev_sibling();
        while let Some(node) = sibling {
            if node.is_named() {
                return Some(node);
            }
            sibling = node.prev_sibling();
        }
        None
    }

    /// Position of this node among its parent's children.
    #[must_use]
    pub fn index(&self) -> usize {
        self.data.index
    }

    /// Name of the field this node fills in its parent.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.data.field.and_then(|field| self.data.language.field_name(field))
    }

    #[must_use]
    pub fn field_name_for_child(&self, index: usize) -> Option<&str> {
        let field = self.data.green.child(index)?.field?;
        self.data.language.field_name(field)
    }

    /// First child that fills the field `name`.
    #[must_use]
    pub fn child_by_field_name(&self, name: &str) -> Option<Self> {
        self.children_by_field_name(name).next()
    }

    pub fn children_by_field_name<'a>(&'a self, name: &str) -> impl Iterator<Item = Self> + 'a {
        let field = self.data.language.field_id_for_name(name);
        self.data
            .green
            .children()
            .iter()
            .enumerate()
            .filter(move |(_, slot)| field.is_some() && slot.field == field)
            .filter_map(move |(index, _)| self.new_child(index))
    }

    /// Deepest descendant whose span contains `offset`.
    ///
    /// Descends by binary search over each node's child offsets. Returns
    /// `None` when `offset` lies outside this node.
    #[must_use]
    pub fn node_at_offset(&self, offset: usize) -> Option<Self> {
        if !self.text_range().contains(TextSize::of(offset)) {
            return None;
        }
        let mut node = self.clone();
        loop {
            let relative = TextSize::of(offset).saturating_sub(node.data.start.bytes);
            match node.data.green.child_position(relative) {
                Some(index) => match node.new_child(index) {
                    Some(child) => node = child,
                    None => return Some(node),
                },
                None => return Some(node),
            }
        }
    }

    /// Deepest named descendant whose span contains `offset`.
    #[must_use]
    pub fn named_node_at_offset(&self, offset: usize) -> Option<Self> {
        let mut node = self.node_at_offset(offset)?;
        while !node.is_named() {
            node = node.parent()?;
        }
        Some(node)
    }

    /// Smallest descendant whose span covers `start..end`.
    #[must_use]
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Self> {
        if start > end || start < self.start_byte() || end > self.end_byte() {
            return None;
        }
        let mut node = self.clone();
        loop {
            let next = node.children().find(|child| {
                child.start_byte() <= start && end <= child.end_byte() && child.start_byte() < child.end_byte()
            });
            match next {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> impl Iterator<Item = Self> {
        let mut stack = vec![self.clone()];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for index in (0..node.child_count()).rev() {
                if let Some(child) = node.new_child(index) {
                    stack.push(child);
                }
            }
            Some(node)
        })
    }

    #[must_use]
    pub fn walk(&self) -> TreeCursor {
        TreeCursor::new(self.clone())
    }

    /// Same kinds and spans as `other`, recursively.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.data.start == other.data.start && self.data.green.structurally_eq(&other.data.green)
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data.green, &other.data.green) && self.data.start == other.data.start
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind(), self.text_range())
    }
}
