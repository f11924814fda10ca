use crate::error::SyntaxError;
use crate::incremental::{self, InputEdit};
use crate::language::Language;
use crate::syntax::{debug_tree, to_sexp, GreenNode, SyntaxNode, TextRange, TreeCursor};
use std::fmt;
use std::sync::Arc;

/// A parsed syntax tree.
///
/// Trees are immutable. Cloning is cheap, and a tree derived from another
/// by [`edit`](Self::edit) or an incremental parse shares every unchanged
/// subtree with it.
#[derive(Clone)]
pub struct Tree {
    root: Arc<GreenNode>,
    language: Language,
}

impl Tree {
    pub(crate) fn new(root: Arc<GreenNode>, language: Language) -> Self {
        Self { root, language }
    }

    #[must_use]
    pub fn root_node(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone(), self.language.clone())
    }

    #[must_use]
    pub fn green(&self) -> &Arc<GreenNode> {
        &self.root
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Translate this tree into the coordinates of the edited text.
    ///
    /// Pass the result as `old_tree` to [`Parser::parse`](crate::Parser::parse)
    /// to reparse incrementally. Several edits can be applied one after the
    /// other before reparsing.
    #[must_use]
    pub fn edit(&self, edit: &InputEdit) -> Self {
        Self::new(incremental::edit_root(&self.root, edit), self.language.clone())
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    /// Outermost error nodes of the tree, in document order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxError> {
        if !self.root.has_error() {
            return Vec::new();
        }
        let mut errors = Vec::new();
        let mut stack = vec![self.root_node()];
        while let Some(node) = stack.pop() {
            if node.is_error() {
                errors.push(SyntaxError::new(
                    node.text_range(),
                    node.start_position(),
                    node.end_position(),
                    self.describe_error(node.green()),
                ));
                continue;
            }
            if node.has_error() {
                stack.extend(node.children().collect::<Vec<_>>().into_iter().rev());
            }
        }
        errors
    }

    fn describe_error(&self, error: &GreenNode) -> String {
        if error.is_leaf() {
            return if error.is_empty() {
                "unexpected end of input".to_string()
            } else {
                "invalid token".to_string()
            };
        }
        let mut stack = vec![error];
        while let Some(node) = stack.pop() {
            if node.is_extra() {
                continue;
            }
            if node.is_leaf() && !node.is_empty() {
                return if node.is_error() {
                    "invalid token".to_string()
                } else if self.language.symbol_is_named(node.kind()) {
                    format!("unexpected {}", self.language.symbol_name(node.kind()))
                } else {
                    format!("unexpected `{}`", self.language.symbol_name(node.kind()))
                };
            }
            stack.extend(node.children().iter().rev().map(|child| child.node.as_ref()));
        }
        "unexpected end of input".to_string()
    }

    /// Byte ranges where the structure of `new` differs from `old`, an
    /// edited version of the tree `new` was reparsed from.
    #[must_use]
    pub fn changed_ranges(old: &Tree, new: &Tree) -> Vec<TextRange> {
        incremental::changed_ranges(old, new)
    }

    /// S-expression of the named nodes.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        to_sexp(&self.root_node())
    }

    /// One line per node, with leaf text when `source` is given.
    #[must_use]
    pub fn debug_dump(&self, source: Option<&[u8]>) -> String {
        debug_tree(&self.root_node(), source)
    }

    #[must_use]
    pub fn walk(&self) -> TreeCursor {
        self.root_node().walk()
    }

    /// Same kinds and spans everywhere.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.root.structurally_eq(&other.root)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language.name())
            .field("sexp", &self.to_sexp())
            .finish()
    }
}
