//! Textual renderings of syntax trees.
//!
//! - [`to_sexp`]: S-expression of the named nodes, with field labels
//! - [`debug_tree`]: one line per node, including anonymous tokens and extras

use crate::syntax::SyntaxNode;
use std::fmt::Write;

/// Render `node` as an S-expression over its named descendants.
///
/// Error nodes are always shown. Anonymous tokens and whitespace are left
/// out, matching the usual tree-sitter test format.
#[must_use]
pub fn to_sexp(node: &SyntaxNode) -> String {
    enum Step {
        Open(SyntaxNode, bool),
        Close,
    }

    let mut out = String::new();
    let mut steps = vec![Step::Open(node.clone(), true)];
    while let Some(step) = steps.pop() {
        let (node, top) = match step {
            Step::Close => {
                out.push(')');
                continue;
            }
            Step::Open(node, top) => (node, top),
        };
        if !out.is_empty() {
            out.push(' ');
        }
        if let Some(field) = node.field_name().filter(|_| !top) {
            out.push_str(field);
            out.push_str(": ");
        }
        out.push('(');
        out.push_str(node.kind());
        steps.push(Step::Close);
        let shown: Vec<SyntaxNode> = node
            .children()
            .filter(|child| child.is_named() || child.is_error())
            .collect();
        steps.extend(shown.into_iter().rev().map(|child| Step::Open(child, false)));
    }
    out
}

/// Render every node on its own line with its byte range.
///
/// When `source` is provided, leaves are followed by their text.
#[must_use]
pub fn debug_tree(node: &SyntaxNode, source: Option<&[u8]>) -> String {
    let mut out = String::new();
    let mut cursor = node.walk();
    loop {
        let current = cursor.node();
        let indent = "  ".repeat(cursor.depth());
        let _ = write!(out, "{indent}");
        if let Some(field) = cursor.field_name() {
            let _ = write!(out, "{field}: ");
        }
        let _ = write!(out, "{}@{}", current.kind(), current.text_range());
        if current.is_extra() {
            out.push_str(" (extra)");
        }
        if current.child_count() == 0 {
            if let Some(source) = source {
                let range = current.byte_range();
                let end = range.end.min(source.len());
                let start = range.start.min(end);
                let _ = write!(out, " {:?}", String::from_utf8_lossy(&source[start..end]));
            }
        }
        out.push('\n');

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}
