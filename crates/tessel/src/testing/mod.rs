//! # Testing Utilities
//!
//! Helpers shared by unit tests, integration tests, benches and fuzz
//! targets:
//!
//! - [`SnapshotTester`] compares S-expression dumps against files on disk
//! - [`check_coverage`] verifies that a tree covers its text without gaps
//! - [`assert_same_structure`] compares two trees and prints both on mismatch
//! - [`TextGenerator`] produces random valid input from a [`Grammar`](crate::grammar::Grammar)
//!   and random edits for incremental tests

pub mod generators;
pub mod snapshot;

pub use generators::*;
pub use snapshot::*;

use crate::syntax::GreenNode;
use crate::tree::Tree;
use std::fmt;

/// A span invariant broken by a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageError {
    /// Start offset of the offending node.
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for CoverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for CoverageError {}

/// Check that the root spans exactly `[0, text_len)` and that the children
/// of every node are contiguous and cover their parent.
///
/// # Errors
///
/// Returns the first violation found in document order.
pub fn check_coverage(tree: &Tree, text_len: usize) -> Result<(), CoverageError> {
    let root = tree.green();
    if root.len().byte_len() != text_len {
        return Err(CoverageError {
            offset: 0,
            message: format!("root spans {} bytes, text has {text_len}", root.len().byte_len()),
        });
    }
    let mut stack: Vec<(&GreenNode, usize)> = vec![(root, 0)];
    while let Some((node, start)) = stack.pop() {
        if node.is_leaf() {
            continue;
        }
        let mut expected = 0usize;
        for child in node.children() {
            let offset = child.offset.byte_len();
            if offset != expected {
                return Err(CoverageError {
                    offset: start + offset,
                    message: format!("child of `{}` starts at +{offset}, expected +{expected}", node.kind()),
                });
            }
            expected = offset + child.node.len().byte_len();
        }
        if expected != node.len().byte_len() {
            return Err(CoverageError {
                offset: start,
                message: format!(
                    "children of `{}` span {expected} bytes, node spans {}",
                    node.kind(),
                    node.len().byte_len()
                ),
            });
        }
        for child in node.children().iter().rev() {
            stack.push((&child.node, start + child.offset.byte_len()));
        }
    }
    Ok(())
}

/// Assert that two trees have the same kinds and spans everywhere.
///
/// # Panics
///
/// Panics with both debug dumps when the trees differ.
pub fn assert_same_structure(actual: &Tree, expected: &Tree, source: &[u8]) {
    assert!(
        actual.structurally_eq(expected),
        "Trees differ\n--- Expected ---\n{}\n--- Actual ---\n{}",
        expected.debug_dump(Some(source)),
        actual.debug_dump(Some(source)),
    );
}
