//! Syntax tree types.
//!
//! Trees come in two layers. [`GreenNode`]s are immutable, reference counted
//! and position independent, so unchanged subtrees are shared between tree
//! versions. [`SyntaxNode`]s are cheap positioned views over them that add
//! absolute spans and parent navigation.

pub mod cursor;
pub mod dump;
pub mod green;
pub mod kind;
pub mod point;
pub mod red;
pub mod text;

pub use cursor::*;
pub use dump::{debug_tree, to_sexp};
pub use green::*;
pub use kind::*;
pub use point::*;
pub use red::*;
pub use text::*;
