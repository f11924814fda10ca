//! # tessel_p
//!
//! The P language for the `tessel` parsing engine.
//!
//! The grammar in [`grammar`] is compiled by this crate's build script into
//! a versioned language blob, which is embedded in the library and checked
//! again when it is loaded.
//!
//! ```rust
//! use tessel_p::SyntaxKind;
//!
//! let language = tessel_p::load_language().unwrap();
//! let tree = tessel::parse(&language, b"let x = 1;", None);
//! let root = tree.root_node();
//! assert_eq!(root.kind_as::<SyntaxKind>(), Some(SyntaxKind::SourceFile));
//! assert!(!tree.has_error());
//! ```

pub mod grammar;

use std::sync::OnceLock;
use tessel::{Language, LoadError};

include!(concat!(env!("OUT_DIR"), "/kinds.rs"));

/// The compiled P language blob.
pub const LANGUAGE_BLOB: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/p.tslg"));

/// Load the embedded P language.
///
/// # Errors
///
/// Returns a [`LoadError`] if the embedded blob is damaged or was written
/// for a different ABI version than the linked `tessel` runtime.
pub fn load_language() -> Result<Language, LoadError> {
    Language::from_blob(LANGUAGE_BLOB)
}

/// Like [`load_language`], but discards the reason for a failure.
#[must_use]
pub fn try_load_language() -> Option<Language> {
    match load_language() {
        Ok(language) => Some(language),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load the P language");
            None
        }
    }
}

/// Shared P language, loaded once per process.
///
/// # Errors
///
/// See [`load_language`]. A failure is cached and returned on every call.
pub fn language() -> Result<Language, LoadError> {
    static LANGUAGE: OnceLock<Result<Language, LoadError>> = OnceLock::new();
    LANGUAGE.get_or_init(load_language).clone()
}
