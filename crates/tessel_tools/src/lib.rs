//! Tessel Tools - command-line utilities for tessel languages
//!
//! The `tessel` binary parses and incrementally reparses P sources, writes
//! the compiled P language blob, and inspects blobs.

pub mod cli;
pub mod commands;
pub mod json;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a `tessel` subcommand.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("cannot read {}", path.display())]
    #[diagnostic(code(tessel::tools::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}", path.display())]
    #[diagnostic(code(tessel::tools::io))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edit range {start}..{end} is outside the {len}-byte input")]
    #[diagnostic(code(tessel::tools::range), help("byte offsets must satisfy start <= end <= file length"))]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] tessel::LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] tessel::GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cancelled(#[from] tessel::ParseCancelled),

    #[error("cannot render JSON")]
    #[diagnostic(code(tessel::tools::json))]
    Json(#[from] serde_json::Error),
}
