//! # Batch Parsing
//!
//! Parse many independent texts on the rayon thread pool. Every file gets
//! its own [`Parser`]; the [`Language`] is shared read-only between them.

use crate::language::Language;
use crate::parser::{ParseOptions, ParseStats, Parser};
use crate::tree::Tree;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Result of parsing one file of a batch.
#[derive(Debug)]
pub struct FileParseResult {
    pub file_id: String,
    pub tree: Tree,
    /// Set when the parse was cancelled and `tree` is partial.
    pub cancelled: bool,
    pub stats: ParseStats,
    pub duration: Duration,
}

impl FileParseResult {
    /// Whether the file parsed completely and without syntax errors.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.cancelled && !self.tree.has_error()
    }
}

/// A batch of files to parse.
#[derive(Debug, Clone, Default)]
pub struct ParseBatch {
    pub files: Vec<(String, Vec<u8>)>,
}

impl ParseBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file_id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.push((file_id.into(), content.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parse every file of `batch` in parallel. Results are in batch order.
#[must_use]
pub fn parse_batch(language: &Language, batch: &ParseBatch, options: &ParseOptions) -> Vec<FileParseResult> {
    tracing::debug!(files = batch.len(), "parsing batch");
    batch
        .files
        .par_iter()
        .map(|(file_id, content)| {
            let started = Instant::now();
            let mut parser = Parser::with_options(language.clone(), options.clone());
            let (tree, cancelled) = match parser.parse(content, None) {
                Ok(tree) => (tree, false),
                Err(cancelled) => (cancelled.partial, true),
            };
            FileParseResult {
                file_id: file_id.clone(),
                tree,
                cancelled,
                stats: parser.last_stats(),
                duration: started.elapsed(),
            }
        })
        .collect()
}
