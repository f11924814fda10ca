//! Subcommand implementations.
//!
//! Each command renders its report into a `String` so it can be tested
//! without a terminal; `main` prints it.

use crate::cli::OutputFormat;
use crate::json::tree_to_json;
use crate::ToolError;
use serde::Serialize;
use std::fmt::Write as _;
use std::ops::Range;
use std::path::Path;
use tessel::language::blob::{read_header, BlobHeader};
use tessel::table::TableStats;
use tessel::{InputEdit, Language, ParseStats, Parser, TextRange, Tree};

/// Read a file, attaching the path to any I/O error.
///
/// # Errors
///
/// Returns [`ToolError::Io`] if the file cannot be read.
pub fn read_file(path: &Path) -> Result<Vec<u8>, ToolError> {
    std::fs::read(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The language at `path`, or the built-in P language.
///
/// # Errors
///
/// Returns an I/O error or the [`LoadError`](tessel::LoadError) of the blob.
pub fn load_language(path: Option<&Path>) -> Result<Language, ToolError> {
    match path {
        Some(path) => Ok(Language::from_blob(&read_file(path)?)?),
        None => Ok(tessel_p::language()?),
    }
}

/// Output of `parse`.
#[derive(Debug)]
pub struct ParseReport {
    pub tree: Tree,
    pub rendered: String,
}

/// Parse `source` and render the tree.
///
/// # Errors
///
/// Returns [`ToolError::Json`] if JSON rendering fails.
pub fn parse(language: &Language, source: &[u8], format: OutputFormat) -> Result<ParseReport, ToolError> {
    let tree = tessel::parse(language, source, None);
    let rendered = match format {
        OutputFormat::Sexp => tree.to_sexp(),
        OutputFormat::Json => tree_to_json(&tree, source)?,
        OutputFormat::Dump => tree.debug_dump(Some(source)),
    };
    Ok(ParseReport { tree, rendered })
}

/// Output of `edit`.
#[derive(Debug)]
pub struct EditReport {
    pub new_text: Vec<u8>,
    pub tree: Tree,
    pub stats: ParseStats,
    pub changed: Vec<TextRange>,
    /// Whether the incremental tree matches a fresh parse of the new text.
    pub consistent: bool,
}

impl EditReport {
    #[must_use]
    pub fn render(&self, print_tree: bool) -> String {
        let mut out = String::new();
        let stats = &self.stats;
        let _ = writeln!(out, "tokens shifted: {}", stats.tokens);
        let _ = writeln!(out, "nodes reused:   {}", stats.reused_nodes);
        let _ = writeln!(out, "bytes reused:   {} of {}", stats.reused_bytes, self.new_text.len());
        let _ = writeln!(out, "forks:          {}", stats.forks);
        let _ = writeln!(out, "recoveries:     {}", stats.recoveries);
        let ranges: Vec<String> = self.changed.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "changed ranges: [{}]", ranges.join(", "));
        let _ = writeln!(out, "matches fresh parse: {}", self.consistent);
        if print_tree {
            let _ = writeln!(out, "{}", self.tree.to_sexp());
        }
        out
    }
}

/// Parse `old_text`, replace `range` with `replacement`, and reparse
/// incrementally.
///
/// # Errors
///
/// Returns [`ToolError::InvalidRange`] if the range does not fit the text,
/// or the cancellation of the incremental parse.
pub fn edit(
    language: &Language,
    old_text: &[u8],
    range: Range<usize>,
    replacement: &[u8],
) -> Result<EditReport, ToolError> {
    if range.start > range.end || range.end > old_text.len() {
        return Err(ToolError::InvalidRange {
            start: range.start,
            end: range.end,
            len: old_text.len(),
        });
    }
    let mut parser = Parser::new(language.clone());
    let old_tree = parser.parse(old_text, None)?;
    let (new_text, input_edit) = InputEdit::replace(old_text, range, replacement);
    let edited = old_tree.edit(&input_edit);

    let tree = parser.parse(&new_text, Some(&edited))?;
    let stats = parser.last_stats();
    let changed = Tree::changed_ranges(&edited, &tree);
    let fresh = parser.parse(&new_text, None)?;
    tracing::debug!(
        reused_nodes = stats.reused_nodes,
        reused_bytes = stats.reused_bytes,
        changed = changed.len(),
        "incremental reparse"
    );
    Ok(EditReport {
        consistent: tree.structurally_eq(&fresh),
        new_text,
        tree,
        stats,
        changed,
    })
}

/// Compile the P grammar into a blob.
///
/// # Errors
///
/// Returns the grammar or encoding error.
pub fn compile() -> Result<(Vec<u8>, TableStats), ToolError> {
    let grammar = tessel_p::grammar::grammar()?;
    let (language, stats) = Language::compile_with_stats(&grammar)?;
    let blob = language.to_blob()?;
    tracing::info!(bytes = blob.len(), states = stats.states, "compiled P language");
    Ok((blob, stats))
}

#[must_use]
pub fn render_table_stats(stats: &TableStats) -> String {
    format!(
        "states: {}\nshift/reduce resolved: {}\nreduce/reduce resolved: {}\nconflicts kept: {}\nlex modes: {}\n",
        stats.states, stats.shift_reduce_resolved, stats.reduce_reduce_resolved, stats.conflicts_kept, stats.lex_modes
    )
}

/// Header and table statistics of a blob.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub name: String,
    pub magic: String,
    pub abi_version: u32,
    pub checksum: String,
    pub total_size: u32,
    pub symbols: usize,
    pub fields: usize,
    pub productions: usize,
    pub states: usize,
    pub lex_modes: usize,
    pub conflicts: usize,
}

impl InspectReport {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "language:    {}", self.name);
        let _ = writeln!(out, "magic:       {}", self.magic);
        let _ = writeln!(out, "abi version: {}", self.abi_version);
        let _ = writeln!(out, "checksum:    {}", self.checksum);
        let _ = writeln!(out, "size:        {} bytes", self.total_size);
        let _ = writeln!(out, "symbols:     {}", self.symbols);
        let _ = writeln!(out, "fields:      {}", self.fields);
        let _ = writeln!(out, "productions: {}", self.productions);
        let _ = writeln!(out, "states:      {}", self.states);
        let _ = writeln!(out, "lex modes:   {}", self.lex_modes);
        let _ = writeln!(out, "conflicts:   {}", self.conflicts);
        out
    }
}

/// Check and describe a language blob.
///
/// # Errors
///
/// Returns the [`LoadError`](tessel::LoadError) of a blob that fails to
/// load.
pub fn inspect(bytes: &[u8]) -> Result<InspectReport, ToolError> {
    let BlobHeader {
        magic,
        abi_version,
        checksum,
        total_size,
    } = read_header(bytes)?;
    let language = Language::from_blob(bytes)?;
    let table = language.table();
    Ok(InspectReport {
        name: language.name().to_string(),
        magic: String::from_utf8_lossy(&magic).into_owned(),
        abi_version,
        checksum: format!("{checksum:#010x}"),
        total_size,
        symbols: language.symbol_count(),
        fields: language.field_count(),
        productions: table.productions().len(),
        states: language.state_count(),
        lex_modes: table.lex_mode_count(),
        conflicts: table.conflict_count(),
    })
}
