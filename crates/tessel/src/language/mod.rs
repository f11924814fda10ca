//! # Languages
//!
//! A [`Language`] bundles everything needed to parse one grammar: symbol
//! and field metadata, the parse table and the lexer automaton. It is
//! immutable and reference counted, so one instance is shared by any number
//! of parsers and trees across threads.
//!
//! Languages come from [`Language::compile`] at runtime, or from a blob
//! written by [`Language::to_blob`] and read back with
//! [`Language::from_blob`]. Blobs carry an ABI version; loading rejects any
//! blob this runtime cannot read instead of misinterpreting it.

pub mod blob;

use crate::error::{GrammarError, LoadError};
use crate::grammar::{lower, Grammar};
use crate::lexer::LexTable;
use crate::syntax::{FieldId, Symbol};
use crate::table::{ParseTable, SymbolInfo, SymbolKind, TableStats};
use blob::Payload;
use compact_str::CompactString;
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

type NameIndex = HashMap<CompactString, Symbol, ahash::RandomState>;

/// Handle to a compiled language.
#[derive(Clone)]
pub struct Language {
    data: Arc<LanguageData>,
}

struct LanguageData {
    name: CompactString,
    symbols: Vec<SymbolInfo>,
    fields: Vec<CompactString>,
    table: ParseTable,
    lexer: LexTable,
    /// Symbol by name, named symbols taking precedence over anonymous ones.
    by_name: NameIndex,
}

impl Language {
    /// Compile a grammar into a language.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if lowering, table construction or lexer
    /// construction fails.
    pub fn compile(grammar: &Grammar) -> Result<Self, GrammarError> {
        Ok(Self::compile_with_stats(grammar)?.0)
    }

    /// Like [`compile`](Self::compile), also returning table statistics.
    ///
    /// # Errors
    ///
    /// See [`compile`](Self::compile).
    pub fn compile_with_stats(grammar: &Grammar) -> Result<(Self, TableStats), GrammarError> {
        let lowered = lower(grammar)?;
        let (table, stats) = ParseTable::build(&lowered)?;
        let lexer = LexTable::build(&lowered)?;
        tracing::debug!(
            language = %lowered.name,
            symbols = lowered.symbols.len(),
            states = table.state_count(),
            "compiled language"
        );
        let language = Self::assemble(lowered.name, lowered.symbols, lowered.fields, table, lexer);
        Ok((language, stats))
    }

    fn assemble(
        name: CompactString,
        symbols: Vec<SymbolInfo>,
        fields: Vec<CompactString>,
        table: ParseTable,
        lexer: LexTable,
    ) -> Self {
        let mut by_name = NameIndex::with_hasher(ahash::RandomState::new());
        for (index, info) in symbols.iter().enumerate() {
            let symbol = Symbol(index as u16);
            match by_name.get(info.name.as_str()) {
                Some(existing) if symbols[existing.index()].named || !info.named => {}
                _ => {
                    by_name.insert(info.name.clone(), symbol);
                }
            }
        }
        Self {
            data: Arc::new(LanguageData {
                name,
                symbols,
                fields,
                table,
                lexer,
                by_name,
            }),
        }
    }

    /// Copy of this language with its parse table replaced, skipping
    /// validation.
    #[cfg(test)]
    pub(crate) fn with_table(&self, table: ParseTable) -> Self {
        let data = &self.data;
        Self::assemble(
            data.name.clone(),
            data.symbols.clone(),
            data.fields.clone(),
            table,
            data.lexer.clone(),
        )
    }

    /// Load a language from a blob.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the blob is truncated, has the wrong magic
    /// or ABI version, fails its checksum, cannot be decoded, or describes
    /// inconsistent tables.
    pub fn from_blob(bytes: &[u8]) -> Result<Self, LoadError> {
        let payload = blob::decode(bytes)?;
        payload.table.validate().map_err(LoadError::InvalidTable)?;
        if payload.symbols.len() != payload.table.symbol_count() {
            return Err(LoadError::InvalidTable(format!(
                "{} symbols described, table has {}",
                payload.symbols.len(),
                payload.table.symbol_count()
            )));
        }
        let terminal_count = payload.table.terminal_count();
        let lexer = LexTable::from_parts(payload.lexer, terminal_count)?;
        tracing::debug!(language = %payload.name, bytes = bytes.len(), "loaded language blob");
        Ok(Self::assemble(payload.name, payload.symbols, payload.fields, payload.table, lexer))
    }

    /// Serialize this language into a versioned blob.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Encode`] if the payload cannot be serialized.
    pub fn to_blob(&self) -> Result<Vec<u8>, LoadError> {
        let data = &self.data;
        blob::encode(&Payload {
            name: data.name.clone(),
            symbols: data.symbols.clone(),
            fields: data.fields.clone(),
            table: data.table.clone(),
            lexer: data.lexer.to_parts(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.data.name
    }

    #[must_use]
    pub const fn abi_version(&self) -> u32 {
        blob::ABI_VERSION
    }

    /// Number of symbols, not counting the built-in `ERROR` symbol.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.data.symbols.len()
    }

    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.info(symbol).map_or("ERROR", |info| info.name.as_str())
    }

    /// Look up a symbol by name. Named symbols win over anonymous tokens
    /// with the same text.
    #[must_use]
    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        if name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.data.by_name.get(name).copied()
    }

    #[must_use]
    pub fn symbol_is_named(&self, symbol: Symbol) -> bool {
        self.info(symbol).map_or(symbol.is_error(), |info| info.named)
    }

    #[must_use]
    pub fn symbol_is_visible(&self, symbol: Symbol) -> bool {
        self.info(symbol).map_or(symbol.is_error(), |info| info.visible)
    }

    #[must_use]
    pub fn symbol_is_terminal(&self, symbol: Symbol) -> bool {
        symbol.index() < self.data.table.terminal_count()
    }

    #[must_use]
    pub fn symbol_is_extra(&self, symbol: Symbol) -> bool {
        self.info(symbol).is_some_and(|info| info.extra)
    }

    #[must_use]
    pub fn symbol_kind(&self, symbol: Symbol) -> Option<SymbolKind> {
        self.info(symbol).map(|info| info.kind)
    }

    fn info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        if symbol.is_error() {
            return None;
        }
        self.data.symbols.get(symbol.index())
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.data.fields.len()
    }

    #[must_use]
    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.data.fields.get(field.index()).map(CompactString::as_str)
    }

    #[must_use]
    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.data
            .fields
            .iter()
            .position(|field| field == name)
            .map(|index| FieldId(index as u16))
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.data.table.state_count()
    }

    #[must_use]
    pub fn table(&self) -> &ParseTable {
        &self.data.table
    }

    #[must_use]
    pub fn lex_table(&self) -> &LexTable {
        &self.data.lexer
    }

    /// Whether trees of `other` can be reused by parsers of this language.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            || (self.data.name == other.data.name
                && self.data.symbols == other.data.symbols
                && self.data.table == other.data.table)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.data.name)
            .field("symbols", &self.data.symbols.len())
            .field("fields", &self.data.fields.len())
            .field("states", &self.data.table.state_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::*;

    fn language() -> Language {
        let grammar = GrammarBuilder::new("assign")
            .rule(
                "program",
                repeat(seq([field("left", sym("identifier")), lit("="), field("right", sym("number")), lit(";")])),
            )
            .token("identifier", pat("[a-z]+"))
            .token("number", pat("[0-9]+"))
            .extra(pat(r"\s+"))
            .build()
            .unwrap();
        Language::compile(&grammar).unwrap()
    }

    #[test]
    fn test_introspection() {
        let language = language();
        assert_eq!(language.name(), "assign");
        assert_eq!(language.abi_version(), blob::ABI_VERSION);
        let identifier = language.symbol_for_name("identifier").unwrap();
        assert_eq!(language.symbol_name(identifier), "identifier");
        assert!(language.symbol_is_named(identifier));
        assert!(language.symbol_is_terminal(identifier));
        let equals = language.symbol_for_name("=").unwrap();
        assert!(!language.symbol_is_named(equals));
        assert_eq!(language.symbol_for_name("ERROR"), Some(Symbol::ERROR));
        assert_eq!(language.symbol_name(Symbol::ERROR), "ERROR");
        assert!(language.symbol_is_named(Symbol::ERROR));
        assert!(language.symbol_is_visible(Symbol::ERROR));
        assert_eq!(language.symbol_for_name("missing"), None);
    }

    #[test]
    fn test_fields() {
        let language = language();
        assert_eq!(language.field_count(), 2);
        let left = language.field_id_for_name("left").unwrap();
        assert_eq!(language.field_name(left), Some("left"));
        assert_eq!(language.field_id_for_name("middle"), None);
    }

    #[test]
    fn test_blob_round_trip() {
        let language = language();
        let bytes = language.to_blob().unwrap();
        let loaded = Language::from_blob(&bytes).unwrap();
        assert!(loaded.same_as(&language));
        assert_eq!(loaded.state_count(), language.state_count());
        assert_eq!(loaded.symbol_count(), language.symbol_count());
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        let mut bytes = language().to_blob().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            Language::from_blob(&bytes),
            Err(LoadError::ChecksumMismatch { .. })
        ));

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            Language::from_blob(truncated),
            Err(LoadError::SizeMismatch { .. })
        ));
    }
}
