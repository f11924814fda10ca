//! # Lexer
//!
//! State-driven tokenization over a single multi-pattern DFA.
//!
//! The parser asks for the next token at a byte offset in a *lex mode*: the
//! set of terminals the current parse state can act on. Token selection is:
//!
//! 1. the longest match among the mode's terminals and the extras,
//! 2. otherwise the longest match of any terminal (the parser then recovers),
//! 3. ties go to literals, then to the terminal declared first.
//!
//! Restricting to the mode first is what makes lexing context sensitive: a
//! keyword is only preferred over an identifier where the keyword can occur.
//! Bytes no pattern matches become a [`LexError`], which the parser turns
//! into an `ERROR` token.
//!
//! Lexing is a pure function of (text, offset, mode), so starting at any
//! offset during an incremental reparse gives the same tokens as a full
//! parse would.

pub(crate) mod dfa;

use crate::error::{GrammarError, LexError, LoadError};
use crate::grammar::LoweredGrammar;
use crate::syntax::{Length, Point, Symbol, TextRange};
use crate::table::{ParseTable, TerminalSet};
use dfa::TokenDfa;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::num::NonZeroUsize;

const CACHE_CAPACITY: usize = 64;

/// A token: kind and absolute span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: Symbol,
    pub start: Length,
    pub len: Length,
    /// One past the last byte the lexer examined to produce this token.
    pub examined_end: usize,
}

impl Token {
    #[must_use]
    pub const fn start_byte(&self) -> usize {
        self.start.byte_len()
    }

    #[must_use]
    pub fn end_byte(&self) -> usize {
        self.end().byte_len()
    }

    #[must_use]
    pub fn end(&self) -> Length {
        self.start + self.len
    }

    #[must_use]
    pub fn range(&self) -> TextRange {
        TextRange::at(self.start.bytes, self.len.bytes)
    }

    #[must_use]
    pub const fn start_point(&self) -> Point {
        self.start.extent
    }

    #[must_use]
    pub fn end_point(&self) -> Point {
        self.end().extent
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.symbol.is_end()
    }

    /// Bytes examined past the end of the token.
    #[must_use]
    pub fn lookahead_bytes(&self) -> u32 {
        u32::try_from(self.examined_end.saturating_sub(self.end_byte())).unwrap_or(u32::MAX)
    }
}

/// The next significant token and the extras in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookahead {
    pub trivia: SmallVec<[Token; 2]>,
    pub token: Token,
    /// Lex mode the token was read in.
    pub mode: u16,
}

impl Lookahead {
    /// Same tokens, whatever mode they were read in.
    #[must_use]
    pub fn same_tokens(&self, other: &Self) -> bool {
        self.token == other.token && self.trivia == other.trivia
    }
}

/// Lexical tables of a language, shared by every parse.
#[derive(Debug, Clone)]
pub struct LexTable {
    dfa: TokenDfa,
    /// Terminal produced by each DFA pattern.
    symbols: Vec<Symbol>,
    literal: Vec<bool>,
    extras: TerminalSet,
}

/// Serialized form of a [`LexTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LexTableParts {
    pub dfa: Vec<u8>,
    pub symbols: Vec<Symbol>,
    pub literal: Vec<bool>,
    pub extras: TerminalSet,
}

impl LexTable {
    /// Compile the terminals of a lowered grammar.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::Lexer`] if the automaton cannot be built.
    pub fn build(grammar: &LoweredGrammar) -> Result<Self, GrammarError> {
        let patterns: Vec<&str> = grammar.lexical.iter().map(|rule| rule.regex.as_str()).collect();
        let dfa = TokenDfa::build(&patterns).map_err(|message| GrammarError::Lexer { message })?;
        let mut extras = TerminalSet::with_capacity(grammar.terminal_count);
        for rule in &grammar.lexical {
            if grammar.symbols[rule.symbol.index()].extra {
                extras.insert(rule.symbol.index());
            }
        }
        Ok(Self {
            dfa,
            symbols: grammar.lexical.iter().map(|rule| rule.symbol).collect(),
            literal: grammar.lexical.iter().map(|rule| rule.literal).collect(),
            extras,
        })
    }

    pub(crate) fn to_parts(&self) -> LexTableParts {
        LexTableParts {
            dfa: self.dfa.to_bytes(),
            symbols: self.symbols.clone(),
            literal: self.literal.clone(),
            extras: self.extras.clone(),
        }
    }

    pub(crate) fn from_parts(parts: LexTableParts, terminal_count: usize) -> Result<Self, LoadError> {
        let dfa = TokenDfa::from_bytes(&parts.dfa).map_err(LoadError::Lexer)?;
        if dfa.pattern_count() != parts.symbols.len() || parts.literal.len() != parts.symbols.len() {
            return Err(LoadError::Lexer(format!(
                "automaton has {} patterns, tables describe {}",
                dfa.pattern_count(),
                parts.symbols.len()
            )));
        }
        if let Some(symbol) = parts
            .symbols
            .iter()
            .find(|symbol| symbol.is_end() || symbol.index() >= terminal_count)
        {
            return Err(LoadError::Lexer(format!("pattern produces non-terminal {}", symbol.0)));
        }
        if parts.extras.iter().any(|terminal| terminal >= terminal_count) {
            return Err(LoadError::Lexer("extra is not a terminal".into()));
        }
        Ok(Self {
            dfa,
            symbols: parts.symbols,
            literal: parts.literal,
            extras: parts.extras,
        })
    }

    #[must_use]
    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.extras.contains(symbol.index())
    }

    /// Lex one token at `start`, extras included.
    ///
    /// `valid` is the lex mode's terminal set; `None` accepts every terminal.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] covering the bytes up to the next offset where
    /// some pattern matches.
    pub fn lex(&self, text: &[u8], start: Length, valid: Option<&TerminalSet>) -> Result<Token, LexError> {
        let pos = start.byte_len();
        if pos >= text.len() {
            return Ok(Token {
                symbol: Symbol::END,
                start,
                len: Length::zero(),
                examined_end: text.len() + 1,
            });
        }

        let mut ends = vec![None; self.symbols.len()];
        let examined_end = self.dfa.scan(text, pos, &mut ends);
        let allowed = |pattern: usize| {
            let symbol = self.symbols[pattern];
            valid.is_none_or(|set| set.contains(symbol.index())) || self.extras.contains(symbol.index())
        };
        let chosen = self
            .select(&ends, pos, allowed)
            .or_else(|| self.select(&ends, pos, |_| true));

        match chosen {
            Some((pattern, end)) => Ok(Token {
                symbol: self.symbols[pattern],
                start,
                len: Length::of(&text[pos..end]),
                examined_end,
            }),
            None => Err(LexError {
                offset: pos,
                len: self.unmatched_run(text, pos),
            }),
        }
    }

    /// Best match among the patterns accepted by `filter`: longest first,
    /// then literal, then lowest pattern index.
    fn select(&self, ends: &[Option<usize>], pos: usize, filter: impl Fn(usize) -> bool) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (pattern, end) in ends.iter().enumerate() {
            let Some(end) = *end else { continue };
            if end == pos || !filter(pattern) {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, current_end)) => {
                    end > current_end || (end == current_end && self.literal[pattern] && !self.literal[current])
                }
            };
            if better {
                best = Some((pattern, end));
            }
        }
        best
    }

    /// Length of the run starting at `pos` where no pattern matches.
    fn unmatched_run(&self, text: &[u8], pos: usize) -> usize {
        let mut ends = vec![None; self.symbols.len()];
        let mut end = pos + 1;
        while end < text.len() {
            ends.iter_mut().for_each(|slot| *slot = None);
            self.dfa.scan(text, end, &mut ends);
            if ends.iter().flatten().any(|&match_end| match_end > end) {
                break;
            }
            end += 1;
        }
        end - pos
    }
}

/// Per-parse lexer: a [`LexTable`] over one text with a token cache.
pub struct Lexer<'a> {
    table: &'a LexTable,
    parse_table: &'a ParseTable,
    text: &'a [u8],
    cache: LruCache<(usize, u16), Lookahead>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(table: &'a LexTable, parse_table: &'a ParseTable, text: &'a [u8]) -> Self {
        Self {
            table,
            parse_table,
            text,
            cache: LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub const fn text(&self) -> &'a [u8] {
        self.text
    }

    /// Next significant token at `start` in lex mode `mode`, with the
    /// extras before it.
    ///
    /// Unmatchable bytes come back as an `ERROR` token; the underlying
    /// [`LexError`] is recorded in [`errors`](Self::errors).
    pub fn next_token(&mut self, start: Length, mode: u16) -> Lookahead {
        let key = (start.byte_len(), mode);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let valid = self.parse_table.lex_mode_terminals(mode);
        let mut trivia = SmallVec::new();
        let mut position = start;
        let token = loop {
            let token = match self.table.lex(self.text, position, valid) {
                Ok(token) => token,
                Err(err) => {
                    tracing::trace!(offset = err.offset, len = err.len, "no token matches");
                    if !self.errors.contains(&err) {
                        self.errors.push(err);
                    }
                    let end = (err.offset + err.len).min(self.text.len());
                    Token {
                        symbol: Symbol::ERROR,
                        start: position,
                        len: Length::of(&self.text[err.offset..end]),
                        examined_end: (end + 1).min(self.text.len() + 1),
                    }
                }
            };
            if token.is_end() || !self.table.is_extra(token.symbol) {
                break token;
            }
            position = token.end();
            trivia.push(token);
        };

        let lookahead = Lookahead { trivia, token, mode };
        self.cache.put(key, lookahead.clone());
        lookahead
    }

    /// Lexical errors seen so far, in the order they were first met.
    #[must_use]
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::*;
    use crate::syntax::TextSize;

    fn compile(builder: GrammarBuilder) -> (LoweredGrammar, LexTable, ParseTable) {
        let grammar = lower(&builder.build().unwrap()).unwrap();
        let lex = LexTable::build(&grammar).unwrap();
        let (table, _) = ParseTable::build(&grammar).unwrap();
        (grammar, lex, table)
    }

    fn keywords() -> GrammarBuilder {
        GrammarBuilder::new("kw")
            .rule("program", repeat(sym("statement")))
            .rule(
                "statement",
                choice([seq([lit("var"), sym("identifier"), lit(";")]), seq([sym("identifier"), lit(";")])]),
            )
            .token("identifier", pat("[a-z]+"))
            .extra(pat(r"\s+"))
    }

    fn name(grammar: &LoweredGrammar, token: &Token) -> String {
        grammar.symbol_name(token.symbol).to_string()
    }

    #[test]
    fn test_literal_beats_pattern_on_tie() {
        let (grammar, lex, _) = compile(keywords());
        let token = lex.lex(b"var x;", Length::zero(), None).unwrap();
        assert_eq!(name(&grammar, &token), "var");
        assert_eq!(token.len.byte_len(), 3);
    }

    #[test]
    fn test_longest_match_wins() {
        let (grammar, lex, _) = compile(keywords());
        let token = lex.lex(b"variable;", Length::zero(), None).unwrap();
        assert_eq!(name(&grammar, &token), "identifier");
        assert_eq!(token.len.byte_len(), 8);
    }

    #[test]
    fn test_mode_restricts_keywords() {
        let (grammar, lex, table) = compile(keywords());
        // After `var` only an identifier is valid, so `var` lexes as one.
        let var = grammar.symbols.iter().position(|s| s.name == "var").unwrap() as u16;
        let state = table.actions(crate::syntax::StateId(0), Symbol(var))[0];
        let crate::table::Action::Shift(after_var) = state else { panic!("expected shift") };
        let mut lexer = Lexer::new(&lex, &table, b"var var;");
        let lookahead = lexer.next_token(Length::of(b"var"), table.lex_mode(after_var));
        assert_eq!(lookahead.trivia.len(), 1);
        assert_eq!(name(&grammar, &lookahead.token), "identifier");
        assert_eq!(lookahead.token.start_byte(), 4);
        assert_eq!(lookahead.mode, table.lex_mode(after_var));
    }

    #[test]
    fn test_unmatched_bytes_become_error_token() {
        let (_, lex, table) = compile(keywords());
        let err = lex.lex(b"x@@#y", Length::of(b"x"), None).unwrap_err();
        assert_eq!(err, LexError { offset: 1, len: 3 });

        let mut lexer = Lexer::new(&lex, &table, b"x@@#y");
        let lookahead = lexer.next_token(Length::of(b"x"), table.error_lex_mode());
        assert_eq!(lookahead.token.symbol, Symbol::ERROR);
        assert_eq!(lookahead.token.range(), TextRange::new(TextSize::of(1), TextSize::of(4)));
        assert_eq!(lexer.errors().len(), 1);
    }

    #[test]
    fn test_end_of_input_after_trivia() {
        let (_, lex, table) = compile(keywords());
        let mut lexer = Lexer::new(&lex, &table, b"x;  \n");
        let lookahead = lexer.next_token(Length::of(b"x;"), table.error_lex_mode());
        assert!(lookahead.token.is_end());
        assert_eq!(lookahead.token.start_byte(), 5);
        assert_eq!(lookahead.token.start_point(), Point::new(1, 0));
        assert_eq!(lookahead.trivia.len(), 1);
    }

    #[test]
    fn test_lexing_is_position_independent() {
        let (_, lex, table) = compile(keywords());
        let text = b"var abc; abc;";
        let mut full = Lexer::new(&lex, &table, text);
        let mut tokens = Vec::new();
        let mut position = Length::zero();
        loop {
            let lookahead = full.next_token(position, table.error_lex_mode());
            if lookahead.token.is_end() {
                break;
            }
            position = lookahead.token.end();
            tokens.push(lookahead.token);
        }
        let resumed = tokens[2];
        let mut fresh = Lexer::new(&lex, &table, text);
        let again = fresh.next_token(Length::of(b"var abc"), table.error_lex_mode());
        assert_eq!(again.token, resumed);
    }
}
