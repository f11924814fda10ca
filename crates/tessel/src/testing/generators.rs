//! # Input Generators
//!
//! [`TextGenerator`] walks a [`Grammar`] and emits random text the grammar
//! accepts. Literals are written as they are; regular-expression tokens
//! need sample texts registered with [`TextGenerator::sample`], keyed by
//! token name or by pattern source.
//!
//! ```rust
//! use tessel::grammar::*;
//! use tessel::testing::{GeneratorConfig, TextGenerator};
//!
//! let grammar = GrammarBuilder::new("sum")
//!     .rule("sum", choice([seq([sym("sum"), lit("+"), sym("num")]), sym("num")]))
//!     .token("num", pat("[0-9]+"))
//!     .extra(pat(r"\s+"))
//!     .build()
//!     .unwrap();
//! let generator = TextGenerator::new(&grammar, GeneratorConfig::default().with_seed(7))
//!     .sample("num", ["1", "42"]);
//! let text = generator.generate().unwrap();
//! assert!(!text.is_empty());
//! ```

use crate::grammar::{Grammar, Rule};
use compact_str::CompactString;
use hashbrown::HashMap;
use std::cell::Cell;
use std::ops::Range;
use thiserror::Error;

/// Configuration for grammar-based input generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Depth after which choices prefer alternatives without rule references
    /// and repetitions stop.
    pub max_depth: usize,
    /// Maximum number of repetitions for `repeat` and `repeat1`
    pub max_repetitions: usize,
    /// Probability of taking optional elements (0.0 to 1.0)
    pub optional_probability: f64,
    /// Text written between consecutive tokens
    pub separator: CompactString,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_repetitions: 4,
            optional_probability: 0.5,
            separator: CompactString::const_new(" "),
            seed: 0x853c_49e6_748f_ea9b,
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("no sample text registered for pattern `{0}`")]
    MissingSample(CompactString),
    #[error("symbol `{0}` is not defined")]
    UndefinedSymbol(CompactString),
    #[error("expansion did not terminate within {0} levels")]
    TooDeep(usize),
}

/// Generator of random valid input for a grammar.
pub struct TextGenerator<'g> {
    grammar: &'g Grammar,
    config: GeneratorConfig,
    samples: HashMap<CompactString, Vec<CompactString>, ahash::RandomState>,
    rng: Cell<SimpleRng>,
}

impl<'g> TextGenerator<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar, config: GeneratorConfig) -> Self {
        let rng = Cell::new(SimpleRng::with_seed(config.seed));
        Self {
            grammar,
            config,
            samples: HashMap::with_hasher(ahash::RandomState::new()),
            rng,
        }
    }

    /// Register sample texts for a token name or a pattern source.
    #[must_use]
    pub fn sample<I, S>(mut self, key: &str, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.samples
            .entry(CompactString::from(key))
            .or_default()
            .extend(texts.into_iter().map(Into::into));
        self
    }

    /// Generate one text starting from the start rule.
    ///
    /// # Errors
    ///
    /// Fails if a pattern token has no sample or the expansion keeps
    /// recursing past four times the configured depth.
    pub fn generate(&self) -> Result<String, GenerateError> {
        let mut out = Out::default();
        self.expand_symbol(self.grammar.start(), 0, &mut out)?;
        Ok(out.text)
    }

    /// A random edit of `text`: a byte range to replace and its replacement,
    /// drawn from the registered samples and the grammar's literals.
    pub fn random_edit(&self, text: &[u8]) -> (Range<usize>, Vec<u8>) {
        let len = text.len();
        let start = if len == 0 { 0 } else { self.below(len + 1) };
        let end = (start + self.below(4)).min(len);
        let replacement = match self.below(3) {
            0 => Vec::new(),
            _ => {
                let pool = self.fragments();
                if pool.is_empty() {
                    self.config.separator.as_bytes().to_vec()
                } else {
                    pool[self.below(pool.len())].as_bytes().to_vec()
                }
            }
        };
        (start..end, replacement)
    }

    fn fragments(&self) -> Vec<CompactString> {
        let mut pool: Vec<CompactString> = Vec::new();
        let mut keys: Vec<&CompactString> = self.samples.keys().collect();
        keys.sort();
        for key in keys {
            pool.extend(self.samples[key].iter().cloned());
        }
        let mut literals = Vec::new();
        for (_, rule) in self.grammar.rules() {
            collect_literals(rule, &mut literals);
        }
        pool.extend(literals);
        pool.push(self.config.separator.clone());
        pool
    }

    fn expand_symbol(&self, name: &str, depth: usize, out: &mut Out) -> Result<(), GenerateError> {
        if let Some(rule) = self.grammar.rule(name) {
            return self.expand(rule, depth + 1, out);
        }
        if let Some(rule) = self.grammar.token(name) {
            return self.emit_token(name, rule, out);
        }
        Err(GenerateError::UndefinedSymbol(name.into()))
    }

    fn expand(&self, rule: &Rule, depth: usize, out: &mut Out) -> Result<(), GenerateError> {
        let limit = self.config.max_depth * 4;
        if depth > limit {
            return Err(GenerateError::TooDeep(limit));
        }
        let shallow = depth >= self.config.max_depth;
        match rule {
            Rule::Blank => Ok(()),
            Rule::Symbol(name) => self.expand_symbol(name, depth, out),
            Rule::Literal(text) => {
                out.token(text, &self.config.separator);
                Ok(())
            }
            Rule::Pattern(pattern) => {
                let text = self.pick(pattern)?;
                out.token(&text, &self.config.separator);
                Ok(())
            }
            Rule::Token(inner) => {
                let mut joined = String::new();
                self.lexeme(inner, &mut joined)?;
                out.token(&joined, &self.config.separator);
                Ok(())
            }
            Rule::Seq(items) => items.iter().try_for_each(|item| self.expand(item, depth, out)),
            Rule::Choice(alternatives) if alternatives.is_empty() => Ok(()),
            Rule::Choice(alternatives) => {
                let index = if shallow {
                    alternatives
                        .iter()
                        .position(|alt| !self.references_rule(alt))
                        .unwrap_or_else(|| self.below(alternatives.len()))
                } else {
                    self.below(alternatives.len())
                };
                self.expand(&alternatives[index], depth, out)
            }
            Rule::Optional(inner) => {
                if !shallow && self.next_f64() < self.config.optional_probability {
                    self.expand(inner, depth, out)?;
                }
                Ok(())
            }
            Rule::Repeat(inner) | Rule::Repeat1(inner) => {
                let min = usize::from(matches!(rule, Rule::Repeat1(_)));
                let count = if shallow {
                    min
                } else {
                    min + self.below(self.config.max_repetitions.saturating_sub(min) + 1)
                };
                (0..count).try_for_each(|_| self.expand(inner, depth, out))
            }
            Rule::Field { rule, .. } | Rule::Prec { rule, .. } => self.expand(rule, depth, out),
        }
    }

    fn emit_token(&self, name: &str, rule: &Rule, out: &mut Out) -> Result<(), GenerateError> {
        let text = match self.samples.get(name) {
            Some(texts) if !texts.is_empty() => texts[self.below(texts.len())].to_string(),
            _ => {
                let mut joined = String::new();
                self.lexeme(rule, &mut joined)?;
                joined
            }
        };
        out.token(&text, &self.config.separator);
        Ok(())
    }

    /// Text of a lexical rule, without separators.
    fn lexeme(&self, rule: &Rule, out: &mut String) -> Result<(), GenerateError> {
        match rule {
            Rule::Blank => Ok(()),
            Rule::Literal(text) => {
                out.push_str(text);
                Ok(())
            }
            Rule::Pattern(pattern) => {
                out.push_str(&self.pick(pattern)?);
                Ok(())
            }
            Rule::Symbol(name) => match self.grammar.token(name) {
                Some(inner) => self.lexeme(inner, out),
                None => Err(GenerateError::UndefinedSymbol(name.clone())),
            },
            Rule::Seq(items) => items.iter().try_for_each(|item| self.lexeme(item, out)),
            Rule::Choice(alternatives) if alternatives.is_empty() => Ok(()),
            Rule::Choice(alternatives) => self.lexeme(&alternatives[self.below(alternatives.len())], out),
            Rule::Optional(_) | Rule::Repeat(_) => Ok(()),
            Rule::Repeat1(inner) | Rule::Token(inner) => self.lexeme(inner, out),
            Rule::Field { rule, .. } | Rule::Prec { rule, .. } => self.lexeme(rule, out),
        }
    }

    fn pick(&self, pattern: &str) -> Result<CompactString, GenerateError> {
        match self.samples.get(pattern) {
            Some(texts) if !texts.is_empty() => Ok(texts[self.below(texts.len())].clone()),
            _ => Err(GenerateError::MissingSample(pattern.into())),
        }
    }

    fn references_rule(&self, rule: &Rule) -> bool {
        match rule {
            Rule::Symbol(name) => self.grammar.is_rule(name),
            Rule::Seq(items) | Rule::Choice(items) => items.iter().any(|item| self.references_rule(item)),
            Rule::Repeat1(inner) => self.references_rule(inner),
            Rule::Field { rule, .. } | Rule::Prec { rule, .. } => self.references_rule(rule),
            Rule::Blank
            | Rule::Literal(_)
            | Rule::Pattern(_)
            | Rule::Token(_)
            | Rule::Repeat(_)
            | Rule::Optional(_) => false,
        }
    }

    fn below(&self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }

    fn next_u64(&self) -> u64 {
        let mut rng = self.rng.get();
        let value = rng.next_u64();
        self.rng.set(rng);
        value
    }

    fn next_f64(&self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }
}

fn collect_literals(rule: &Rule, out: &mut Vec<CompactString>) {
    match rule {
        Rule::Literal(text) => {
            if !out.contains(text) {
                out.push(text.clone());
            }
        }
        Rule::Seq(items) | Rule::Choice(items) => items.iter().for_each(|item| collect_literals(item, out)),
        Rule::Repeat(inner) | Rule::Repeat1(inner) | Rule::Optional(inner) | Rule::Token(inner) => {
            collect_literals(inner, out);
        }
        Rule::Field { rule, .. } | Rule::Prec { rule, .. } => collect_literals(rule, out),
        Rule::Blank | Rule::Symbol(_) | Rule::Pattern(_) => {}
    }
}

#[derive(Default)]
struct Out {
    text: String,
}

impl Out {
    fn token(&mut self, text: &str, separator: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str(separator);
        }
        self.text.push_str(text);
    }
}

/// XorShift generator for reproducible inputs
#[derive(Debug, Clone, Copy)]
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn with_seed(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}
