use crate::error::GrammarError;
use crate::grammar::{validate, Rule};
use compact_str::CompactString;
use lasso::{Rodeo, Spur};

/// A validated grammar, ready to be compiled into a [`Language`](crate::Language).
///
/// Rule and token names are interned; declaration order is preserved and
/// determines symbol numbering, so compiling the same grammar twice always
/// produces the same table.
///
/// # Example
///
/// ```rust
/// use tessel::grammar::{lit, pat, prec_left, seq, choice, sym, GrammarBuilder};
///
/// let grammar = GrammarBuilder::new("sum")
///     .rule("sum", choice([seq([sym("sum"), prec_left(1, lit("+")), sym("num")]), sym("num")]))
///     .rule("num", sym("digits"))
///     .token("digits", pat("[0-9]+"))
///     .extra(pat(r"\s+"))
///     .build()
///     .expect("valid grammar");
/// assert_eq!(grammar.start(), "sum");
/// ```
#[derive(Debug, Clone)]
pub struct Grammar {
    name: CompactString,
    interner: Rodeo,
    rules: Vec<(Spur, Rule)>,
    tokens: Vec<(Spur, Rule)>,
    extras: Vec<Rule>,
    start: Spur,
}

impl Grammar {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the start rule.
    #[must_use]
    pub fn start(&self) -> &str {
        self.interner.resolve(&self.start)
    }

    /// Non-terminal rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &Rule)> + '_ {
        self.rules
            .iter()
            .map(|(name, rule)| (self.interner.resolve(name), rule))
    }

    /// Named lexical rules in declaration order.
    pub fn tokens(&self) -> impl Iterator<Item = (&str, &Rule)> + '_ {
        self.tokens
            .iter()
            .map(|(name, rule)| (self.interner.resolve(name), rule))
    }

    #[must_use]
    pub fn extras(&self) -> &[Rule] {
        &self.extras
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        let key = self.interner.get(name)?;
        self.rules.iter().find(|(n, _)| *n == key).map(|(_, rule)| rule)
    }

    #[must_use]
    pub fn token(&self, name: &str) -> Option<&Rule> {
        let key = self.interner.get(name)?;
        self.tokens.iter().find(|(n, _)| *n == key).map(|(_, rule)| rule)
    }

    #[must_use]
    pub fn is_rule(&self, name: &str) -> bool {
        self.rule(name).is_some()
    }

    #[must_use]
    pub fn is_token(&self, name: &str) -> bool {
        self.token(name).is_some()
    }
}

/// Builder for [`Grammar`]s.
///
/// The first rule added becomes the start rule unless
/// [`start`](Self::start) names another one.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    name: CompactString,
    rules: Vec<(CompactString, Rule)>,
    tokens: Vec<(CompactString, Rule)>,
    extras: Vec<Rule>,
    start: Option<CompactString>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            tokens: Vec::new(),
            extras: Vec::new(),
            start: None,
        }
    }

    /// Add a non-terminal rule.
    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, rule: Rule) -> Self {
        self.rules.push((name.into(), rule));
        self
    }

    /// Add a named lexical rule. The rule must not reference other rules.
    #[must_use]
    pub fn token(mut self, name: impl Into<CompactString>, rule: Rule) -> Self {
        self.tokens.push((name.into(), rule));
        self
    }

    /// Add trivia that may appear between any two tokens.
    #[must_use]
    pub fn extra(mut self, rule: Rule) -> Self {
        self.extras.push(rule);
        self
    }

    #[must_use]
    pub fn start(mut self, name: impl Into<CompactString>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Validate and build the grammar.
    ///
    /// # Errors
    ///
    /// Returns the first [`GrammarError`] found, checking names, references,
    /// token patterns, reachability and precedence declarations in that
    /// order.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let mut interner = Rodeo::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        let mut tokens = Vec::with_capacity(self.tokens.len());

        for (name, rule) in self.rules {
            let key = interner.get_or_intern(name.as_str());
            if rules.iter().any(|(k, _)| *k == key) {
                return Err(GrammarError::DuplicateRule { name });
            }
            rules.push((key, rule));
        }
        for (name, rule) in self.tokens {
            let key = interner.get_or_intern(name.as_str());
            if rules.iter().chain(tokens.iter()).any(|(k, _)| *k == key) {
                return Err(GrammarError::DuplicateRule { name });
            }
            tokens.push((key, rule));
        }

        let start = match self.start.as_deref().or_else(|| {
            rules.first().map(|(key, _)| interner.resolve(key))
        }) {
            Some(name) => interner.get(name).filter(|key| rules.iter().any(|(k, _)| k == key)),
            None => None,
        };
        let Some(start) = start else {
            return Err(GrammarError::MissingStart { grammar: self.name });
        };

        let grammar = Grammar {
            name: self.name,
            interner,
            rules,
            tokens,
            extras: self.extras,
            start,
        };
        validate::validate(&grammar)?;
        tracing::debug!(
            grammar = %grammar.name,
            rules = grammar.rules.len(),
            tokens = grammar.tokens.len(),
            extras = grammar.extras.len(),
            "grammar built"
        );
        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{lit, pat, seq, sym};

    #[test]
    fn test_first_rule_is_default_start() {
        let grammar = GrammarBuilder::new("t")
            .rule("a", seq([lit("x"), sym("b")]))
            .rule("b", lit("y"))
            .build()
            .unwrap();
        assert_eq!(grammar.start(), "a");
        assert_eq!(grammar.rules().count(), 2);
    }

    #[test]
    fn test_explicit_start_must_be_a_rule() {
        let err = GrammarBuilder::new("t")
            .rule("a", lit("x"))
            .token("id", pat("[a-z]+"))
            .start("id")
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::MissingStart { .. }));
    }

    #[test]
    fn test_empty_grammar_has_no_start() {
        let err = GrammarBuilder::new("t").build().unwrap_err();
        assert_eq!(err, GrammarError::MissingStart { grammar: "t".into() });
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = GrammarBuilder::new("t")
            .rule("a", sym("a2"))
            .rule("a2", lit("x"))
            .token("a2", lit("y"))
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { name: "a2".into() });
    }
}
