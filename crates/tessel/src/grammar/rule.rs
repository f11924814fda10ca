//! Grammar rule expressions and the combinators that build them.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Associativity used to break ties between equal precedence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assoc {
    /// Prefer reducing: `a + b + c` groups as `(a + b) + c`.
    Left,
    /// Prefer shifting: `a = b = c` groups as `a = (b = c)`.
    Right,
    /// Chaining is a syntax error.
    NonAssoc,
    /// No preference; conflicts at equal levels are kept.
    None,
}

/// A precedence level with its associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Precedence {
    pub level: i32,
    pub assoc: Assoc,
}

impl Precedence {
    #[must_use]
    pub const fn new(level: i32, assoc: Assoc) -> Self {
        Self { level, assoc }
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.assoc {
            Assoc::Left => write!(f, "prec.left({})", self.level),
            Assoc::Right => write!(f, "prec.right({})", self.level),
            Assoc::NonAssoc => write!(f, "prec.nonassoc({})", self.level),
            Assoc::None => write!(f, "prec({})", self.level),
        }
    }
}

/// Grammar rule expression
///
/// Rules are trees of combinators. Anonymous tokens are written inline with
/// [`Rule::Literal`] and [`Rule::Pattern`]; named tokens and non-terminals
/// are referenced by name with [`Rule::Symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Matches the empty string
    Blank,
    /// Reference to a named rule or token
    Symbol(CompactString),
    /// Exact text, an anonymous token
    Literal(CompactString),
    /// Regular expression, an anonymous token
    Pattern(CompactString),
    /// All rules in order
    Seq(Vec<Rule>),
    /// Any one of the rules
    Choice(Vec<Rule>),
    /// Zero or more repetitions
    Repeat(Box<Rule>),
    /// One or more repetitions
    Repeat1(Box<Rule>),
    /// Zero or one occurrence
    Optional(Box<Rule>),
    /// Label the nodes produced by `rule` with a field name
    Field { name: CompactString, rule: Box<Rule> },
    /// Attach a precedence to every alternative of `rule`, or declare the
    /// precedence of a terminal when `rule` is a single token
    Prec { precedence: Precedence, rule: Box<Rule> },
    /// Collapse a lexical rule into a single token
    Token(Box<Rule>),
}

impl Rule {
    /// Whether this rule is a single token reference that precedence can be
    /// declared on.
    pub(crate) fn is_token_like(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Pattern(_) | Self::Token(_))
    }
}

/// Reference a rule or named token.
pub fn sym(name: impl Into<CompactString>) -> Rule {
    Rule::Symbol(name.into())
}

/// Anonymous literal token.
pub fn lit(text: impl Into<CompactString>) -> Rule {
    Rule::Literal(text.into())
}

/// Anonymous regular expression token.
pub fn pat(pattern: impl Into<CompactString>) -> Rule {
    Rule::Pattern(pattern.into())
}

#[must_use]
pub const fn blank() -> Rule {
    Rule::Blank
}

pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Seq(rules.into_iter().collect())
}

pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Choice(rules.into_iter().collect())
}

#[must_use]
pub fn repeat(rule: Rule) -> Rule {
    Rule::Repeat(Box::new(rule))
}

#[must_use]
pub fn repeat1(rule: Rule) -> Rule {
    Rule::Repeat1(Box::new(rule))
}

#[must_use]
pub fn optional(rule: Rule) -> Rule {
    Rule::Optional(Box::new(rule))
}

pub fn field(name: impl Into<CompactString>, rule: Rule) -> Rule {
    Rule::Field {
        name: name.into(),
        rule: Box::new(rule),
    }
}

#[must_use]
pub fn prec(level: i32, rule: Rule) -> Rule {
    with_precedence(Precedence::new(level, Assoc::None), rule)
}

#[must_use]
pub fn prec_left(level: i32, rule: Rule) -> Rule {
    with_precedence(Precedence::new(level, Assoc::Left), rule)
}

#[must_use]
pub fn prec_right(level: i32, rule: Rule) -> Rule {
    with_precedence(Precedence::new(level, Assoc::Right), rule)
}

#[must_use]
pub fn prec_nonassoc(level: i32, rule: Rule) -> Rule {
    with_precedence(Precedence::new(level, Assoc::NonAssoc), rule)
}

#[must_use]
pub fn token(rule: Rule) -> Rule {
    Rule::Token(Box::new(rule))
}

fn with_precedence(precedence: Precedence, rule: Rule) -> Rule {
    Rule::Prec {
        precedence,
        rule: Box::new(rule),
    }
}

/// Translate a lexical rule into a regular expression.
///
/// Returns the name of the first symbol reference found if the rule is not
/// purely lexical.
pub(crate) fn to_regex(rule: &Rule) -> Result<String, CompactString> {
    let mut out = String::new();
    write_regex(rule, &mut out)?;
    Ok(out)
}

fn write_regex(rule: &Rule, out: &mut String) -> Result<(), CompactString> {
    match rule {
        Rule::Blank => out.push_str("(?:)"),
        Rule::Symbol(name) => return Err(name.clone()),
        Rule::Literal(text) => out.push_str(&regex_syntax::escape(text)),
        Rule::Pattern(pattern) => {
            out.push_str("(?:");
            out.push_str(pattern);
            out.push(')');
        }
        Rule::Seq(rules) => {
            out.push_str("(?:");
            for rule in rules {
                write_regex(rule, out)?;
            }
            out.push(')');
        }
        Rule::Choice(rules) => {
            out.push_str("(?:");
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                write_regex(rule, out)?;
            }
            out.push(')');
        }
        Rule::Repeat(rule) => {
            out.push_str("(?:");
            write_regex(rule, out)?;
            out.push_str(")*");
        }
        Rule::Repeat1(rule) => {
            out.push_str("(?:");
            write_regex(rule, out)?;
            out.push_str(")+");
        }
        Rule::Optional(rule) => {
            out.push_str("(?:");
            write_regex(rule, out)?;
            out.push_str(")?");
        }
        Rule::Field { rule, .. } | Rule::Prec { rule, .. } | Rule::Token(rule) => write_regex(rule, out)?,
    }
    Ok(())
}
