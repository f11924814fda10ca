//! Lowering of rule expressions to plain productions.
//!
//! `choice` and `optional` become separate alternatives of the enclosing
//! rule, `repeat1(x)` becomes a hidden left-recursive rule `aux -> aux x | x`
//! and `repeat(x)` is `optional(repeat1(x))`. Precedence is attached to each
//! alternative, fields to each right-hand-side position.

use crate::error::GrammarError;
use crate::grammar::validate::token_label;
use crate::grammar::{rule::to_regex, Grammar, Precedence, Rule};
use crate::syntax::{FieldId, Symbol};
use crate::table::{Production, SymbolInfo, SymbolKind};
use compact_str::{format_compact, CompactString};
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Largest usable symbol count; `u16::MAX` is reserved for `ERROR`.
pub const MAX_SYMBOLS: usize = u16::MAX as usize - 1;

/// A grammar reduced to numbered symbols and productions.
#[derive(Debug, Clone)]
pub struct LoweredGrammar {
    pub name: CompactString,
    /// Indexed by symbol id: end, terminals, then non-terminals.
    pub symbols: Vec<SymbolInfo>,
    /// Number of terminal ids, including the end symbol.
    pub terminal_count: usize,
    pub productions: Vec<Production>,
    pub start: Symbol,
    pub fields: Vec<CompactString>,
    /// Regex per terminal, in symbol order (the end symbol has none).
    pub lexical: Vec<LexicalRule>,
    /// Declared precedence per terminal id.
    pub terminal_precedence: Vec<Option<Precedence>>,
}

/// Lexical definition of one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalRule {
    pub symbol: Symbol,
    pub regex: String,
    /// Literal tokens win ties against patterns.
    pub literal: bool,
}

impl LoweredGrammar {
    #[must_use]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol.index() < self.terminal_count
    }

    #[must_use]
    pub fn nonterminal_count(&self) -> usize {
        self.symbols.len() - self.terminal_count
    }

    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbols
            .get(symbol.index())
            .map_or("ERROR", |info| info.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SymRef {
    Terminal(usize),
    NonTerminal(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Step {
    symbol: SymRef,
    field: Option<FieldId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct Alternative {
    steps: Vec<Step>,
    precedence: Option<Precedence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TerminalKey {
    Named(CompactString),
    Literal(CompactString),
    Pattern(CompactString),
}

struct PendingTerminal {
    name: CompactString,
    regex: String,
    literal: bool,
    named: bool,
    extra: bool,
    precedence: Option<Precedence>,
}

struct PendingNonTerminal {
    name: CompactString,
    kind: SymbolKind,
    alternatives: Vec<Alternative>,
}

struct Lowerer<'g> {
    grammar: &'g Grammar,
    terminals: Vec<PendingTerminal>,
    terminal_index: HashMap<TerminalKey, usize>,
    nonterminals: Vec<PendingNonTerminal>,
    nonterminal_index: HashMap<CompactString, usize>,
    repeat_index: HashMap<Rule, usize>,
    fields: Vec<CompactString>,
    field_index: HashMap<CompactString, FieldId>,
}

/// Lower a validated grammar.
///
/// # Errors
///
/// Returns [`GrammarError::TooManySymbols`] when the symbol ids do not fit.
pub fn lower(grammar: &Grammar) -> Result<LoweredGrammar, GrammarError> {
    let mut lowerer = Lowerer {
        grammar,
        terminals: Vec::new(),
        terminal_index: HashMap::new(),
        nonterminals: Vec::new(),
        nonterminal_index: HashMap::new(),
        repeat_index: HashMap::new(),
        fields: Vec::new(),
        field_index: HashMap::new(),
    };

    for (name, rule) in grammar.tokens() {
        let regex = to_regex(rule).map_err(|target| GrammarError::NonLexicalToken {
            token: name.into(),
            rule: target,
        })?;
        lowerer.add_terminal(
            TerminalKey::Named(name.into()),
            PendingTerminal {
                name: name.into(),
                regex,
                literal: matches!(rule, Rule::Literal(_)),
                named: !name.starts_with('_'),
                extra: false,
                precedence: None,
            },
        );
    }
    for (name, _) in grammar.rules() {
        lowerer.nonterminal_index.insert(name.into(), lowerer.nonterminals.len());
        lowerer.nonterminals.push(PendingNonTerminal {
            name: name.into(),
            kind: SymbolKind::NonTerminal,
            alternatives: Vec::new(),
        });
    }

    for (index, (name, rule)) in grammar.rules().enumerate() {
        let alternatives = lowerer.expand(name, rule)?;
        lowerer.nonterminals[index].alternatives = dedup(alternatives);
    }
    for extra in grammar.extras() {
        let terminal = lowerer.terminal_for(extra)?;
        lowerer.terminals[terminal].extra = true;
    }

    lowerer.finish()
}

fn dedup(alternatives: Vec<Alternative>) -> Vec<Alternative> {
    let mut out: Vec<Alternative> = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        if !out.iter().any(|seen| seen.steps == alternative.steps) {
            out.push(alternative);
        }
    }
    out
}

impl Lowerer<'_> {
    fn add_terminal(&mut self, key: TerminalKey, terminal: PendingTerminal) -> usize {
        if let Some(&index) = self.terminal_index.get(&key) {
            return index;
        }
        let index = self.terminals.len();
        self.terminals.push(terminal);
        self.terminal_index.insert(key, index);
        index
    }

    /// Terminal index for a token-like rule, registering anonymous tokens.
    fn terminal_for(&mut self, rule: &Rule) -> Result<usize, GrammarError> {
        match rule {
            Rule::Symbol(name) => self
                .terminal_index
                .get(&TerminalKey::Named(name.clone()))
                .copied()
                .ok_or_else(|| GrammarError::UndefinedSymbol {
                    rule: "extras".into(),
                    name: name.clone(),
                }),
            Rule::Literal(text) => Ok(self.add_terminal(
                TerminalKey::Literal(text.clone()),
                PendingTerminal {
                    name: text.clone(),
                    regex: regex_syntax::escape(text),
                    literal: true,
                    named: false,
                    extra: false,
                    precedence: None,
                },
            )),
            Rule::Prec { rule, .. } | Rule::Field { rule, .. } => self.terminal_for(rule),
            other => {
                let label = token_label(other);
                let regex = to_regex(other).map_err(|target| GrammarError::NonLexicalToken {
                    token: label.clone(),
                    rule: target,
                })?;
                Ok(self.add_terminal(
                    TerminalKey::Pattern(CompactString::from(regex.as_str())),
                    PendingTerminal {
                        name: label,
                        regex,
                        literal: false,
                        named: false,
                        extra: false,
                        precedence: None,
                    },
                ))
            }
        }
    }

    fn field_id(&mut self, name: &CompactString) -> FieldId {
        if let Some(&id) = self.field_index.get(name) {
            return id;
        }
        let id = FieldId(u16::try_from(self.fields.len()).unwrap_or(u16::MAX));
        self.fields.push(name.clone());
        self.field_index.insert(name.clone(), id);
        id
    }

    fn expand(&mut self, owner: &str, rule: &Rule) -> Result<Vec<Alternative>, GrammarError> {
        Ok(match rule {
            Rule::Blank => vec![Alternative::default()],
            Rule::Symbol(name) => {
                let symbol = if let Some(&index) = self.nonterminal_index.get(name) {
                    SymRef::NonTerminal(index)
                } else {
                    SymRef::Terminal(self.terminal_for(rule)?)
                };
                vec![single(symbol)]
            }
            Rule::Literal(_) | Rule::Pattern(_) | Rule::Token(_) => {
                vec![single(SymRef::Terminal(self.terminal_for(rule)?))]
            }
            Rule::Seq(rules) => {
                let mut alternatives = vec![Alternative::default()];
                for rule in rules {
                    let suffixes = self.expand(owner, rule)?;
                    let mut next = Vec::with_capacity(alternatives.len() * suffixes.len());
                    for prefix in &alternatives {
                        for suffix in &suffixes {
                            let mut steps = prefix.steps.clone();
                            steps.extend(suffix.steps.iter().cloned());
                            next.push(Alternative {
                                steps,
                                precedence: prefix.precedence.or(suffix.precedence),
                            });
                        }
                    }
                    alternatives = next;
                }
                alternatives
            }
            Rule::Choice(rules) => {
                let mut alternatives = Vec::new();
                for rule in rules {
                    alternatives.extend(self.expand(owner, rule)?);
                }
                alternatives
            }
            Rule::Optional(rule) => {
                let mut alternatives = self.expand(owner, rule)?;
                alternatives.push(Alternative::default());
                alternatives
            }
            Rule::Repeat(inner) => {
                let aux = self.repeat_rule(owner, inner)?;
                vec![single(SymRef::NonTerminal(aux)), Alternative::default()]
            }
            Rule::Repeat1(inner) => {
                let aux = self.repeat_rule(owner, inner)?;
                vec![single(SymRef::NonTerminal(aux))]
            }
            Rule::Field { name, rule } => {
                let id = self.field_id(name);
                let mut alternatives = self.expand(owner, rule)?;
                for alternative in &mut alternatives {
                    for step in &mut alternative.steps {
                        step.field.get_or_insert(id);
                    }
                }
                alternatives
            }
            Rule::Prec { precedence, rule } => {
                let terminal = match rule.as_ref() {
                    Rule::Symbol(name) if self.grammar.is_token(name) => Some(self.terminal_for(rule)?),
                    inner if inner.is_token_like() => Some(self.terminal_for(inner)?),
                    _ => None,
                };
                if let Some(terminal) = terminal {
                    self.terminals[terminal].precedence = Some(*precedence);
                    vec![single(SymRef::Terminal(terminal))]
                } else {
                    let mut alternatives = self.expand(owner, rule)?;
                    for alternative in &mut alternatives {
                        alternative.precedence.get_or_insert(*precedence);
                    }
                    alternatives
                }
            }
        })
    }

    /// Hidden rule `aux -> aux x | x` for `repeat1(x)`, shared between
    /// identical repetitions.
    fn repeat_rule(&mut self, owner: &str, inner: &Rule) -> Result<usize, GrammarError> {
        if let Some(&index) = self.repeat_index.get(inner) {
            return Ok(index);
        }
        let index = self.nonterminals.len();
        let ordinal = self
            .nonterminals
            .iter()
            .filter(|nt| nt.kind == SymbolKind::Auxiliary)
            .count()
            + 1;
        self.nonterminals.push(PendingNonTerminal {
            name: format_compact!("{owner}_repeat{ordinal}"),
            kind: SymbolKind::Auxiliary,
            alternatives: Vec::new(),
        });
        self.repeat_index.insert(inner.clone(), index);

        let bodies = self.expand(owner, inner)?;
        let mut alternatives = Vec::with_capacity(bodies.len() * 2);
        for body in &bodies {
            let mut steps = vec![Step {
                symbol: SymRef::NonTerminal(index),
                field: None,
            }];
            steps.extend(body.steps.iter().cloned());
            alternatives.push(Alternative {
                steps,
                precedence: body.precedence,
            });
        }
        alternatives.extend(bodies);
        self.nonterminals[index].alternatives = dedup(alternatives);
        Ok(index)
    }

    fn finish(self) -> Result<LoweredGrammar, GrammarError> {
        let terminal_count = 1 + self.terminals.len();
        let total = terminal_count + self.nonterminals.len();
        if total > MAX_SYMBOLS {
            return Err(GrammarError::TooManySymbols {
                count: total,
                max: MAX_SYMBOLS,
            });
        }
        let to_symbol = |symbol: SymRef| match symbol {
            SymRef::Terminal(index) => Symbol((1 + index) as u16),
            SymRef::NonTerminal(index) => Symbol((terminal_count + index) as u16),
        };

        let mut symbols = Vec::with_capacity(total);
        symbols.push(SymbolInfo {
            name: "end".into(),
            kind: SymbolKind::End,
            named: false,
            visible: false,
            extra: false,
        });
        let mut lexical = Vec::with_capacity(self.terminals.len());
        let mut terminal_precedence = vec![None];
        for (index, terminal) in self.terminals.iter().enumerate() {
            symbols.push(SymbolInfo {
                name: terminal.name.clone(),
                kind: SymbolKind::Terminal,
                named: terminal.named,
                visible: true,
                extra: terminal.extra,
            });
            lexical.push(LexicalRule {
                symbol: to_symbol(SymRef::Terminal(index)),
                regex: terminal.regex.clone(),
                literal: terminal.literal,
            });
            terminal_precedence.push(terminal.precedence);
        }

        let mut productions = Vec::new();
        for (index, nonterminal) in self.nonterminals.iter().enumerate() {
            let visible = nonterminal.kind == SymbolKind::NonTerminal && !nonterminal.name.starts_with('_');
            symbols.push(SymbolInfo {
                name: nonterminal.name.clone(),
                kind: nonterminal.kind,
                named: visible,
                visible,
                extra: false,
            });
            let lhs = to_symbol(SymRef::NonTerminal(index));
            for alternative in &nonterminal.alternatives {
                let rhs: SmallVec<[Symbol; 4]> = alternative.steps.iter().map(|step| to_symbol(step.symbol)).collect();
                let fields = alternative
                    .steps
                    .iter()
                    .enumerate()
                    .filter_map(|(position, step)| step.field.map(|field| (position as u16, field)))
                    .collect();
                productions.push(Production {
                    lhs,
                    rhs,
                    fields,
                    precedence: alternative.precedence,
                });
            }
        }

        let start = self
            .nonterminal_index
            .get(self.grammar.start())
            .map(|&index| to_symbol(SymRef::NonTerminal(index)))
            .ok_or_else(|| GrammarError::MissingStart {
                grammar: self.grammar.name().into(),
            })?;

        tracing::debug!(
            grammar = %self.grammar.name(),
            terminals = terminal_count - 1,
            nonterminals = self.nonterminals.len(),
            productions = productions.len(),
            fields = self.fields.len(),
            "grammar lowered"
        );

        Ok(LoweredGrammar {
            name: self.grammar.name().into(),
            symbols,
            terminal_count,
            productions,
            start,
            fields: self.fields,
            lexical,
            terminal_precedence,
        })
    }
}

fn single(symbol: SymRef) -> Alternative {
    Alternative {
        steps: vec![Step { symbol, field: None }],
        precedence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::*;

    fn lowered(builder: GrammarBuilder) -> LoweredGrammar {
        lower(&builder.build().unwrap()).unwrap()
    }

    fn alternatives<'a>(grammar: &'a LoweredGrammar, name: &str) -> Vec<Vec<&'a str>> {
        grammar
            .productions
            .iter()
            .filter(|p| grammar.symbol_name(p.lhs) == name)
            .map(|p| p.rhs.iter().map(|s| grammar.symbol_name(*s)).collect())
            .collect()
    }

    #[test]
    fn test_symbol_numbering() {
        let grammar = lowered(
            GrammarBuilder::new("t")
                .rule("expr", seq([sym("num"), lit("+"), sym("num")]))
                .token("num", pat("[0-9]+")),
        );
        assert_eq!(grammar.symbol_name(Symbol::END), "end");
        assert_eq!(grammar.symbol_name(Symbol(1)), "num");
        assert_eq!(grammar.symbol_name(Symbol(2)), "+");
        assert_eq!(grammar.terminal_count, 3);
        assert_eq!(grammar.start, Symbol(3));
        assert!(grammar.lexical[1].literal);
        assert!(!grammar.lexical[0].literal);
    }

    #[test]
    fn test_optional_and_choice_expand_to_alternatives() {
        let grammar = lowered(GrammarBuilder::new("t").rule(
            "a",
            seq([lit("x"), optional(lit("y")), choice([lit("p"), lit("q")])]),
        ));
        let alts = alternatives(&grammar, "a");
        assert_eq!(
            alts,
            vec![vec!["x", "y", "p"], vec!["x", "y", "q"], vec!["x", "p"], vec!["x", "q"]]
        );
    }

    #[test]
    fn test_repeat_becomes_hidden_left_recursive_rule() {
        let grammar = lowered(GrammarBuilder::new("t").rule("list", repeat(lit("x"))));
        assert_eq!(alternatives(&grammar, "list"), vec![vec!["list_repeat1"], vec![]]);
        assert_eq!(
            alternatives(&grammar, "list_repeat1"),
            vec![vec!["list_repeat1", "x"], vec!["x"]]
        );
        let aux = grammar.symbols.iter().find(|s| s.name == "list_repeat1").unwrap();
        assert!(!aux.visible);
        assert_eq!(aux.kind, SymbolKind::Auxiliary);
    }

    #[test]
    fn test_fields_and_precedence_attach_per_alternative() {
        let grammar = lowered(GrammarBuilder::new("t").rule(
            "e",
            prec_left(
                2,
                choice([
                    seq([field("left", sym("e")), field("op", lit("*")), field("right", sym("e"))]),
                    lit("n"),
                ]),
            ),
        ));
        let binary = grammar.productions.iter().find(|p| p.len() == 3).unwrap();
        assert_eq!(binary.precedence, Some(Precedence::new(2, Assoc::Left)));
        assert_eq!(binary.field_at(0), Some(FieldId(0)));
        assert_eq!(binary.field_at(1), Some(FieldId(1)));
        assert_eq!(grammar.fields, vec!["left", "op", "right"]);
    }

    #[test]
    fn test_terminal_precedence_declaration() {
        let grammar = lowered(GrammarBuilder::new("t").rule(
            "sum",
            choice([seq([sym("sum"), prec_left(1, lit("+")), lit("n")]), lit("n")]),
        ));
        let plus = grammar.symbols.iter().position(|s| s.name == "+").unwrap();
        assert_eq!(
            grammar.terminal_precedence[plus],
            Some(Precedence::new(1, Assoc::Left))
        );
        let recursive = grammar.productions.iter().find(|p| p.len() == 3).unwrap();
        assert_eq!(recursive.precedence, None);
    }

    #[test]
    fn test_hidden_rules_and_extras() {
        let grammar = lowered(
            GrammarBuilder::new("t")
                .rule("a", seq([sym("_b"), lit("x")]))
                .rule("_b", lit("y"))
                .token("comment", pat("#.*"))
                .extra(sym("comment"))
                .extra(pat(r"\s+")),
        );
        let hidden = grammar.symbols.iter().find(|s| s.name == "_b").unwrap();
        assert!(!hidden.visible);
        assert!(grammar.symbols.iter().find(|s| s.name == "comment").unwrap().extra);
        assert!(grammar.symbols.iter().find(|s| s.name == r"\s+").unwrap().extra);
    }
}
