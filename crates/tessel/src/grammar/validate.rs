use crate::error::GrammarError;
use crate::grammar::{rule::to_regex, Grammar, Precedence, Rule};
use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};

/// Run every structural check on a freshly built grammar.
pub(crate) fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    check_references(grammar)?;
    check_tokens(grammar)?;
    check_reachability(grammar)?;
    check_precedence(grammar)?;
    Ok(())
}

fn check_references(grammar: &Grammar) -> Result<(), GrammarError> {
    for (name, rule) in grammar.rules() {
        let mut missing = None;
        walk(rule, &mut |rule| {
            if let Rule::Symbol(target) = rule {
                if missing.is_none() && !grammar.is_rule(target) && !grammar.is_token(target) {
                    missing = Some(target.clone());
                }
            }
        });
        if let Some(target) = missing {
            return Err(GrammarError::UndefinedSymbol {
                rule: name.into(),
                name: target,
            });
        }
    }
    for extra in grammar.extras() {
        if let Rule::Symbol(target) = extra {
            if grammar.is_rule(target) {
                return Err(GrammarError::NonLexicalToken {
                    token: "extras".into(),
                    rule: target.clone(),
                });
            }
            if !grammar.is_token(target) {
                return Err(GrammarError::UndefinedSymbol {
                    rule: "extras".into(),
                    name: target.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Every lexical rule must compile to a regex that cannot match the empty
/// string.
fn check_tokens(grammar: &Grammar) -> Result<(), GrammarError> {
    for (name, rule) in grammar.tokens() {
        let regex = to_regex(rule).map_err(|target| GrammarError::NonLexicalToken {
            token: name.into(),
            rule: target,
        })?;
        check_pattern(name, &regex)?;
    }

    let mut inline = Vec::new();
    for (_, rule) in grammar.rules() {
        collect_inline_tokens(rule, &mut inline);
    }
    for extra in grammar.extras() {
        if !matches!(extra, Rule::Symbol(_)) {
            collect_inline_tokens(extra, &mut inline);
        }
    }
    for rule in inline {
        let label = token_label(rule);
        let regex = to_regex(rule).map_err(|target| GrammarError::NonLexicalToken {
            token: label.clone(),
            rule: target,
        })?;
        check_pattern(&label, &regex)?;
    }
    Ok(())
}

pub(crate) fn check_pattern(name: &str, regex: &str) -> Result<(), GrammarError> {
    let hir = regex_syntax::ParserBuilder::new()
        .build()
        .parse(regex)
        .map_err(|err| GrammarError::InvalidPattern {
            token: name.into(),
            message: err.to_string(),
        })?;
    if hir.properties().minimum_len() == Some(0) {
        return Err(GrammarError::EmptyToken { token: name.into() });
    }
    Ok(())
}

fn collect_inline_tokens<'a>(rule: &'a Rule, out: &mut Vec<&'a Rule>) {
    match rule {
        Rule::Literal(_) | Rule::Pattern(_) | Rule::Token(_) => out.push(rule),
        Rule::Blank | Rule::Symbol(_) => {}
        Rule::Seq(rules) | Rule::Choice(rules) => {
            for rule in rules {
                collect_inline_tokens(rule, out);
            }
        }
        Rule::Repeat(rule)
        | Rule::Repeat1(rule)
        | Rule::Optional(rule)
        | Rule::Field { rule, .. }
        | Rule::Prec { rule, .. } => collect_inline_tokens(rule, out),
    }
}

pub(crate) fn token_label(rule: &Rule) -> CompactString {
    match rule {
        Rule::Literal(text) => text.clone(),
        Rule::Pattern(pattern) => pattern.clone(),
        other => to_regex(other).map_or_else(|name| name, CompactString::from),
    }
}

fn check_reachability(grammar: &Grammar) -> Result<(), GrammarError> {
    let mut reached: HashSet<CompactString> = HashSet::new();
    let mut stack = vec![CompactString::from(grammar.start())];
    while let Some(name) = stack.pop() {
        if !reached.insert(name.clone()) {
            continue;
        }
        if let Some(rule) = grammar.rule(&name) {
            walk(rule, &mut |rule| {
                if let Rule::Symbol(target) = rule {
                    stack.push(target.clone());
                }
            });
        }
    }
    for extra in grammar.extras() {
        if let Rule::Symbol(target) = extra {
            reached.insert(target.clone());
        }
    }

    if let Some((name, _)) = grammar.rules().find(|(name, _)| !reached.contains(*name)) {
        return Err(GrammarError::UnreachableRule { name: name.into() });
    }
    if let Some((name, _)) = grammar.tokens().find(|(name, _)| !reached.contains(*name)) {
        return Err(GrammarError::UnusedToken { name: name.into() });
    }
    Ok(())
}

/// A terminal may carry at most one precedence declaration.
fn check_precedence(grammar: &Grammar) -> Result<(), GrammarError> {
    let mut declared: HashMap<CompactString, Precedence> = HashMap::new();
    let mut conflict = None;
    for (_, rule) in grammar.rules() {
        walk(rule, &mut |rule| {
            let Rule::Prec { precedence, rule } = rule else {
                return;
            };
            let key = match rule.as_ref() {
                Rule::Symbol(name) if grammar.is_token(name) => name.clone(),
                inner if inner.is_token_like() => token_label(inner),
                _ => return,
            };
            match declared.get(&key) {
                Some(first) if first != precedence && conflict.is_none() => {
                    conflict = Some(GrammarError::ContradictoryPrecedence {
                        token: key,
                        first: first.to_string().into(),
                        second: precedence.to_string().into(),
                    });
                }
                Some(_) => {}
                None => {
                    declared.insert(key, *precedence);
                }
            }
        });
    }
    conflict.map_or(Ok(()), Err)
}

/// Pre-order walk over a rule and its sub-rules.
pub(crate) fn walk<'a>(rule: &'a Rule, visit: &mut impl FnMut(&'a Rule)) {
    visit(rule);
    match rule {
        Rule::Blank | Rule::Symbol(_) | Rule::Literal(_) | Rule::Pattern(_) => {}
        Rule::Seq(rules) | Rule::Choice(rules) => {
            for rule in rules {
                walk(rule, visit);
            }
        }
        Rule::Repeat(rule)
        | Rule::Repeat1(rule)
        | Rule::Optional(rule)
        | Rule::Field { rule, .. }
        | Rule::Prec { rule, .. }
        | Rule::Token(rule) => walk(rule, visit),
    }
}
