use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessel::grammar::*;
use tessel::{parse, CancelReason, Language, ParseOptions, Parser, Point};

fn sum() -> Language {
    let grammar = GrammarBuilder::new("sum")
        .rule(
            "sum",
            choice([prec_left(1, seq([sym("sum"), lit("+"), sym("num")])), sym("num")]),
        )
        .token("num", pat("[0-9]+"))
        .extra(pat(r"\s+"))
        .build()
        .unwrap();
    Language::compile(&grammar).unwrap()
}

fn assignments() -> Language {
    let grammar = GrammarBuilder::new("assign")
        .rule("program", repeat(sym("_statement")))
        .rule("_statement", choice([sym("assignment"), sym("call")]))
        .rule(
            "assignment",
            seq([field("left", sym("identifier")), lit("="), field("right", sym("_value")), lit(";")]),
        )
        .rule("call", seq([field("function", sym("identifier")), lit("("), lit(")"), lit(";")]))
        .rule("_value", choice([sym("identifier"), sym("number")]))
        .token("identifier", pat("[a-z_]+"))
        .token("number", pat("[0-9]+"))
        .extra(pat(r"\s+"))
        .extra(pat("#[^\n]*"))
        .build()
        .unwrap();
    Language::compile(&grammar).unwrap()
}

#[test]
fn test_sum_scenario() {
    let tree = parse(&sum(), b"1+2+3", None);
    assert_eq!(tree.to_sexp(), "(sum (sum (sum (num)) (num)) (num))");

    let root = tree.root_node();
    assert_eq!(root.kind(), "sum");
    assert_eq!(root.child_count(), 3);
    let inner = root.child(0).unwrap();
    assert_eq!(inner.byte_range(), 0..3);
    assert_eq!(root.child(1).unwrap().kind(), "+");
    assert!(!root.child(1).unwrap().is_named());
    assert_eq!(root.child(2).unwrap().utf8_text(b"1+2+3").unwrap(), "3");
}

#[test]
fn test_truncated_sum_scenario() {
    let tree = parse(&sum(), b"1+", None);
    let root = tree.root_node();
    assert_eq!(root.byte_range(), 0..2);
    let errors: Vec<_> = root.descendants().filter(|node| node.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].byte_range(), 1..2);
}

#[test]
fn test_hidden_rules_are_spliced() {
    let text = b"x = 1;\nf();";
    let tree = parse(&assignments(), text, None);
    assert!(!tree.has_error(), "{}", tree.to_sexp());
    assert_eq!(
        tree.to_sexp(),
        "(program (assignment left: (identifier) right: (number)) (call function: (identifier)))"
    );
}

#[test]
fn test_fields() {
    let text = b"answer = value;";
    let tree = parse(&assignments(), text, None);
    let assignment = tree.root_node().named_child(0).unwrap();
    assert_eq!(assignment.kind(), "assignment");

    let left = assignment.child_by_field_name("left").unwrap();
    assert_eq!(left.utf8_text(text).unwrap(), "answer");
    let right = assignment.child_by_field_name("right").unwrap();
    assert_eq!(right.kind(), "identifier");
    assert_eq!(right.utf8_text(text).unwrap(), "value");
    assert_eq!(assignment.field_name_for_child(0), Some("left"));
    assert_eq!(assignment.field_name_for_child(1), None);
    assert!(assignment.child_by_field_name("function").is_none());
}

#[test]
fn test_comments_are_extras() {
    let text = b"a = 1; # set a\nb = 2;";
    let tree = parse(&assignments(), text, None);
    assert!(!tree.has_error());
    let extras: Vec<_> = tree
        .root_node()
        .descendants()
        .filter(|node| node.is_extra() && node.utf8_text(text).is_ok_and(|t| t.starts_with('#')))
        .collect();
    assert_eq!(extras.len(), 1);
    assert_eq!(extras[0].utf8_text(text).unwrap(), "# set a");
}

#[test]
fn test_positions() {
    let text = b"a = 1;\n  b = 2;";
    let tree = parse(&assignments(), text, None);
    let second = tree.root_node().named_child(1).unwrap();
    assert_eq!(second.start_position(), Point::new(1, 2));
    assert_eq!(second.end_position(), Point::new(1, 8));
    assert_eq!(tree.root_node().end_position(), Point::new(1, 8));
}

#[test]
fn test_node_navigation() {
    let text = b"a = 1; b = 2; c = 3;";
    let tree = parse(&assignments(), text, None);
    let root = tree.root_node();
    assert_eq!(root.named_child_count(), 3);

    let first = root.named_child(0).unwrap();
    let second = first.next_named_sibling().unwrap();
    assert_eq!(second.utf8_text(text).unwrap(), "b = 2;");
    assert_eq!(second.prev_named_sibling().unwrap(), first);
    assert_eq!(second.parent().unwrap(), root);

    assert!(root.node_at_offset(8).unwrap().is_extra());
    let node = root.node_at_offset(9).unwrap();
    assert_eq!(node.kind(), "=");
    let named = root.named_node_at_offset(7).unwrap();
    assert_eq!(named.kind(), "identifier");
    assert_eq!(named.utf8_text(text).unwrap(), "b");

    let last = root.last_child().unwrap();
    assert_eq!(last.utf8_text(text).unwrap(), "c = 3;");
}

#[test]
fn test_cursor_walk() {
    let tree = parse(&assignments(), b"a=1;", None);
    let mut cursor = tree.walk();
    assert_eq!(cursor.node().kind(), "program");
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "assignment");
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.field_name(), Some("left"));
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), "=");
    assert!(cursor.goto_parent());
    assert!(cursor.goto_parent());
    assert!(!cursor.goto_parent());
    assert_eq!(cursor.depth(), 0);
}

#[test]
fn test_recovery_keeps_following_statements() {
    let text = b"a = 1; b = = 2; c = 3;";
    let tree = parse(&assignments(), text, None);
    assert_eq!(tree.root_node().byte_range(), 0..text.len());
    assert!(tree.has_error());
    let assignments: Vec<_> = tree
        .root_node()
        .descendants()
        .filter(|node| node.kind() == "assignment" && !node.has_error())
        .map(|node| node.utf8_text(text).unwrap().to_string())
        .collect();
    assert!(assignments.contains(&"a = 1;".to_string()));
    assert!(assignments.contains(&"c = 3;".to_string()));
}

#[test]
fn test_invalid_utf8_is_total() {
    let text = b"a = \xff\xfe;";
    let tree = parse(&assignments(), text, None);
    assert_eq!(tree.root_node().byte_range(), 0..text.len());
    assert!(tree.has_error());
}

#[test]
fn test_ambiguity_is_resolved_deterministically() {
    let grammar = GrammarBuilder::new("expr")
        .rule("expr", choice([seq([sym("expr"), lit("-"), sym("expr")]), sym("num")]))
        .token("num", pat("[0-9]+"))
        .build()
        .unwrap();
    let language = Language::compile(&grammar).unwrap();
    let mut parser = Parser::new(language);
    let first = parser.parse(b"1-2-3-4", None).unwrap();
    let stats = parser.last_stats();
    assert!(stats.forks > 0);
    assert!(stats.max_versions > 1);
    assert!(!first.has_error());
    for _ in 0..3 {
        let again = parser.parse(b"1-2-3-4", None).unwrap();
        assert_eq!(again.to_sexp(), first.to_sexp());
    }
}

#[test]
fn test_dynamic_precedence_picks_the_higher_alternative() {
    let grammar = GrammarBuilder::new("stmt")
        .rule("statement", choice([sym("cast"), sym("call")]))
        .rule("cast", prec(2, seq([lit("("), sym("name"), lit(")"), sym("name")])))
        .rule("call", prec(1, seq([lit("("), sym("_ref"), lit(")"), sym("name")])))
        .rule("_ref", sym("name"))
        .token("name", pat("[a-z]+"))
        .extra(pat(r"\s+"))
        .build()
        .unwrap();
    let language = Language::compile(&grammar).unwrap();
    let tree = parse(&language, b"(a) b", None);
    assert!(!tree.has_error());
    assert_eq!(tree.root_node().named_child(0).unwrap().kind(), "cast");
}

#[test]
fn test_version_cap_is_respected() {
    let grammar = GrammarBuilder::new("expr")
        .rule("expr", choice([seq([sym("expr"), lit("-"), sym("expr")]), sym("num")]))
        .token("num", pat("[0-9]+"))
        .build()
        .unwrap();
    let language = Language::compile(&grammar).unwrap();
    let mut parser = Parser::with_options(language, ParseOptions::new().max_versions(2));
    let tree = parser.parse(b"1-2-3-4-5-6-7", None).unwrap();
    assert!(!tree.has_error());
    assert_eq!(tree.root_node().end_byte(), 13);
}

#[test]
fn test_cancellation_flag() {
    let flag = Arc::new(AtomicBool::new(true));
    let options = ParseOptions::new().cancellation_flag(flag.clone());
    let mut parser = Parser::with_options(sum(), options);
    let err = parser.parse(b"1 + 2", None).unwrap_err();
    assert_eq!(err.reason, CancelReason::Flag);
    assert!(err.partial.root_node().is_error());

    flag.store(false, Ordering::Relaxed);
    let tree = parser.parse(b"1 + 2", None).unwrap();
    assert!(!tree.has_error());
}

#[test]
fn test_zero_timeout_cancels() {
    let options = ParseOptions::new().timeout(Duration::ZERO);
    let mut parser = Parser::with_options(sum(), options);
    let err = parser.parse(b"1 + 2 + 3", None).unwrap_err();
    assert_eq!(err.reason, CancelReason::Timeout);
}

#[test]
fn test_generous_budget_completes() {
    let options = ParseOptions::new().operation_budget(1_000);
    let mut parser = Parser::with_options(sum(), options);
    let tree = parser.parse(b"1 + 2 + 3", None).unwrap();
    assert!(!tree.has_error());
    assert!(parser.last_stats().operations <= 1_000);
}

#[test]
fn test_language_is_shared_across_threads() {
    let language = sum();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let language = language.clone();
            std::thread::spawn(move || {
                let text = format!("{i} + {i}");
                parse(&language, text.as_bytes(), None).to_sexp()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "(sum (sum (num)) (num))");
    }
}
