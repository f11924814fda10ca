use proptest::prelude::*;
use tessel::testing::check_coverage;
use tessel::{parse, InputEdit, Language, SyntaxNode, Tree};
use tessel_p::SyntaxKind;

/// Expression layers from `expression` down to `primary_expression`.
const EXPRESSION_CHAIN: [&str; 11] = [
    "expression",
    "assignment_expression",
    "logical_or_expression",
    "logical_and_expression",
    "equality_expression",
    "comparison_expression",
    "term_expression",
    "factor_expression",
    "unary_expression",
    "call_expression",
    "primary_expression",
];

fn wrapped(leaf: &str) -> String {
    EXPRESSION_CHAIN
        .iter()
        .rev()
        .fold(leaf.to_string(), |inner, layer| format!("({layer} {inner})"))
}

fn p() -> Language {
    tessel_p::language().expect("embedded P language loads")
}

fn parse_p(text: &str) -> Tree {
    parse(&p(), text.as_bytes(), None)
}

fn find_all<'a>(tree: &'a Tree, kind: SyntaxKind) -> impl Iterator<Item = SyntaxNode> + 'a {
    tree.root_node()
        .descendants()
        .filter(move |node| node.kind_as::<SyntaxKind>() == Some(kind))
}

fn text_of<'a>(node: &SyntaxNode, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap()
}

#[test]
fn can_load_grammar() {
    assert!(tessel_p::try_load_language().is_some(), "error loading P grammar");
    let language = tessel_p::load_language().unwrap();
    assert_eq!(language.name(), "p");
    assert_eq!(language.abi_version(), tessel::language::blob::ABI_VERSION);
}

#[test]
fn test_print_statement() {
    let tree = parse_p("print(1);");
    assert_eq!(
        tree.to_sexp(),
        format!(
            "(source_file (declaration (statement (print_statement argument: {}))))",
            wrapped("(number)")
        )
    );
}

#[test]
fn test_empty_source() {
    let tree = parse_p("");
    assert_eq!(tree.to_sexp(), "(source_file)");
    assert!(!tree.has_error());
}

#[test]
fn test_declarations() {
    let source = "object Point extends Base {\n  fn init(x, y,) { this.x = x; }\n}\nlet origin = Point(0, 0);\n";
    let tree = parse_p(source);
    assert!(!tree.has_error(), "{}", tree.debug_dump(Some(source.as_bytes())));

    let object = find_all(&tree, SyntaxKind::ObjectDeclaration).next().unwrap();
    assert_eq!(text_of(&object.child_by_field_name("name").unwrap(), source), "Point");
    let extends = find_all(&tree, SyntaxKind::ExtendsClause).next().unwrap();
    assert_eq!(text_of(&extends.child_by_field_name("parent").unwrap(), source), "Base");

    let function = find_all(&tree, SyntaxKind::FunctionDeclaration).next().unwrap();
    assert_eq!(text_of(&function.child_by_field_name("name").unwrap(), source), "init");
    assert_eq!(find_all(&tree, SyntaxKind::FunctionParameter).count(), 2);

    let variable = find_all(&tree, SyntaxKind::VariableDeclaration).next().unwrap();
    assert_eq!(text_of(&variable.child_by_field_name("name").unwrap(), source), "origin");
    assert_eq!(find_all(&tree, SyntaxKind::CallArgument).count(), 2);
}

#[test]
fn test_operator_precedence() {
    let source = "x = 1 + 2 * 3 == 7 or !done;";
    let tree = parse_p(source);
    assert!(!tree.has_error());

    let assignment = find_all(&tree, SyntaxKind::AssignmentExpression)
        .find(|node| node.child_by_field_name("left").is_some())
        .unwrap();
    assert_eq!(text_of(&assignment.child_by_field_name("left").unwrap(), source), "x");
    assert_eq!(
        text_of(&assignment.child_by_field_name("right").unwrap(), source),
        "1 + 2 * 3 == 7 or !done"
    );

    let sum = find_all(&tree, SyntaxKind::TermExpression)
        .find(|node| node.child_by_field_name("operator").is_some())
        .unwrap();
    assert_eq!(text_of(&sum.child_by_field_name("left").unwrap(), source), "1");
    assert_eq!(text_of(&sum.child_by_field_name("right").unwrap(), source), "2 * 3");

    let equality = find_all(&tree, SyntaxKind::EqualityExpression)
        .find(|node| node.child_by_field_name("operator").is_some())
        .unwrap();
    assert_eq!(text_of(&equality.child_by_field_name("left").unwrap(), source), "1 + 2 * 3");

    let negation = find_all(&tree, SyntaxKind::UnaryExpression)
        .find(|node| node.child_by_field_name("operator").is_some())
        .unwrap();
    assert_eq!(text_of(&negation.child_by_field_name("operand").unwrap(), source), "done");
}

#[test]
fn test_left_associative_subtraction() {
    let source = "a - b - c;";
    let tree = parse_p(source);
    let outer = find_all(&tree, SyntaxKind::TermExpression)
        .find(|node| node.child_by_field_name("operator").is_some())
        .unwrap();
    assert_eq!(text_of(&outer.child_by_field_name("left").unwrap(), source), "a - b");
    assert_eq!(text_of(&outer.child_by_field_name("right").unwrap(), source), "c");
}

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    let source = "if (a) if (b) print(1); else print(2);";
    let tree = parse_p(source);
    assert!(!tree.has_error());
    let ifs: Vec<_> = find_all(&tree, SyntaxKind::IfStatement).collect();
    assert_eq!(ifs.len(), 2);
    assert!(ifs[0].child_by_field_name("alternative").is_none());
    let inner_else = ifs[1].child_by_field_name("alternative").unwrap();
    assert_eq!(text_of(&inner_else, source), "else print(2);");
}

#[test]
fn test_loops_and_calls() {
    let source = "for (let i = 0; i < 10; i = i + 1) { print(list.get(i)); }\nwhile (true) return;\n";
    let tree = parse_p(source);
    assert!(!tree.has_error(), "{}", tree.debug_dump(Some(source.as_bytes())));
    let for_statement = find_all(&tree, SyntaxKind::ForStatement).next().unwrap();
    assert_eq!(
        text_of(&for_statement.child_by_field_name("condition").unwrap(), source),
        "i < 10"
    );
    assert_eq!(
        text_of(&for_statement.child_by_field_name("increment").unwrap(), source),
        "i = i + 1"
    );
    let member = find_all(&tree, SyntaxKind::CallExpression)
        .find(|node| node.child_by_field_name("property").is_some())
        .unwrap();
    assert_eq!(text_of(&member, source), "list.get");
    assert_eq!(find_all(&tree, SyntaxKind::WhileStatement).count(), 1);
    assert_eq!(find_all(&tree, SyntaxKind::True).count(), 1);
    assert_eq!(find_all(&tree, SyntaxKind::ReturnStatement).count(), 1);
}

#[test]
fn test_keywords_and_identifiers() {
    let source = "let printer = nil; let truth = true;";
    let tree = parse_p(source);
    assert!(!tree.has_error());
    let names: Vec<_> = find_all(&tree, SyntaxKind::VariableDeclaration)
        .map(|node| text_of(&node.child_by_field_name("name").unwrap(), source).to_string())
        .collect();
    assert_eq!(names, ["printer", "truth"]);
    assert_eq!(find_all(&tree, SyntaxKind::Nil).count(), 1);
    assert_eq!(find_all(&tree, SyntaxKind::True).count(), 1);
}

#[test]
fn test_literals() {
    let source = "print(\"hello, world\"); print(3.25);";
    let tree = parse_p(source);
    assert!(!tree.has_error());
    let string = find_all(&tree, SyntaxKind::String).next().unwrap();
    assert_eq!(text_of(&string, source), "\"hello, world\"");
    let number = find_all(&tree, SyntaxKind::Number).next().unwrap();
    assert_eq!(text_of(&number, source), "3.25");
}

#[test]
fn test_comments_are_extras() {
    let source = "// leading\nprint(1); /* block\n comment */ print(2);";
    let tree = parse_p(source);
    assert!(!tree.has_error());
    let comments: Vec<_> = find_all(&tree, SyntaxKind::Comment).collect();
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(SyntaxNode::is_extra));
    assert_eq!(text_of(&comments[0], source), "// leading");
    assert_eq!(find_all(&tree, SyntaxKind::PrintStatement).count(), 2);
}

#[test]
fn test_syntax_errors_are_recovered() {
    let source = "let = ;\nprint(1);\n";
    let tree = parse_p(source);
    assert!(tree.has_error());
    assert!(!tree.errors().is_empty());
    check_coverage(&tree, source.len()).unwrap();
}

#[test]
fn test_incremental_edit() {
    let language = p();
    let old_text = b"let a = 1;\nprint(a);\nprint(a + 2);\n";
    let tree = parse(&language, old_text, None);
    let (new_text, edit) = InputEdit::replace(old_text, 8..9, b"42");
    let edited = tree.edit(&edit);

    let mut parser = tessel::Parser::new(language.clone());
    let reparsed = parser.parse(&new_text, Some(&edited)).unwrap();
    let fresh = parse(&language, &new_text, None);
    assert!(reparsed.structurally_eq(&fresh));
    assert!(parser.last_stats().reused_nodes > 0);
}

#[test]
fn test_reparse_next_to_syntax_error() {
    let language = p();
    let text = b"fn f() { return 1; } else";
    let tree = parse(&language, text, None);
    assert!(tree.has_error());
    let (new_text, edit) = InputEdit::replace(text, 0..0, b"");

    let mut parser = tessel::Parser::new(language.clone());
    let reparsed = parser.parse(&new_text, Some(&tree.edit(&edit))).unwrap();
    let fresh = parse(&language, &new_text, None);
    assert!(parser.last_stats().reused_nodes > 0);
    assert!(
        reparsed.structurally_eq(&fresh),
        "incremental: {}\nfresh: {}",
        reparsed.to_sexp(),
        fresh.to_sexp()
    );
    let error = find_all(&fresh, SyntaxKind::Error).next().unwrap();
    assert_eq!(error.parent().and_then(|node| node.kind_as()), Some(SyntaxKind::FunctionDeclaration));
}

#[test]
fn test_deeply_nested_expression() {
    const DEPTH: usize = 5000;
    let source = format!("x = {}1{};", "(".repeat(DEPTH), ")".repeat(DEPTH));
    let tree = parse_p(&source);
    assert!(!tree.has_error());
    check_coverage(&tree, source.len()).unwrap();
    assert_eq!(find_all(&tree, SyntaxKind::ParenthesizedExpression).count(), DEPTH);

    let again = parse_p(&source);
    assert!(tree.structurally_eq(&again));
    assert!(tree.to_sexp().starts_with("(source_file (declaration (statement (expression_statement"));

    let (new_text, edit) = InputEdit::replace(source.as_bytes(), DEPTH + 4..DEPTH + 5, b"2");
    let edited = tree.edit(&edit);
    assert_eq!(edited.root_node().end_byte(), new_text.len());
    let digit = edited.root_node().node_at_offset(DEPTH + 4).unwrap();
    assert!(digit.has_changes());
    assert!(edited.root_node().has_changes());

    // Same shape, so no structural change between the two trees.
    let fresh = parse(&p(), &new_text, None);
    assert!(Tree::changed_ranges(&edited, &fresh).is_empty());
}

const PIECES: &[&str] = &[
    "let", "x", "=", "1", ";", "print", "(", ")", "{", "}", "if", "else", "+", "*", "or", "\"s\"", "//c\n", " ",
    "\n", ".", ",", "fn", "object", "return", "!",
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_any_token_soup_is_covered(indices in prop::collection::vec(0..PIECES.len(), 0..40)) {
        let text: String = indices.iter().map(|&i| PIECES[i]).collect();
        let tree = parse_p(&text);
        prop_assert!(check_coverage(&tree, text.len()).is_ok());
        prop_assert_eq!(tree.root_node().kind_as::<SyntaxKind>(), Some(SyntaxKind::SourceFile));
    }

    #[test]
    fn prop_reparse_of_token_soup_matches_fresh_parse(
        indices in prop::collection::vec(0..PIECES.len(), 0..30),
        start in any::<prop::sample::Index>(),
        len in 0..6usize,
        inserted in prop::collection::vec(0..PIECES.len(), 0..3),
    ) {
        let language = p();
        let text: String = indices.iter().map(|&i| PIECES[i]).collect();
        let replacement: String = inserted.iter().map(|&i| PIECES[i]).collect();
        let start = start.index(text.len() + 1);
        let end = (start + len).min(text.len());

        let mut parser = tessel::Parser::new(language.clone());
        let old = parser.parse(text.as_bytes(), None).unwrap();
        let (new_text, edit) = InputEdit::replace(text.as_bytes(), start..end, replacement.as_bytes());
        let reparsed = parser.parse(&new_text, Some(&old.edit(&edit))).unwrap();
        let fresh = parse(&language, &new_text, None);
        prop_assert!(
            reparsed.structurally_eq(&fresh),
            "incremental: {}\nfresh: {}",
            reparsed.to_sexp(),
            fresh.to_sexp()
        );
    }
}
