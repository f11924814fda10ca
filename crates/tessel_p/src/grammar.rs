// Also compiled into `build.rs` as a module.
use tessel::grammar::{
    choice, field, lit, optional, pat, prec, prec_left, prec_right, repeat, seq, sym, token, Grammar, GrammarBuilder,
    Rule,
};
use tessel::GrammarError;

/// One level of a left-associative binary operator chain:
/// `level -> next | level op next`.
fn binary(level: i32, this: &str, next: &str, operators: &[&str]) -> Rule {
    prec_left(
        level,
        choice([
            sym(next),
            seq([
                field("left", sym(this)),
                field("operator", choice(operators.iter().map(|op| lit(*op)))),
                field("right", sym(next)),
            ]),
        ]),
    )
}

/// Comma separated list with an optional trailing comma, possibly empty.
fn comma_list(item: Rule) -> Rule {
    optional(seq([item.clone(), repeat(seq([lit(","), item])), optional(lit(","))]))
}

/// The P grammar.
///
/// # Errors
///
/// Only if the rules below are inconsistent, which the crate's tests rule
/// out.
pub fn grammar() -> Result<Grammar, GrammarError> {
    GrammarBuilder::new("p")
        .rule("source_file", repeat(sym("declaration")))
        .rule(
            "declaration",
            choice([
                sym("object_declaration"),
                sym("function_declaration"),
                sym("variable_declaration"),
                sym("statement"),
            ]),
        )
        // Declarations
        .rule(
            "object_declaration",
            seq([
                lit("object"),
                field("name", sym("identifier")),
                optional(sym("extends_clause")),
                field("body", sym("block")),
            ]),
        )
        .rule("extends_clause", seq([lit("extends"), field("parent", sym("identifier"))]))
        .rule(
            "function_declaration",
            seq([
                lit("fn"),
                field("name", sym("identifier")),
                lit("("),
                comma_list(sym("function_parameter")),
                lit(")"),
                field("body", sym("block")),
            ]),
        )
        .rule("function_parameter", field("parameter", sym("identifier")))
        .rule(
            "variable_declaration",
            seq([
                lit("let"),
                field("name", sym("identifier")),
                optional(sym("variable_initializer")),
                lit(";"),
            ]),
        )
        .rule("variable_initializer", seq([lit("="), field("value", sym("expression"))]))
        // Statements
        .rule(
            "statement",
            choice([
                sym("expression_statement"),
                sym("for_statement"),
                sym("if_statement"),
                sym("print_statement"),
                sym("return_statement"),
                sym("while_statement"),
                sym("block"),
            ]),
        )
        .rule("expression_statement", seq([sym("expression"), lit(";")]))
        .rule(
            "for_statement",
            seq([
                lit("for"),
                lit("("),
                optional(field("initializer", sym("for_initializer"))),
                lit(";"),
                optional(field("condition", sym("for_condition"))),
                lit(";"),
                optional(field("increment", sym("for_increment"))),
                lit(")"),
                field("body", sym("statement")),
            ]),
        )
        .rule(
            "for_initializer",
            choice([
                seq([lit("let"), field("name", sym("identifier")), optional(sym("variable_initializer"))]),
                sym("expression"),
            ]),
        )
        .rule("for_condition", sym("expression"))
        .rule("for_increment", sym("expression"))
        // `else` binds to the nearest `if`.
        .rule(
            "if_statement",
            prec_right(
                0,
                seq([
                    lit("if"),
                    lit("("),
                    field("condition", sym("expression")),
                    lit(")"),
                    field("consequence", sym("statement")),
                    optional(field("alternative", sym("else_clause"))),
                ]),
            ),
        )
        .rule("else_clause", seq([lit("else"), sym("statement")]))
        .rule(
            "print_statement",
            seq([lit("print"), lit("("), field("argument", sym("expression")), lit(")"), lit(";")]),
        )
        .rule(
            "return_statement",
            seq([lit("return"), optional(field("value", sym("expression"))), lit(";")]),
        )
        .rule(
            "while_statement",
            seq([
                lit("while"),
                lit("("),
                field("condition", sym("expression")),
                lit(")"),
                field("body", sym("statement")),
            ]),
        )
        .rule("block", seq([lit("{"), repeat(sym("declaration")), lit("}")]))
        // Expressions, loosest binding first
        .rule("expression", sym("assignment_expression"))
        .rule(
            "assignment_expression",
            prec_right(
                1,
                choice([
                    sym("logical_or_expression"),
                    seq([
                        field("left", sym("logical_or_expression")),
                        lit("="),
                        field("right", sym("assignment_expression")),
                    ]),
                ]),
            ),
        )
        .rule(
            "logical_or_expression",
            binary(2, "logical_or_expression", "logical_and_expression", &["or"]),
        )
        .rule(
            "logical_and_expression",
            binary(3, "logical_and_expression", "equality_expression", &["and"]),
        )
        .rule(
            "equality_expression",
            binary(4, "equality_expression", "comparison_expression", &["==", "!="]),
        )
        .rule(
            "comparison_expression",
            binary(5, "comparison_expression", "term_expression", &[">", ">=", "<", "<="]),
        )
        .rule("term_expression", binary(6, "term_expression", "factor_expression", &["+", "-"]))
        .rule("factor_expression", binary(7, "factor_expression", "unary_expression", &["*", "/"]))
        .rule(
            "unary_expression",
            choice([
                sym("call_expression"),
                prec(
                    8,
                    seq([
                        field("operator", choice([lit("!"), lit("-")])),
                        field("operand", sym("unary_expression")),
                    ]),
                ),
            ]),
        )
        .rule(
            "call_expression",
            prec_left(
                9,
                choice([
                    sym("primary_expression"),
                    seq([
                        field("function", sym("call_expression")),
                        lit("("),
                        comma_list(sym("call_argument")),
                        lit(")"),
                    ]),
                    seq([
                        field("object", sym("call_expression")),
                        lit("."),
                        field("property", sym("identifier")),
                    ]),
                ]),
            ),
        )
        .rule("call_argument", sym("expression"))
        .rule(
            "primary_expression",
            choice([
                sym("true"),
                sym("false"),
                sym("nil"),
                sym("this"),
                sym("proto"),
                sym("number"),
                sym("string"),
                sym("identifier"),
                sym("parenthesized_expression"),
            ]),
        )
        .rule("parenthesized_expression", seq([lit("("), sym("expression"), lit(")")]))
        // Tokens
        .token("true", lit("true"))
        .token("false", lit("false"))
        .token("nil", lit("nil"))
        .token("this", lit("this"))
        .token("proto", lit("proto"))
        .token("number", token(seq([pat("[0-9]+"), optional(seq([lit("."), pat("[0-9]+")]))])))
        .token(
            "string",
            token(seq([lit("\""), repeat(choice([pat("[a-zA-Z0-9_]"), pat(r#"[^\\"]"#)])), lit("\"")])),
        )
        .token("identifier", pat("[a-zA-Z_][a-zA-Z0-9_]*"))
        .token(
            "comment",
            token(choice([
                seq([lit("//"), pat(".*")]),
                seq([lit("/*"), pat(r"[^*]*\*+([^/*][^*]*\*+)*"), lit("/")]),
            ])),
        )
        .extra(pat(r"\s+"))
        .extra(sym("comment"))
        .build()
}
