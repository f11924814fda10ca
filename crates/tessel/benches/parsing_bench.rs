use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tessel::grammar::*;
use tessel::{InputEdit, Language, Parser};

fn language() -> Language {
    let grammar = GrammarBuilder::new("bench")
        .rule("program", repeat(sym("statement")))
        .rule("statement", seq([field("name", sym("identifier")), lit("="), sym("_expression"), lit(";")]))
        .rule(
            "_expression",
            choice([sym("binary"), sym("identifier"), sym("number"), sym("parenthesized")]),
        )
        .rule(
            "binary",
            choice([
                prec_left(1, seq([sym("_expression"), lit("+"), sym("_expression")])),
                prec_left(2, seq([sym("_expression"), lit("*"), sym("_expression")])),
            ]),
        )
        .rule("parenthesized", seq([lit("("), sym("_expression"), lit(")")]))
        .token("identifier", pat("[a-z_][a-z0-9_]*"))
        .token("number", pat("[0-9]+"))
        .extra(pat(r"\s+"))
        .build()
        .expect("bench grammar");
    Language::compile(&grammar).expect("bench grammar compiles")
}

fn source(statements: usize) -> Vec<u8> {
    let mut text = String::new();
    for i in 0..statements {
        text.push_str(&format!("value_{i} = (a + {i}) * b + c * {i};\n"));
    }
    text.into_bytes()
}

fn bench_compile(c: &mut Criterion) {
    let grammar = GrammarBuilder::new("compile")
        .rule("sum", choice([prec_left(1, seq([sym("sum"), lit("+"), sym("num")])), sym("num")]))
        .token("num", pat("[0-9]+"))
        .build()
        .expect("grammar");
    c.bench_function("compile_sum_grammar", |b| {
        b.iter(|| Language::compile(black_box(&grammar)).expect("compiles"));
    });
}

fn bench_full_parse(c: &mut Criterion) {
    let language = language();
    let mut group = c.benchmark_group("full_parse");
    for statements in [10, 100, 1000] {
        let text = source(statements);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(statements), &text, |b, text| {
            let mut parser = Parser::new(language.clone());
            b.iter(|| parser.parse(black_box(text), None).expect("not cancelled"));
        });
    }
    group.finish();
}

fn bench_incremental_parse(c: &mut Criterion) {
    let language = language();
    let mut group = c.benchmark_group("incremental_parse");
    for statements in [10, 100, 1000] {
        let text = source(statements);
        let mut parser = Parser::new(language.clone());
        let tree = parser.parse(&text, None).expect("not cancelled");
        let middle = text.len() / 2;
        let digit = text[middle..]
            .iter()
            .position(u8::is_ascii_digit)
            .map_or(middle, |offset| middle + offset);
        let (new_text, edit) = InputEdit::replace(&text, digit..digit + 1, b"7");
        let edited = tree.edit(&edit);
        group.bench_with_input(BenchmarkId::from_parameter(statements), &new_text, |b, new_text| {
            b.iter(|| parser.parse(black_box(new_text), Some(&edited)).expect("not cancelled"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_full_parse, bench_incremental_parse);
criterion_main!(benches);
