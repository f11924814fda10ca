#![cfg(feature = "parallel")]

use tessel::grammar::*;
use tessel::{parse_batch, Language, ParseBatch, ParseOptions};

fn language() -> Language {
    let grammar = GrammarBuilder::new("list")
        .rule("list", seq([lit("["), optional(sym("_items")), lit("]")]))
        .rule("_items", seq([sym("item"), repeat(seq([lit(","), sym("item")]))]))
        .token("item", pat("[a-z0-9]+"))
        .extra(pat(r"\s+"))
        .build()
        .unwrap();
    Language::compile(&grammar).unwrap()
}

#[test]
fn test_batch_matches_sequential_parses() {
    let language = language();
    let mut batch = ParseBatch::new();
    for i in 0..32 {
        let items: Vec<String> = (0..i).map(|n| format!("x{n}")).collect();
        batch.add(format!("file{i}"), format!("[{}]", items.join(", ")));
    }
    batch.add("broken", "[a, , b");

    let results = parse_batch(&language, &batch, &ParseOptions::default());
    assert_eq!(results.len(), batch.len());
    for (result, (file_id, content)) in results.iter().zip(&batch.files) {
        assert_eq!(&result.file_id, file_id);
        let sequential = tessel::parse(&language, content, None);
        assert!(result.tree.structurally_eq(&sequential));
    }
    assert!(results[..32].iter().all(|result| result.is_ok()));
    assert!(!results[32].is_ok());
}

#[test]
fn test_batch_respects_cancellation_options() {
    let mut batch = ParseBatch::new();
    batch.add("a", "[a, b, c, d, e, f]");
    let results = parse_batch(&language(), &batch, &ParseOptions::new().operation_budget(1));
    assert!(results[0].cancelled);
    assert!(!results[0].is_ok());
}
