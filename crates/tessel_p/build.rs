use std::fmt::Write as _;
use std::path::PathBuf;
use tessel::Language;

#[path = "src/grammar.rs"]
#[allow(dead_code)]
mod grammar;

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=src/grammar.rs");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    let grammar = grammar::grammar().unwrap_or_else(|err| panic!("invalid P grammar: {err}"));
    let language = Language::compile(&grammar).unwrap_or_else(|err| panic!("P grammar does not compile: {err}"));
    let blob = language.to_blob().unwrap_or_else(|err| panic!("cannot encode P language: {err}"));

    std::fs::write(out_dir.join("p.tslg"), &blob).expect("failed to write p.tslg");
    std::fs::write(out_dir.join("kinds.rs"), kinds_source(&language)).expect("failed to write kinds.rs");
}

/// Source of the `SyntaxKind` enum: one variant per visible named symbol,
/// plus `Error`.
fn kinds_source(language: &Language) -> String {
    let mut kinds: Vec<(String, String, u16)> = Vec::new();
    for id in 0..language.symbol_count() {
        let symbol = tessel::syntax::Symbol(id as u16);
        if !language.symbol_is_named(symbol) || !language.symbol_is_visible(symbol) {
            continue;
        }
        let name = language.symbol_name(symbol);
        if kinds.iter().any(|(_, existing, _)| existing == name) {
            continue;
        }
        kinds.push((camel_case(name), name.to_string(), symbol.0));
    }

    let mut out = String::new();
    out.push_str("/// Named node kinds of the P grammar.\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str("pub enum SyntaxKind {\n");
    for (variant, name, _) in &kinds {
        let _ = writeln!(out, "    /// `{name}`");
        let _ = writeln!(out, "    {variant},");
    }
    out.push_str("    /// Error node produced by recovery.\n    Error,\n}\n\n");

    out.push_str("impl SyntaxKind {\n");
    out.push_str("    pub const ALL: &'static [Self] = &[\n");
    for (variant, _, _) in &kinds {
        let _ = writeln!(out, "        Self::{variant},");
    }
    out.push_str("        Self::Error,\n    ];\n\n");
    out.push_str("    /// Node kind name, as returned by `SyntaxNode::kind`.\n");
    out.push_str("    #[must_use]\n    pub const fn name(self) -> &'static str {\n        match self {\n");
    for (variant, name, _) in &kinds {
        let _ = writeln!(out, "            Self::{variant} => {name:?},");
    }
    out.push_str("            Self::Error => \"ERROR\",\n        }\n    }\n}\n\n");

    out.push_str("impl tessel::syntax::SyntaxKind for SyntaxKind {\n");
    out.push_str("    fn from_symbol(symbol: tessel::syntax::Symbol) -> Option<Self> {\n        match symbol.0 {\n");
    for (variant, _, id) in &kinds {
        let _ = writeln!(out, "            {id} => Some(Self::{variant}),");
    }
    out.push_str("            u16::MAX => Some(Self::Error),\n            _ => None,\n        }\n    }\n\n");
    out.push_str("    fn symbol(self) -> tessel::syntax::Symbol {\n        match self {\n");
    for (variant, _, id) in &kinds {
        let _ = writeln!(out, "            Self::{variant} => tessel::syntax::Symbol({id}),");
    }
    out.push_str("            Self::Error => tessel::syntax::Symbol::ERROR,\n        }\n    }\n}\n");
    out
}

fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect()
}
