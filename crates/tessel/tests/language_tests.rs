use tessel::grammar::*;
use tessel::language::blob::{read_header, ABI_VERSION, HEADER_LEN, MAGIC};
use tessel::{parse, GrammarError, Language, LoadError};

fn grammar() -> Grammar {
    GrammarBuilder::new("calc")
        .rule("program", repeat(sym("_expression")))
        .rule(
            "_expression",
            choice([sym("binary"), sym("number"), sym("parenthesized")]),
        )
        .rule(
            "binary",
            choice([
                prec_left(1, seq([field("left", sym("_expression")), lit("+"), field("right", sym("_expression"))])),
                prec_left(2, seq([field("left", sym("_expression")), lit("*"), field("right", sym("_expression"))])),
            ]),
        )
        .rule("parenthesized", seq([lit("("), sym("_expression"), lit(")")]))
        .token("number", pat("[0-9]+"))
        .extra(pat(r"\s+"))
        .build()
        .unwrap()
}

fn blob() -> Vec<u8> {
    Language::compile(&grammar()).unwrap().to_blob().unwrap()
}

#[test]
fn test_precedence_shapes_the_tree() {
    let language = Language::compile(&grammar()).unwrap();
    let tree = parse(&language, b"1 + 2 * 3", None);
    assert_eq!(
        tree.to_sexp(),
        "(program (binary left: (number) right: (binary left: (number) right: (number))))"
    );
}

#[test]
fn test_blob_round_trip_parses_identically() {
    let compiled = Language::compile(&grammar()).unwrap();
    let loaded = Language::from_blob(&compiled.to_blob().unwrap()).unwrap();
    let text = b"(1 + 2) * 3 4";
    assert_eq!(parse(&loaded, text, None).to_sexp(), parse(&compiled, text, None).to_sexp());
    assert_eq!(loaded.name(), "calc");
    assert_eq!(loaded.field_count(), 2);
    assert_eq!(loaded.state_count(), compiled.state_count());
}

#[test]
fn test_header_fields() {
    let bytes = blob();
    let header = read_header(&bytes).unwrap();
    assert_eq!(header.magic, MAGIC);
    assert_eq!(header.abi_version, ABI_VERSION);
    assert_eq!(header.total_size as usize, bytes.len());
}

#[test]
fn test_every_truncation_is_rejected() {
    let bytes = blob();
    for len in 0..bytes.len() {
        let result = Language::from_blob(&bytes[..len]);
        assert!(result.is_err(), "truncated to {len} bytes");
        if len < HEADER_LEN {
            assert!(matches!(result, Err(LoadError::TooSmall { .. })));
        }
    }
}

#[test]
fn test_every_flipped_payload_byte_is_rejected() {
    let bytes = blob();
    for index in HEADER_LEN..bytes.len() {
        let mut corrupt = bytes.clone();
        corrupt[index] ^= 0x55;
        assert!(
            matches!(Language::from_blob(&corrupt), Err(LoadError::ChecksumMismatch { .. })),
            "byte {index}"
        );
    }
}

#[test]
fn test_version_mismatch() {
    let mut bytes = blob();
    bytes[4..8].copy_from_slice(&(ABI_VERSION + 1).to_le_bytes());
    assert_eq!(
        Language::from_blob(&bytes).unwrap_err(),
        LoadError::VersionMismatch {
            expected: ABI_VERSION,
            found: ABI_VERSION + 1,
        }
    );
}

#[test]
fn test_invalid_magic() {
    let mut bytes = blob();
    bytes[0] = b'X';
    assert!(matches!(Language::from_blob(&bytes), Err(LoadError::InvalidMagic { .. })));
}

#[test]
fn test_size_mismatch() {
    let mut bytes = blob();
    bytes.push(0);
    assert!(matches!(Language::from_blob(&bytes), Err(LoadError::SizeMismatch { .. })));
}

#[test]
fn test_consistent_checksum_over_garbage_fails_to_decode() {
    let mut bytes = blob();
    bytes.truncate(HEADER_LEN);
    bytes.extend_from_slice(&[0xff; 8]);
    let checksum = crc32fast::hash(&bytes[HEADER_LEN..]);
    bytes[8..12].copy_from_slice(&checksum.to_le_bytes());
    let total = u32::try_from(bytes.len()).unwrap();
    bytes[12..16].copy_from_slice(&total.to_le_bytes());
    assert!(matches!(Language::from_blob(&bytes), Err(LoadError::Decode(_))));
}

#[test]
fn test_grammar_errors() {
    let unreachable = GrammarBuilder::new("g")
        .rule("a", sym("x"))
        .rule("b", sym("x"))
        .token("x", lit("x"))
        .build();
    assert!(matches!(unreachable, Err(GrammarError::UnreachableRule { .. })));

    let unused = GrammarBuilder::new("g")
        .rule("a", sym("x"))
        .token("x", lit("x"))
        .token("y", lit("y"))
        .build();
    assert!(matches!(unused, Err(GrammarError::UnusedToken { .. })));

    let undefined = GrammarBuilder::new("g").rule("a", sym("missing")).build();
    assert!(matches!(undefined, Err(GrammarError::UndefinedSymbol { .. })));

    let empty = GrammarBuilder::new("g")
        .rule("a", sym("x"))
        .token("x", pat("a*"))
        .build();
    assert!(matches!(empty, Err(GrammarError::EmptyToken { .. })));
}
