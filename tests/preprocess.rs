use cr16_asm::preprocess::{apply_defines, clean, preprocess};
use cr16_asm::{assemble, AsmConfig, ErrorKind};
use pretty_assertions::assert_eq;

fn texts(src: &str) -> Vec<String> {
    let lines: Vec<&str> = src.lines().collect();
    preprocess(&lines, &AsmConfig::default())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn define_matches_literal() {
    let cfg = AsmConfig::default();
    let defined = assemble("`define SIZE 0x10\nADDI r1 SIZE\n", &cfg).unwrap();
    let literal = assemble("ADDI r1 0x10\n", &cfg).unwrap();
    assert_eq!(defined.words, literal.words);
}

#[test]
fn define_keyword_ignores_case() {
    assert_eq!(texts("`DEFINE N 3\nADDI r1 N\n"), vec!["ADDI r1 3"]);
}

#[test]
fn substitution_is_single_pass_and_whole_token() {
    let out = texts("`define A B\n`define B C\nADD A B\nADD AB r1\n");
    assert_eq!(out, vec!["ADD B C", "ADD AB r1"]);
}

#[test]
fn defines_may_name_labels() {
    let src = "`define TOP .top$r1\n.top\nNOP\nJUC TOP\n";
    let asm = assemble(src, &AsmConfig::default()).unwrap();
    assert_eq!(asm.words, vec![0x0070, 0xCEFE]);
}

#[test]
fn defines_match_whole_tokens_only() {
    let err = assemble("`define TOP .top\n.top\nNOP\nJUC TOP$r1\n", &AsmConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Grammar);
    assert_eq!(err.line, Some(4));
    assert_eq!(err.message, "Unrecognized register: TOP$r1");
}

#[test]
fn clean_keeps_source_lines() {
    let p = clean(&["", "# only a comment", "ADD r1 r2  # sum", "RET"], &AsmConfig::default());
    let got: Vec<(String, usize)> = p.iter().map(|l| (l.to_string(), l.source_line)).collect();
    assert_eq!(got, vec![("ADD r1 r2".to_string(), 3), ("RET".to_string(), 4)]);
}

#[test]
fn apply_defines_reports_count() {
    let cfg = AsmConfig::default();
    let mut p = clean(&["`define X r1", "`define Y r2", "ADD X Y"], &cfg);
    assert_eq!(apply_defines(&mut p, &cfg).unwrap(), 2);
    assert_eq!(p.len(), 1);
}

#[test]
fn malformed_defines() {
    let cfg = AsmConfig::default();
    let err = assemble("NOP\n`define A B C\n", &cfg).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Preprocess);
    assert_eq!(err.line, Some(2));
    assert_eq!(
        err.to_string(),
        "preprocess error on line 2: `define can only contain 2 arguments. Got: `define A B C"
    );

    let err = assemble("`define A 1\nNOP\n`define A 2\n", &cfg).unwrap_err();
    assert_eq!(err.line, Some(3));
}
