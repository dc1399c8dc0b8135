//! Comment stripping and `` `define `` substitution.

use crate::config::AsmConfig;
use crate::error::{AsmError, Result};
use crate::line::{Line, Program};
use std::collections::HashMap;
use tracing::debug;

/// Splits raw source into token lines, dropping comments and blank lines.
pub fn clean<S: AsRef<str>>(source: &[S], cfg: &AsmConfig) -> Program {
    let mut program = Program::new();
    for (i, raw) in source.iter().enumerate() {
        let mut tokens: Vec<&str> = raw.as_ref().split_whitespace().collect();
        if !cfg.comment_delimiter.is_empty() {
            if let Some(c) = tokens.iter().position(|t| t.starts_with(&cfg.comment_delimiter)) {
                tokens.truncate(c);
            }
        }
        if !tokens.is_empty() {
            program.push(Line::new(tokens, i + 1));
        }
    }
    debug!(lines = program.len(), "cleaned source");
    program
}

/// Indexes and removes define lines, then substitutes whole tokens once.
/// Returns the number of defines applied.
pub fn apply_defines(program: &mut Program, cfg: &AsmConfig) -> Result<usize> {
    let mut defines: HashMap<String, String> = HashMap::new();
    for line in program.iter() {
        if !line.first().eq_ignore_ascii_case(&cfg.define_keyword) {
            continue;
        }
        if line.tokens.len() != 3 {
            return Err(AsmError::preprocess(
                format!("{} can only contain 2 arguments. Got: {line}", cfg.define_keyword),
                line.source_line,
            ));
        }
        let before = line.tokens[1].clone();
        if defines.contains_key(&before) {
            return Err(AsmError::preprocess(
                format!("{line} already exists."),
                line.source_line,
            ));
        }
        defines.insert(before, line.tokens[2].clone());
    }

    program.retain(|l| !l.first().eq_ignore_ascii_case(&cfg.define_keyword));

    if !defines.is_empty() {
        for line in program.iter_mut() {
            for token in line.tokens.iter_mut() {
                if let Some(after) = defines.get(token.as_str()) {
                    *token = after.clone();
                }
            }
        }
    }
    debug!(defines = defines.len(), "applied defines");
    Ok(defines.len())
}

pub fn preprocess<S: AsRef<str>>(source: &[S], cfg: &AsmConfig) -> Result<Program> {
    let mut program = clean(source, cfg);
    apply_defines(&mut program, cfg)?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Result<Vec<(String, usize)>> {
        let lines: Vec<&str> = src.lines().collect();
        let p = preprocess(&lines, &AsmConfig::default())?;
        Ok(p.iter().map(|l| (l.to_string(), l.source_line)).collect())
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let out = run("# header\n\n  ADD r1   r2 # trailing\nRET#x\n   \n").unwrap();
        assert_eq!(out, vec![("ADD r1 r2".to_string(), 3), ("RET#x".to_string(), 4)]);
    }

    #[test]
    fn substitutes_whole_tokens_once() {
        let src = "`define SIZE 0x10\n`DEFINE A B\n`define B C\nADDI r1 SIZE\nMOV A SIZEX\n";
        let out = run(src).unwrap();
        // `A` becomes `B`, which is not substituted again.
        assert_eq!(
            out,
            vec![("ADDI r1 0x10".to_string(), 4), ("MOV B SIZEX".to_string(), 5)]
        );
    }

    #[test]
    fn define_arity_is_checked() {
        let err = run("ADD r1 r2\n`define ONLY\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Preprocess);
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("can only contain 2 arguments"));
    }

    #[test]
    fn duplicate_define_is_fatal() {
        let err = run("`define X 1\n`define X 2\n").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.ends_with("already exists."));
    }

    #[test]
    fn comment_delimiter_is_configurable() {
        let cfg = AsmConfig {
            comment_delimiter: ";".into(),
            ..AsmConfig::default()
        };
        let p = preprocess(&["RET ; done", "#5"], &cfg).unwrap();
        let texts: Vec<String> = p.iter().map(ToString::to_string).collect();
        assert_eq!(texts, vec!["RET", "#5"]);
    }
}
