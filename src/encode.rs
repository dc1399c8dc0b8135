use crate::error::{AsmError, ErrorKind, Result};
use crate::instructions::lookup;
use crate::line::{Line, Program};
use crate::number::parse_number;
use tracing::debug;

const WORD_MIN: i32 = i16::MIN as i32;
const WORD_MAX: i32 = u16::MAX as i32;

/// Encodes one fully resolved line: an instruction, or a bare data word.
pub fn encode_line(line: &Line) -> Result<u16> {
    if let Some(desc) = lookup(line.first()) {
        return desc
            .assemble(&line.tokens)
            .map_err(|e| AsmError::grammar(e, line.source_line));
    }

    let value = parse_number(line.first()).map_err(|_| {
        AsmError::new(
            ErrorKind::Grammar,
            format!("Unknown instruction or assembly number: {line}"),
            line.source_line,
        )
    })?;
    if line.tokens.len() > 1 {
        return Err(AsmError::new(
            ErrorKind::Grammar,
            "Only one assembly number per line is allowed.",
            line.source_line,
        ));
    }
    if !(WORD_MIN..=WORD_MAX).contains(&value) {
        return Err(AsmError::new(
            ErrorKind::Grammar,
            format!("Assembly number does not fit in 16 bits: {line}"),
            line.source_line,
        ));
    }
    Ok(value as u16)
}

pub fn encode(program: &Program) -> Result<Vec<u16>> {
    let words = program.iter().map(encode_line).collect::<Result<Vec<_>>>()?;
    debug!(words = words.len(), "encoded program");
    Ok(words)
}
