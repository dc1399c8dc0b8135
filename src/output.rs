//! Text renderings of an assembled program.

use crate::line::Program;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberBase {
    Binary,
    Decimal,
    #[default]
    Hex,
}

impl NumberBase {
    /// Characters per word, zero-padded.
    pub fn width(self) -> usize {
        match self {
            NumberBase::Binary => 16,
            NumberBase::Decimal => 5,
            NumberBase::Hex => 4,
        }
    }
}

/// Fill lines appended until the output has `max_line` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub max_line: usize,
    pub fill: u16,
}

pub fn format_word(word: u16, base: NumberBase) -> String {
    match base {
        NumberBase::Binary => format!("{word:016b}"),
        NumberBase::Decimal => format!("{word:05}"),
        NumberBase::Hex => format!("{word:04X}"),
    }
}

/// One word per line, then padding lines if the program is shorter than requested.
pub fn render_machine_code(words: &[u16], base: NumberBase, padding: Padding) -> String {
    let pad = padding.max_line.saturating_sub(words.len());
    let mut out = String::with_capacity((words.len() + pad) * (base.width() + 1));
    for &w in words {
        out.push_str(&format_word(w, base));
        out.push('\n');
    }
    let fill = format_word(padding.fill, base);
    for _ in 0..pad {
        out.push_str(&fill);
        out.push('\n');
    }
    out
}

/// Fully expanded source in three columns: mnemonic, operand 1, operand 2.
pub fn render_processed(program: &Program) -> String {
    let mut out = String::new();
    for line in program.iter() {
        let col = |i: usize| line.tokens.get(i).map(String::as_str).unwrap_or("");
        let row = format!("{:<5} {:<3} {}", col(0), col(1), col(2));
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}
