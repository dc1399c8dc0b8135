use crate::decoder::Decoded;
use crate::instructions::{Format, Operand};

/// Renders a decoded word as source text that assembles back to the same word.
pub fn fmt_decoded(d: &Decoded) -> String {
    let mut out = d.mnemonic().to_string();
    for (i, op) in d.operands.iter().enumerate() {
        out.push(' ');
        match (d.desc.format, i, op) {
            // Immediates of ALU forms read best as hex bytes.
            (Format::RdestImm, 1, Operand::Imm(v)) => out.push_str(&format!("{v:#04x}")),
            _ => out.push_str(&op.to_string()),
        }
    }
    out
}
