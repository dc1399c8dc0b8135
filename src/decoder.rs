use crate::instructions::{InstrDesc, Operand};

/// A machine word mapped back onto its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub desc: &'static InstrDesc,
    pub operands: Vec<Operand>,
}

impl Decoded {
    pub fn mnemonic(&self) -> &'static str {
        self.desc.mnemonic
    }

    /// Re-encodes; the result equals the decoded word.
    pub fn encode(&self) -> u16 {
        self.desc.encode(&self.operands)
    }
}

pub trait Decoder {
    fn decode(&self, raw: u16) -> Option<Decoded>;
}
