use crate::decoder::{Decoded, Decoder};
use crate::instructions::{InstrDesc, TABLE};

/// CompactRISC16 decoder.
///
/// Opcodes `0000` and `1111` are shared by many instructions and split on the
/// extension nibble; `J[cond]` and `B[cond]` are further split on bits 8-11.
/// `NOP` is an alias of `OR r0 r0` and is never produced.
#[derive(Debug, Default)]
pub struct Cr16Decoder;

impl Cr16Decoder {
    pub fn new() -> Self {
        Self
    }

    fn find(raw: u16) -> Option<&'static InstrDesc> {
        TABLE
            .iter()
            .filter(|d| !d.is_alias())
            .find(|d| raw & d.fixed_mask() == d.fixed_bits())
    }
}

impl Decoder for Cr16Decoder {
    fn decode(&self, raw: u16) -> Option<Decoded> {
        let desc = Self::find(raw)?;
        let decoded = Decoded {
            desc,
            operands: desc.extract(raw),
        };
        // Bits outside every field (e.g. the rdest nibble of J/CALL) must be clear.
        (decoded.encode() == raw).then_some(decoded)
    }
}
