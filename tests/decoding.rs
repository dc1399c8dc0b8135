use cr16_asm::decoder::Decoder;
use cr16_asm::disasm::fmt_decoded;
use cr16_asm::instructions::{lookup, Operand, Slot, TABLE};
use cr16_asm::isa::cr16::Cr16Decoder;
use cr16_asm::registers::Register;
use pretty_assertions::assert_eq;

fn sample_operands(slots: &[Slot], pick_max: bool) -> Vec<Operand> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| match *slot {
            Slot::Reg(_) => Operand::Reg(Register::from_index(if pick_max { 15 } else { 3 + i as u8 }).unwrap()),
            Slot::Imm { min, max, field } => {
                // Negative values only survive decoding in sign-extended fields.
                let signed = min < 0 && max < (1 << (field.width - 1));
                Operand::Imm(if pick_max { max } else if signed { min } else { 0 })
            }
        })
        .collect()
}

#[test]
fn every_descriptor_decodes_to_itself() {
    let dec = Cr16Decoder::new();
    for desc in TABLE.iter().filter(|d| !d.is_alias()) {
        for pick_max in [false, true] {
            let ops = sample_operands(desc.format.slots(), pick_max);
            let word = desc.encode(&ops);
            let d = dec.decode(word).unwrap_or_else(|| panic!("{} {word:#06x}", desc.mnemonic));
            assert_eq!(d.mnemonic(), desc.mnemonic);
            assert_eq!(d.operands, ops);
        }
    }
}

#[test]
fn fixed_bits_are_unique() {
    let mut seen = std::collections::HashMap::new();
    for desc in TABLE.iter().filter(|d| !d.is_alias()) {
        if let Some(other) = seen.insert((desc.fixed_bits(), desc.fixed_mask()), desc.mnemonic) {
            panic!("{} collides with {other}", desc.mnemonic);
        }
    }
}

#[test]
fn disassembly_reassembles_for_every_word() {
    let dec = Cr16Decoder::new();
    let mut decoded = 0usize;
    for word in 0..=u16::MAX {
        let Some(d) = dec.decode(word) else { continue };
        decoded += 1;
        let text = fmt_decoded(&d);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let desc = lookup(tokens[0]).unwrap();
        assert_eq!(desc.assemble(&tokens), Ok(word), "{text}");
    }
    // ALU immediates alone cover 11 * 16 * 256 words.
    assert!(decoded > 11 * 16 * 256);
}

#[test]
fn relaxed_forms_decode_to_displacements() {
    let dec = Cr16Decoder::new();
    let d = dec.decode(0xC00A).unwrap();
    assert_eq!((d.mnemonic(), d.operands.clone()), ("BEQ", vec![Operand::Imm(10)]));
    let d = dec.decode(0xDFFE).unwrap();
    assert_eq!((d.mnemonic(), d.operands.clone()), ("CALLD", vec![Operand::Imm(-2)]));
}
