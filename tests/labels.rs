use cr16_asm::decoder::Decoder;
use cr16_asm::instructions::{Format, Operand};
use cr16_asm::isa::cr16::Cr16Decoder;
use cr16_asm::{assemble, AsmConfig, Assembly, ErrorKind};
use pretty_assertions::assert_eq;

fn asm(src: &str) -> Assembly {
    assemble(src, &AsmConfig::default()).unwrap()
}

fn nops(n: usize) -> String {
    "NOP\n".repeat(n)
}

/// Every address a word sequence loads or branches to.
fn targets(words: &[u16]) -> Vec<usize> {
    let dec = Cr16Decoder::new();
    let mut out = Vec::new();
    for (pc, &w) in words.iter().enumerate() {
        let Some(d) = dec.decode(w) else { continue };
        match (d.desc.format, d.operands.as_slice()) {
            (Format::Branch(_) | Format::CallD, [Operand::Imm(disp)]) => {
                out.push((pc as i64 + 1 + *disp as i64) as usize);
            }
            (Format::RdestImm, [Operand::Reg(r), Operand::Imm(lo)]) if d.mnemonic() == "MOVIL" => {
                let next = words.get(pc + 1).and_then(|&n| dec.decode(n));
                if let Some(upper) = next.filter(|u| u.mnemonic() == "MOVIU") {
                    if let [Operand::Reg(r2), Operand::Imm(hi)] = upper.operands.as_slice() {
                        assert_eq!(r, r2);
                        out.push((*lo | (*hi << 8)) as usize);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[test]
fn every_reference_lands_on_its_label() {
    let src = format!(
        ".start\nMOV r1 .data\nJEQ .start$r2\n{}.mid\nCALL .far$r3\nJNE .mid$r4\n{}.far\nRET\n.data\n0xBEEF\n",
        nops(10),
        nops(3000),
    );
    let a = asm(&src);
    let mut addrs: Vec<usize> = a.symbols.iter().map(|s| s.address).collect();
    addrs.sort();
    let mut got = targets(&a.words);
    got.sort();
    got.dedup();
    assert_eq!(got, addrs);
    assert_eq!(a.words[*addrs.last().unwrap()], 0xBEEF);
    assert!(a.diagnostics.is_empty());
}

#[test]
fn mov_loads_label_address() {
    let a = asm("ADD r1 r1\nADD r1 r1\nMOV r2 .loop\nADD r1 r1\n.loop\nRET\n");
    assert_eq!(a.words[2..4], [0xA205, 0xB200]);
    assert_eq!(a.symbols[0].address, 5);
}

#[test]
fn near_jump_becomes_branch() {
    let a = asm(&format!("JEQ .target$r3\n{}.target\nRET\n", nops(10)));
    assert_eq!(a.words[0], 0xC00A);
    assert_eq!(a.words.len(), 12);
}

#[test]
fn far_jump_keeps_loading_register() {
    let a = asm(&format!("JEQ .target$r3\n{}.target\nRET\n", nops(5000)));
    // 5003 == 0x138b
    assert_eq!(a.words[..3], [0xA38B, 0xB313, 0xF023]);
    assert_eq!(a.symbols[0].address, 5003);
}

#[test]
fn branch_range_edges() {
    // Forward: displacement equals the NOP count.
    assert_eq!(asm(&format!("JUC .x$r1\n{}.x\nRET\n", nops(127))).words.len(), 129);
    assert_eq!(asm(&format!("JUC .x$r1\n{}.x\nRET\n", nops(128))).words.len(), 132);

    // Backward: judged against the expanded form, three words further away.
    let back = |n| asm(&format!(".x\n{}JUC .x$r1\n", nops(n)));
    let a = back(125);
    assert_eq!(a.words.len(), 126);
    assert_eq!(a.words[125], 0xCE82); // BUC -126
    assert_eq!(back(126).words.len(), 129);
}

#[test]
fn calld_range_edges() {
    assert_eq!(asm(&format!("CALL .f$r1\n{}.f\nRET\n", nops(2047))).words[0], 0xD7FF);
    assert_eq!(asm(&format!("CALL .f$r1\n{}.f\nRET\n", nops(2048))).words[2], 0xF031);
}

#[test]
fn relaxation_is_a_single_sweep() {
    // The first jump is 128 away until the second collapses, and is not revisited.
    let src = format!("JUC .end$r1\nJUC .b$r2\n.b\n{}.end\nRET\n", nops(125));
    let a = asm(&src);
    assert_eq!(a.words[..4], [0xA181, 0xB100, 0xFE21, 0xCE00]);
    assert_eq!(a.words.len(), 130);
}

#[test]
fn mov_ignores_loading_register() {
    let a = asm("MOV r2 .x$r5\n.x\nRET\n");
    assert_eq!(a.words, vec![0xA202, 0xB200, 0xF040]);
    let lines: Vec<String> = a.program.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["MOVIL r2 0x2", "MOVIU r2 0x0", "RET"]);
    assert!(lines.iter().all(|l| !l.contains("r5")));
}

#[test]
fn labels_may_target_data_words() {
    let a = asm("MOV r1 .table\nRET\n.table\n0x1234\n");
    assert_eq!(a.words, vec![0xA103, 0xB100, 0xF040, 0x1234]);
}

#[test]
fn unused_labels_are_warnings_in_declaration_order() {
    let a = asm(".b\nNOP\n.a\nRET\n");
    let msgs: Vec<String> = a.diagnostics.iter().map(ToString::to_string).collect();
    assert_eq!(
        msgs,
        vec!["Warning on line 1: Unused label: .b", "Warning on line 3: Unused label: .a"]
    );
    assert_eq!(a.words.len(), 2);
}

#[test]
fn label_at_end_of_file_is_fatal() {
    let err = assemble("RET\n.end\n", &AsmConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Layout);
    assert_eq!(
        err.message,
        "Cannot get address for label: .end. An instruction or number must come after a label."
    );
}

#[test]
fn undefined_label_is_reported() {
    let err = assemble("NOP\nMOV r1 .nowhere\n", &AsmConfig::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "reference error on line 2: Undefined label reference: .nowhere"
    );
}
