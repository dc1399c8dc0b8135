//! The CR16 instruction catalog.
//!
//! Every mnemonic maps to one immutable [`InstrDesc`]: its opcode, optional
//! opcode extension and operand [`Format`]. Words are built by OR-ing fields:
//!
//! ```text
//!  15    12 11     8 7      4 3      0
//! | opcode | rdest  |  ext   | rsrc   |   register forms
//! | opcode | rdest  |     imm8        |   immediate forms
//! | opcode |  cond  |  ext   | rtarget|   J[cond]
//! | opcode |  cond  |     disp8       |   B[cond]
//! | opcode |          disp12          |   CALLD
//! ```

use crate::error::IsaError;
use crate::number::parse_number;
use crate::registers::{Register, R0};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

pub const MOV: &str = "MOV";
pub const MOVIL: &str = "MOVIL";
pub const MOVIU: &str = "MOVIU";

/// Branch displacement (`B[cond]`), relative to the next word.
pub const BRANCH_DISP_MIN: i32 = -128;
pub const BRANCH_DISP_MAX: i32 = 127;
/// Call displacement (`CALLD`), relative to the next word.
pub const CALLD_DISP_MIN: i32 = -(1 << 11);
pub const CALLD_DISP_MAX: i32 = (1 << 11) - 1;

/// 8-bit immediates may be written signed or unsigned; the CPU decides.
const IMM8_MIN: i32 = -128;
const IMM8_MAX: i32 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    Eq,
    Ne,
    Cs,
    Cc,
    Fs,
    Fc,
    Lt,
    Le,
    Lo,
    Ls,
    Gt,
    Ge,
    Hi,
    Hs,
    Uc,
}

impl Cond {
    pub fn bits(self) -> u16 {
        self as u16
    }
}

/// Bit window of one operand inside the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub shift: u8,
    pub width: u8,
}

pub const RDEST_FIELD: Field = Field { shift: 8, width: 4 };
pub const LOW4: Field = Field { shift: 0, width: 4 };
pub const LOW8: Field = Field { shift: 0, width: 8 };
pub const LOW12: Field = Field { shift: 0, width: 12 };

impl Field {
    fn mask(self) -> u32 {
        (1u32 << self.width) - 1
    }

    pub fn pack(self, value: i32) -> u16 {
        (((value as u32) & self.mask()) << self.shift) as u16
    }

    /// Reads the field back, sign-extending when `signed`.
    pub fn extract(self, word: u16, signed: bool) -> i32 {
        let raw = ((word as u32) >> self.shift) & self.mask();
        if signed {
            let s = 32 - self.width as u32;
            ((raw << s) as i32) >> s
        } else {
            raw as i32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Reg(Field),
    Imm { min: i32, max: i32, field: Field },
}

impl Slot {
    fn field(self) -> Field {
        match self {
            Slot::Reg(f) | Slot::Imm { field: f, .. } => f,
        }
    }

    /// An immediate is decoded signed when its whole range fits the signed window.
    fn is_signed(self) -> bool {
        match self {
            Slot::Reg(_) => false,
            Slot::Imm { min, max, field } => min < 0 && max < (1 << (field.width - 1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    Imm(i32),
}

impl Operand {
    fn raw(self) -> i32 {
        match self {
            Operand::Reg(r) => r.index() as i32,
            Operand::Imm(v) => v,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(v) => write!(f, "{v}"),
        }
    }
}

/// Operand grammar of an instruction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    RdestRsrc,
    RdestImm,
    RdestImmLo,
    Rdest,
    Rsrc,
    Jump(Cond),
    Branch(Cond),
    Call,
    CallD,
    Ret,
    /// Pseudo-instruction; its fixed bits are exactly `OR r0 r0`.
    Nop,
}

const RDEST_RSRC: &[Slot] = &[Slot::Reg(RDEST_FIELD), Slot::Reg(LOW4)];
const RDEST_IMM: &[Slot] = &[
    Slot::Reg(RDEST_FIELD),
    Slot::Imm { min: IMM8_MIN, max: IMM8_MAX, field: LOW8 },
];
const RDEST_IMM_LO: &[Slot] = &[Slot::Reg(RDEST_FIELD), Slot::Imm { min: 0, max: 15, field: LOW4 }];
const RDEST: &[Slot] = &[Slot::Reg(RDEST_FIELD)];
const RLOW: &[Slot] = &[Slot::Reg(LOW4)];
const BRANCH_DISP: &[Slot] = &[Slot::Imm { min: BRANCH_DISP_MIN, max: BRANCH_DISP_MAX, field: LOW8 }];
const CALLD_DISP: &[Slot] = &[Slot::Imm { min: CALLD_DISP_MIN, max: CALLD_DISP_MAX, field: LOW12 }];

impl Format {
    pub fn slots(self) -> &'static [Slot] {
        match self {
            Format::RdestRsrc => RDEST_RSRC,
            Format::RdestImm => RDEST_IMM,
            Format::RdestImmLo => RDEST_IMM_LO,
            Format::Rdest => RDEST,
            Format::Rsrc | Format::Jump(_) | Format::Call => RLOW,
            Format::Branch(_) => BRANCH_DISP,
            Format::CallD => CALLD_DISP,
            Format::Ret | Format::Nop => &[],
        }
    }

    fn usage(self) -> &'static str {
        match self {
            Format::RdestRsrc => "<Rdest> <Rsrc>",
            Format::RdestImm => "<Rdest> <Imm>",
            Format::RdestImmLo => "<Rdest> <ImmLo>",
            Format::Rdest => "<Rdest>",
            Format::Rsrc => "<Rsrc>",
            Format::Jump(_) | Format::Call => "<Rtarget>",
            Format::Branch(_) | Format::CallD => "<Displacement Imm>",
            Format::Ret | Format::Nop => "",
        }
    }

    /// Legal displacement of a short-form control transfer.
    pub fn displacement_range(self) -> Option<(i32, i32)> {
        match self.slots() {
            [Slot::Imm { min, max, .. }] if matches!(self, Format::Branch(_) | Format::CallD) => {
                Some((*min, *max))
            }
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InstrDesc {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub ext: Option<u8>,
    pub format: Format,
}

const fn rr(mnemonic: &'static str, opcode: u8, ext: u8) -> InstrDesc {
    InstrDesc { mnemonic, opcode, ext: Some(ext), format: Format::RdestRsrc }
}

const fn ri(mnemonic: &'static str, opcode: u8) -> InstrDesc {
    InstrDesc { mnemonic, opcode, ext: None, format: Format::RdestImm }
}

const fn rlo(mnemonic: &'static str, opcode: u8, ext: u8) -> InstrDesc {
    InstrDesc { mnemonic, opcode, ext: Some(ext), format: Format::RdestImmLo }
}

const fn j(mnemonic: &'static str, cond: Cond) -> InstrDesc {
    InstrDesc { mnemonic, opcode: 0b1111, ext: Some(0b0010), format: Format::Jump(cond) }
}

const fn b(mnemonic: &'static str, cond: Cond) -> InstrDesc {
    InstrDesc { mnemonic, opcode: 0b1100, ext: None, format: Format::Branch(cond) }
}

const fn ext(mnemonic: &'static str, ext: u8, format: Format) -> InstrDesc {
    InstrDesc { mnemonic, opcode: 0b1111, ext: Some(ext), format }
}

pub const TABLE: &[InstrDesc] = &[
    rr("ADD", 0b0000, 0b0000),
    ri("ADDI", 0b0001),
    rr("ADDC", 0b0000, 0b0001),
    ri("ADDCI", 0b0010),
    rr("MUL", 0b0000, 0b0010),
    ri("MULI", 0b0011),
    rr("SUB", 0b0000, 0b0011),
    ri("SUBI", 0b0100),
    rr("CMP", 0b0000, 0b0100),
    ri("CMPI", 0b0101),
    rr("NOT", 0b0000, 0b0101),
    ri("NOTI", 0b0110),
    rr("AND", 0b0000, 0b0110),
    ri("ANDI", 0b0111),
    rr("OR", 0b0000, 0b0111),
    ri("ORI", 0b1000),
    rr("XOR", 0b0000, 0b1000),
    ri("XORI", 0b1001),
    rr("LSH", 0b0000, 0b1001),
    rlo("LSHI", 0b0000, 0b1010),
    rr("RSH", 0b0000, 0b1011),
    rlo("RSHI", 0b0000, 0b1100),
    rr("ALSH", 0b0000, 0b1101),
    rlo("ALSHI", 0b0000, 0b1110),
    rr("ARSH", 0b0000, 0b1111),
    rlo("ARSHI", 0b1111, 0b0000),
    rr(MOV, 0b1111, 0b0001),
    ri(MOVIL, 0b1010),
    ri(MOVIU, 0b1011),
    j("JEQ", Cond::Eq),
    j("JNE", Cond::Ne),
    j("JCS", Cond::Cs),
    j("JCC", Cond::Cc),
    j("JFS", Cond::Fs),
    j("JFC", Cond::Fc),
    j("JLT", Cond::Lt),
    j("JLE", Cond::Le),
    j("JLO", Cond::Lo),
    j("JLS", Cond::Ls),
    j("JGT", Cond::Gt),
    j("JGE", Cond::Ge),
    j("JHI", Cond::Hi),
    j("JHS", Cond::Hs),
    j("JUC", Cond::Uc),
    b("BEQ", Cond::Eq),
    b("BNE", Cond::Ne),
    b("BCS", Cond::Cs),
    b("BCC", Cond::Cc),
    b("BFS", Cond::Fs),
    b("BFC", Cond::Fc),
    b("BLT", Cond::Lt),
    b("BLE", Cond::Le),
    b("BLO", Cond::Lo),
    b("BLS", Cond::Ls),
    b("BGT", Cond::Gt),
    b("BGE", Cond::Ge),
    b("BHI", Cond::Hi),
    b("BHS", Cond::Hs),
    b("BUC", Cond::Uc),
    ext("CALL", 0b0011, Format::Call),
    InstrDesc { mnemonic: "CALLD", opcode: 0b1101, ext: None, format: Format::CallD },
    ext("RET", 0b0100, Format::Ret),
    ext("LPC", 0b0101, Format::Rdest),
    ext("LSF", 0b0110, Format::Rdest),
    ext("SSF", 0b0111, Format::Rsrc),
    ext("PUSH", 0b1000, Format::Rsrc),
    ext("POP", 0b1001, Format::Rdest),
    rr("LOAD", 0b1111, 0b1010),
    rr("STORE", 0b1111, 0b1011),
    rr("LOADX", 0b1111, 0b1100),
    rr("STOREX", 0b1111, 0b1101),
    InstrDesc { mnemonic: "NOP", opcode: 0b0000, ext: Some(0b0111), format: Format::Nop },
];

/// Finds a descriptor by exact (case-sensitive) mnemonic.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrDesc> {
    static BY_MNEMONIC: OnceLock<HashMap<&'static str, &'static InstrDesc>> = OnceLock::new();
    BY_MNEMONIC
        .get_or_init(|| TABLE.iter().map(|d| (d.mnemonic, d)).collect())
        .get(mnemonic)
        .copied()
}

impl InstrDesc {
    fn cond(&self) -> Option<Cond> {
        match self.format {
            Format::Jump(c) | Format::Branch(c) => Some(c),
            _ => None,
        }
    }

    /// Bits that identify this instruction regardless of operands.
    pub fn fixed_bits(&self) -> u16 {
        let mut w = (self.opcode as u16) << 12;
        if let Some(e) = self.ext {
            w |= (e as u16) << 4;
        }
        if let Some(c) = self.cond() {
            w |= c.bits() << 8;
        }
        w
    }

    pub fn fixed_mask(&self) -> u16 {
        let mut m = 0xF000;
        if self.ext.is_some() {
            m |= 0x00F0;
        }
        if self.cond().is_some() {
            m |= 0x0F00;
        }
        m
    }

    pub fn is_alias(&self) -> bool {
        self.format == Format::Nop
    }

    /// Displacement form that replaces this register jump/call, if any.
    pub fn short_form(&self) -> Option<&'static InstrDesc> {
        match self.format {
            Format::Jump(c) => TABLE.iter().find(|d| d.format == Format::Branch(c)),
            Format::Call => TABLE.iter().find(|d| d.format == Format::CallD),
            _ => None,
        }
    }

    pub fn usage(&self) -> String {
        let u = self.format.usage();
        if u.is_empty() {
            self.mnemonic.to_string()
        } else {
            format!("{} {}", self.mnemonic, u)
        }
    }

    /// Validates `tokens` (mnemonic first) against the operand grammar.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Operand>, IsaError> {
        let slots = self.format.slots();
        if tokens.len() != slots.len() + 1 {
            return Err(IsaError::Arity {
                expected: self.usage(),
                got: tokens.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" "),
            });
        }
        slots
            .iter()
            .zip(&tokens[1..])
            .map(|(slot, tok)| parse_operand(*slot, tok.as_ref()))
            .collect()
    }

    /// Packs already-validated operands into a word.
    pub fn encode(&self, operands: &[Operand]) -> u16 {
        self.format
            .slots()
            .iter()
            .zip(operands)
            .fold(self.fixed_bits(), |w, (slot, op)| w | slot.field().pack(op.raw()))
    }

    pub fn assemble<S: AsRef<str>>(&self, tokens: &[S]) -> Result<u16, IsaError> {
        let operands = self.parse(tokens)?;
        Ok(self.encode(&operands))
    }

    /// Reads the operand fields of `word`; the caller has matched `fixed_bits`.
    pub fn extract(&self, word: u16) -> Vec<Operand> {
        self.format
            .slots()
            .iter()
            .map(|slot| match *slot {
                Slot::Reg(f) => {
                    Operand::Reg(Register::from_index(f.extract(word, false) as u8).unwrap_or(R0))
                }
                Slot::Imm { field, .. } => Operand::Imm(field.extract(word, slot.is_signed())),
            })
            .collect()
    }
}

fn parse_operand(slot: Slot, token: &str) -> Result<Operand, IsaError> {
    match slot {
        Slot::Reg(_) => Register::parse(token).map(Operand::Reg),
        Slot::Imm { min, max, .. } => parse_immediate(token, min, max).map(Operand::Imm),
    }
}

pub fn parse_immediate(token: &str, min: i32, max: i32) -> Result<i32, IsaError> {
    let value = parse_number(token)?;
    if value < min {
        Err(IsaError::ImmediateBelow { value, min })
    } else if value > max {
        Err(IsaError::ImmediateAbove { value, max })
    } else {
        Ok(value)
    }
}
