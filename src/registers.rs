use crate::error::IsaError;
use std::fmt;

/// One of the sixteen general registers, stored by its 4-bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(u8);

pub const NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "rsp",
];

pub const R0: Register = Register(0);
pub const RSP: Register = Register(15);

impl Register {
    pub fn from_index(index: u8) -> Option<Self> {
        (index < 16).then_some(Self(index))
    }

    /// Names are case-sensitive.
    pub fn parse(name: &str) -> Result<Self, IsaError> {
        NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| Self(i as u8))
            .ok_or_else(|| IsaError::UnknownRegister(name.to_string()))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NAMES[self.0 as usize]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
