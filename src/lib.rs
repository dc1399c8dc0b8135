//! Assembler for the CompactRISC16 (CR16) 16-bit load/store ISA.
//!
//! Source lines go through [`preprocess`], label [`resolve`]-ution with
//! branch/call relaxation, and [`encode`] into one 16-bit word per line.

pub mod config;
pub mod decoder;
pub mod disasm;
pub mod encode;
pub mod error;
pub mod instructions;
pub mod line;
pub mod number;
pub mod output;
pub mod preprocess;
pub mod registers;
pub mod resolve;

pub mod isa {
    pub mod cr16;
}

pub use config::AsmConfig;
pub use error::{AsmError, Diagnostic, ErrorKind, IsaError, Result};
pub use line::{Line, LineId, Program};
pub use output::{NumberBase, Padding};
pub use resolve::Symbol;

use tracing::info;

#[derive(Debug, Clone)]
pub struct Assembly {
    pub words: Vec<u16>,
    /// The program after expansion and relaxation, one line per word.
    pub program: Program,
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn assemble(source: &str, cfg: &AsmConfig) -> Result<Assembly> {
    let lines: Vec<&str> = source.lines().collect();
    assemble_lines(&lines, cfg)
}

pub fn assemble_lines<S: AsRef<str>>(source: &[S], cfg: &AsmConfig) -> Result<Assembly> {
    let mut program = preprocess::preprocess(source, cfg)?;
    let resolution = resolve::resolve(&mut program, cfg)?;
    let words = encode::encode(&program)?;
    info!(
        words = words.len(),
        labels = resolution.symbols.len(),
        expanded = resolution.expanded,
        relaxed = resolution.relaxed,
        "assembled"
    );
    Ok(Assembly {
        words,
        program,
        symbols: resolution.symbols,
        diagnostics: resolution.diagnostics,
    })
}
