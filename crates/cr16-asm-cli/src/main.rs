use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cr16_asm::decoder::Decoder;
use cr16_asm::disasm::fmt_decoded;
use cr16_asm::isa::cr16::Cr16Decoder;
use cr16_asm::output::{format_word, render_machine_code, render_processed};
use cr16_asm::{assemble, AsmConfig, Assembly, NumberBase, Padding};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assembler for the CR16 16-bit ISA", long_about = None)]
struct Opts {
    /// Assembly source file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Machine code output (default: INPUT with a .dat extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Also write the fully expanded source next to INPUT
    #[arg(short = 'P', long)]
    processed_output: bool,
    /// Where to write the expanded source (implies --processed-output)
    #[arg(long, value_name = "FILE")]
    processed_file: Option<PathBuf>,
    /// Base used for each output word
    #[arg(short = 'b', long, value_enum, default_value_t = Base::Hex)]
    number_base: Base,
    /// Pad the output with fill lines up to this many lines
    #[arg(short = 'p', long, default_value_t = 0usize)]
    max_padding_line: usize,
    /// Fill value for padding lines
    #[arg(short = 'v', long, default_value_t = 0u16)]
    max_padding_line_value: u16,
    /// Export final label addresses as JSON
    #[arg(short, long, value_name = "FILE")]
    symbols: Option<PathBuf>,
    /// Print an address / word / disassembly listing
    #[arg(short, long)]
    listing: bool,
    /// Full error chains and debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Base {
    Binary,
    Decimal,
    Hex,
}

impl From<Base> for NumberBase {
    fn from(b: Base) -> Self {
        match b {
            Base::Binary => NumberBase::Binary,
            Base::Decimal => NumberBase::Decimal,
            Base::Hex => NumberBase::Hex,
        }
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("dat")
}

fn default_processed(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    input.with_file_name(format!("{stem}_processed.asm"))
}

fn listing(asm: &Assembly) -> String {
    let dec = Cr16Decoder::new();
    let mut out = String::new();
    for (addr, &word) in asm.words.iter().enumerate() {
        let text = dec
            .decode(word)
            .map(|d| fmt_decoded(&d))
            .unwrap_or_else(|| ".word".to_string());
        out.push_str(&format!("{addr:04x}: {}  {text}\n", format_word(word, NumberBase::Hex)));
    }
    out
}

/// Every file the run produces, rendered before any of them is written.
fn render_outputs(opts: &Opts, asm: &Assembly) -> Result<Vec<(PathBuf, String)>> {
    let padding = Padding {
        max_line: opts.max_padding_line,
        fill: opts.max_padding_line_value,
    };
    let out_path = opts.output.clone().unwrap_or_else(|| default_output(&opts.input));
    let mut outputs = vec![(
        out_path,
        render_machine_code(&asm.words, opts.number_base.into(), padding),
    )];

    let processed = match &opts.processed_file {
        Some(p) => Some(p.clone()),
        None if opts.processed_output => Some(default_processed(&opts.input)),
        None => None,
    };
    if let Some(path) = processed {
        outputs.push((path, render_processed(&asm.program)));
    }

    if let Some(path) = &opts.symbols {
        outputs.push((path.clone(), serde_json::to_string_pretty(&asm.symbols)?));
    }
    Ok(outputs)
}

fn run(opts: &Opts) -> Result<()> {
    let source = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;

    let asm = assemble(&source, &AsmConfig::default())?;
    for d in &asm.diagnostics {
        eprintln!("{d}");
    }

    for (path, text) in render_outputs(opts, &asm)? {
        std::fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), bytes = text.len(), "wrote output");
    }

    if opts.listing {
        print!("{}", listing(&asm));
    }
    Ok(())
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if opts.debug { "cr16_asm=debug,cr16asm=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if opts.debug => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
