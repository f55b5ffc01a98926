//! `vmasm`: assemble VM source files into binary images.
//!
//! ```text
//! vmasm program.asm                 # writes program.bin
//! vmasm --isa extended -l - < a.asm > a.bin
//! ```

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::Level;
use vmasm::{AsmError, Assembler, AssemblyResult, DuplicateLabelPolicy, InstructionSet};

#[derive(Parser, Debug)]
#[command(name = "vmasm", version, about, long_about = None)]
struct Args {
    /// Assembly source file, or `-` for stdin
    input: PathBuf,

    /// Output file (default: input with a `.bin` extension, stdout for stdin)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Instruction set to assemble against
    #[arg(long, value_enum, default_value_t = Isa::Reference)]
    isa: Isa,

    /// Address of the first instruction (decimal or 0x hex)
    #[arg(long, value_name = "ADDR", default_value = "0", value_parser = parse_address)]
    origin: u64,

    /// Reject duplicate labels instead of letting the last one win
    #[arg(long)]
    strict_labels: bool,

    /// Write a listing to FILE (stdout when no file is given)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1, default_missing_value = "-")]
    listing: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Isa {
    /// `mov` only
    Reference,
    /// The full VM opcode map
    Extended,
}

impl Isa {
    fn table(self) -> &'static InstructionSet {
        match self {
            Isa::Reference => &InstructionSet::REFERENCE,
            Isa::Extended => &InstructionSet::EXTENDED,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: io::Error },
    Asm { path: PathBuf, source: AsmError },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            // Positioned errors already start with `line:col`.
            CliError::Asm { path, source } if source.span().is_some() => {
                write!(f, "{}:{}", path.display(), source)
            }
            CliError::Asm { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io { source, .. } => Some(source),
            CliError::Asm { source, .. } => Some(source),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let source = read_source(&args.input)?;
    tracing::info!(input = %args.input.display(), bytes = source.len(), "assembling");

    let result = assemble(args, &source).map_err(|source| CliError::Asm {
        path: args.input.clone(),
        source,
    })?;

    let output = output_path(&args.input, args.output.as_deref());
    write_bytes(&output, result.bytes())?;
    tracing::info!(output = %output.display(), bytes = result.len(), "wrote image");

    if let Some(listing) = &args.listing {
        write_listing(listing, &result)?;
    }
    Ok(())
}

fn assemble(args: &Args, source: &str) -> Result<AssemblyResult, AsmError> {
    let mut asm = Assembler::new();
    asm.instruction_set(args.isa.table())
        .base_address(args.origin);
    if args.strict_labels {
        asm.duplicate_labels(DuplicateLabelPolicy::Reject);
    }
    if args.listing.is_some() {
        asm.enable_listing();
    }
    asm.emit(source)?;
    asm.finish()
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Parse a decimal or `0x`-prefixed hexadecimal address.
fn parse_address(text: &str) -> Result<u64, String> {
    let text = text.trim().replace('_', "");
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{text}`: {e}"))
}

/// Where the image goes when `-o` is not given.
fn output_path(input: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None if is_stdio(input) => PathBuf::from("-"),
        None => input.with_extension("bin"),
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    let io_err = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if is_stdio(path) {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(io_err)?;
        Ok(source)
    } else {
        fs::read_to_string(path).map_err(io_err)
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    let io_err = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if is_stdio(path) {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes).map_err(io_err)?;
        stdout.flush().map_err(io_err)
    } else {
        fs::write(path, bytes).map_err(io_err)
    }
}

fn write_listing(path: &Path, result: &AssemblyResult) -> Result<(), CliError> {
    write_bytes(path, result.listing().as_bytes())
}
