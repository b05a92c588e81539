//! Minimal driver binary exercising [`frontc::Compiler`] (§1: "Command-line
//! driver ... is not specified"; this is the smallest possible exerciser,
//! not a supported CLI surface).

use clap::Parser as ClapParser;
use frontc::{Compiler, Endianness, TargetProperties};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "frontc", about = "Front-end core driver (lex/parse/resolve/consteval one file)")]
struct Cli {
    /// Source file to compile.
    path: PathBuf,

    /// Pointer width in bytes for the target the memory manager assumes.
    #[arg(long, default_value_t = 8)]
    pointer_size: u32,

    /// Assume a big-endian target instead of the host's endianness.
    #[arg(long)]
    big_endian: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut compiler = Compiler::new();
    compiler.set_target_properties(TargetProperties {
        pointer_size: cli.pointer_size,
        endianness: if cli.big_endian { Endianness::Big } else { Endianness::host() },
    });

    match compiler.compile_file(&cli.path) {
        Ok(unit) => {
            println!(
                "{}: {} type(s), {} global(s), {} function(s)",
                cli.path.display(),
                unit.types.len(),
                unit.globals.len(),
                unit.functions.len()
            );
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            for d in &diagnostics {
                eprintln!("{d}");
            }
            ExitCode::FAILURE
        }
    }
}
