//! Perfilar CLI: GPU kernel-launch profile report
//!
//! Reads recorded kernel-launch records (JSON lines) from a file or stdin
//! and writes one classified row per kernel with FLOPs, bytes, tensor-core
//! usage, and reconstructed operation parameters.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;

use perfilar::output::{default_columns, Column, Writer};
use perfilar::{Engine, KernelRecord, PerfilarError, Result};

/// Perfilar: classify recorded GPU kernels and compute analytical costs
///
/// Examples:
///   perfilar profile.jsonl
///   perfilar profile.jsonl --csv > report.csv
///   perfilar profile.jsonl -c idx,mod,op,params,flops -w 120
#[derive(Parser)]
#[command(name = "perfilar")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input profile (JSON lines); stdin when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Emit CSV instead of space-separated or columned output
    #[arg(long)]
    csv: bool,

    /// Comma-separated output columns
    ///
    /// Available: idx, seq, altseq, tid, layer, trace, dir, sub, mod, op,
    /// kernel, params, sil, tc, device, stream, grid, block, flops, bytes
    #[arg(short = 'c', long, value_name = "COLS")]
    columns: Option<String>,

    /// Total width of columned output (0 = plain space-separated)
    #[arg(short = 'w', long, default_value_t = 0)]
    width: usize,
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let columns = match &cli.columns {
        Some(keys) => Column::parse_list(keys)?,
        None => default_columns(),
    };
    let writer = Writer::new(columns, cli.csv, cli.width)?;

    let reader = open_input(cli.file.as_ref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut engine = Engine::new();

    writer.header(&mut out)?;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = KernelRecord::from_json_line(&line, lineno + 1)?;
        let row = engine.process(record)?;
        writer.row(&mut out, &row)?;
    }
    out.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => {},
        // A downstream pager closing the pipe is not a failure.
        Err(PerfilarError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {},
        Err(e) => {
            eprintln!("perfilar: {e}");
            std::process::exit(1);
        },
    }
}
