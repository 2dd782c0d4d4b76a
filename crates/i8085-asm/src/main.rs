use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use i8085_asm::{
    assemble_file, build_listing, image_range, render_listing, render_symbols, segments, SymbolReport,
};
use i8085_rs::parse_number;

#[derive(Parser, Debug)]
#[command(author, version, about = "8085 assembler CLI", long_about = None)]
struct Cli {
    /// Assembly source path
    #[arg(value_name = "SOURCE")]
    input: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the raw memory image for [start, end)
    Build {
        /// Start address (e.g. 2000H or 8192); default: first ORG
        #[arg(long)]
        start: Option<String>,
        /// End address, exclusive; default: end of the last instruction
        #[arg(long)]
        end: Option<String>,
        /// Output file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Address, bytes and source text of every instruction
    Listing {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Labels and EQU symbols
    Symbols {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Contiguous code and data regions
    Segments {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_addr(s: Option<&str>) -> Result<Option<u32>> {
    s.map(|s| parse_number(s).map_err(anyhow::Error::from)).transpose()
}

fn emit(text: String, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

/// `RUST_LOG` filtered logs on stderr, keeping stdout for listings.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let asm = assemble_file(&cli.input)?;

    match cli.cmd {
        Command::Build { start, end, out } => {
            let start = parse_addr(start.as_deref())?;
            let end = parse_addr(end.as_deref())?;
            let bytes = image_range(&asm.output, start, end)?;
            std::fs::write(&out, bytes)?;
            eprintln!("wrote {} byte(s) to {}", bytes.len(), out.display());
        }
        Command::Listing { format, out } => {
            let rows = build_listing(&asm.output, &asm.lines);
            let text = match format {
                OutputFormat::Text => render_listing(&rows),
                OutputFormat::Json => serde_json::to_string_pretty(&rows)? + "\n",
            };
            emit(text, out)?;
        }
        Command::Symbols { format } => {
            let report = SymbolReport::from(&asm.output);
            match format {
                OutputFormat::Text => print!("{}", render_symbols(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Command::Segments { format } => {
            let segs = segments(&asm.output);
            match format {
                OutputFormat::Text => {
                    println!("{:<6} {:<6} {:<6} {:>6}", "kind", "start", "end", "len");
                    for s in &segs {
                        println!("{:<6} {:04X}H  {:04X}H  {:>6}", s.kind, s.start, s.end, s.len);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&segs)?),
            }
        }
    }
    Ok(())
}
