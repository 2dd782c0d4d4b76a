use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use i8085_rs::{assemble, parse_number, Cpu, CpuConfig, Status};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble and run an 8085 program on the i8085-rs simulator")]
struct Opts {
    /// Stop after this many instructions
    #[arg(long, default_value_t = 1_000_000u64)]
    max_steps: u64,
    /// CPU configuration as JSON (e.g. {"reset_sp": 65535})
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Final state format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Dump memory from this address after the run (e.g. 2000H)
    #[arg(long, value_name = "ADDR")]
    dump: Option<String>,
    /// Bytes to dump
    #[arg(long, default_value_t = 16usize)]
    dump_len: usize,
    #[arg(value_name = "SOURCE")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(path: Option<&PathBuf>) -> Result<CpuConfig> {
    let Some(path) = path else {
        return Ok(CpuConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let source = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let lines: Vec<&str> = source.lines().collect();
    let out = assemble(&lines)?;

    let mut cpu = Cpu::new(load_config(opts.config.as_ref())?);
    cpu.load_program(out);

    let mut steps = 0u64;
    let mut status = cpu.status();
    while status == Status::Ok && steps < opts.max_steps {
        status = cpu.step();
        steps += 1;
    }

    match opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cpu.snapshot())?),
        OutputFormat::Text => {
            let r = &cpu.regs;
            println!("status: {status:?} after {steps} step(s)");
            if let Some(err) = &cpu.error {
                println!("error:  {err}");
            }
            println!(
                "A={:02X} B={:02X} C={:02X} D={:02X} E={:02X} H={:02X} L={:02X} SP={:04X} PC={:04X}",
                r.a, r.b, r.c, r.d, r.e, r.h, r.l, r.sp, r.pc
            );
            let f = |name: &str| u8::from(cpu.flag(name).unwrap_or(false));
            println!("S={} Z={} AC={} P={} C={}", f("S"), f("Z"), f("AC"), f("P"), f("C"));
        }
    }

    if let Some(addr) = opts.dump {
        let start = parse_number(&addr)?;
        anyhow::ensure!(start <= 0xFFFF, "dump address must be in 0000H-FFFFH");
        let end = (start as usize + opts.dump_len).min(0x1_0000);
        for (i, row) in cpu.mem.as_slice()[start as usize..end].chunks(16).enumerate() {
            let hex: Vec<String> = row.iter().map(|b| format!("{b:02X}")).collect();
            println!("{:04X}: {}", start as usize + i * 16, hex.join(" "));
        }
    }

    Ok(())
}
