use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use i8085_rs::{assemble, AssemblyOutput};

/// Source text plus its assembly.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub lines: Vec<String>,
    pub output: AssemblyOutput,
}

pub fn assemble_text(text: &str) -> Result<Assembled> {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let output = assemble(&lines)?;
    Ok(Assembled { lines, output })
}

pub fn assemble_file(path: &Path) -> Result<Assembled> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    assemble_text(&text).with_context(|| format!("assembling {}", path.display()))
}

/// A maximal run of code or data addresses (`end` inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: &'static str,
    pub start: u16,
    pub end: u16,
    pub len: usize,
}

pub fn segments(out: &AssemblyOutput) -> Vec<Segment> {
    let mut segs: Vec<Segment> = Vec::new();
    for (kind, set) in [("code", &out.program_memory_range), ("data", &out.data_memory_range)] {
        segs.extend(set.runs().into_iter().map(|(start, end)| Segment {
            kind,
            start,
            end,
            len: usize::from(end - start) + 1,
        }));
    }
    segs.sort_by_key(|s| (s.start, s.kind));
    segs
}

/// Bytes in `[start, end)`; defaults to the assembled program span.
pub fn image_range(out: &AssemblyOutput, start: Option<u32>, end: Option<u32>) -> Result<&[u8]> {
    let start = start.unwrap_or(u32::from(out.starting_address));
    let end = end.unwrap_or(out.program_end_address);
    anyhow::ensure!(start <= 0xFFFF, "start must be in 0000H-FFFFH");
    anyhow::ensure!(end <= 0x1_0000, "end must be at most 10000H");
    anyhow::ensure!(end >= start, "end must be >= start");
    Ok(out.memory.range(start as u16, end))
}
