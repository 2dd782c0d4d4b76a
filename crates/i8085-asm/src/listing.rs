use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use i8085_rs::AssemblyOutput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub line: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolReport {
    pub labels: BTreeMap<String, u16>,
    pub symbols: BTreeMap<String, u16>,
}

impl From<&AssemblyOutput> for SymbolReport {
    fn from(out: &AssemblyOutput) -> Self {
        Self { labels: out.labels.clone(), symbols: out.symbols.clone() }
    }
}

/// One row per emitted instruction, in source order.
pub fn build_listing<S: AsRef<str>>(out: &AssemblyOutput, lines: &[S]) -> Vec<ListingRow> {
    out.parsed_program
        .iter()
        .map(|ins| ListingRow {
            address: ins.address,
            bytes: out.instruction_bytes(ins).to_vec(),
            line: ins.line,
            source: lines
                .get(ins.line - 1)
                .map(|l| l.as_ref().trim().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn render_listing(rows: &[ListingRow]) -> String {
    let mut buf = String::new();
    for r in rows {
        let hex: Vec<String> = r.bytes.iter().map(|b| format!("{b:02X}")).collect();
        let _ = writeln!(buf, "{:04X}  {:<9} {:>5}  {}", r.address, hex.join(" "), r.line, r.source);
    }
    buf
}

pub fn render_symbols(report: &SymbolReport) -> String {
    let mut buf = String::new();
    for (name, addr) in &report.labels {
        let _ = writeln!(buf, "{name:<16} {addr:04X}H  label");
    }
    for (name, value) in &report.symbols {
        let _ = writeln!(buf, "{name:<16} {value:04X}H  equ");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::assemble_text;
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_rows_carry_bytes_and_source() {
        let asm = assemble_text("COUNT EQU 3\n  ORG 100H\nSTART: MVI C, COUNT ; init\n  HLT\n").unwrap();
        let rows = build_listing(&asm.output, &asm.lines);
        assert_eq!(
            rows,
            vec![
                ListingRow {
                    address: 0x100,
                    bytes: vec![0x0E, 0x03],
                    line: 3,
                    source: "START: MVI C, COUNT ; init".into(),
                },
                ListingRow { address: 0x102, bytes: vec![0x76], line: 4, source: "HLT".into() },
            ]
        );
        let text = render_listing(&rows);
        assert!(text.starts_with("0100  0E 03"));
    }

    #[test]
    fn symbols_are_sorted_by_name() {
        let asm = assemble_text("B EQU 2\nA EQU 1\nZ: NOP\n").unwrap();
        let report = SymbolReport::from(&asm.output);
        assert_eq!(report.symbols.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        let first = render_symbols(&report).lines().next().map(str::to_string);
        assert_eq!(first, Some(format!("{:<16} 0000H  label", "Z")));
    }
}
