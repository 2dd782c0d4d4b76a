//! Two-pass assembler.
//!
//! Source lines are case-folded and lexed into statements, EQU symbols are
//! resolved by fixpoint iteration, the first pass assigns addresses to labels
//! and instructions, and the second pass encodes bytes into a 64 KiB image.

pub mod expr;
pub mod source;
pub mod symbols;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::decoder::{decode_operands, OperandError};
use crate::isa::i8085;
use crate::memory::{AddressSet, Bus, Memory};
use expr::{ExprError, Scope, SymbolTable};
use source::StmtKind;

/// An assembly failure, tagged with its 1-based source line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Line {line}: {kind}")]
pub struct AsmError {
    pub line: usize,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(line: usize, kind: AsmErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    #[error("invalid symbol name: {0}")]
    InvalidSymbol(String),
    #[error("{0} requires an operand")]
    MissingOperand(&'static str),
    #[error("EQU requires a symbol name")]
    MissingSymbolName,
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    OperandCount { mnemonic: &'static str, expected: usize, found: usize },
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),
    #[error("Duplicate symbol: {0}")]
    DuplicateSymbol(String),
    #[error("Could not resolve EQU symbols: {0}")]
    UnresolvedEqu(String),
    #[error("could not resolve value: {0}")]
    Unresolved(String),
    #[error("address out of range: {0}")]
    AddressRange(i64),
    #[error("invalid DS size: {0}")]
    InvalidSize(i64),
    #[error("program exceeds the 64K address space")]
    AddressOverflow,
    #[error(transparent)]
    Operand(#[from] OperandError),
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// One emitted instruction: where it lives and the tokens the CPU executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedInstruction {
    pub address: u16,
    /// Mnemonic first, then each operand as written (upper-cased).
    pub tokens: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct AssemblyOutput {
    pub memory: Memory,
    pub parsed_program: Vec<ParsedInstruction>,
    pub line_to_address: BTreeMap<usize, u16>,
    pub address_to_line: BTreeMap<u16, usize>,
    pub labels: SymbolTable,
    pub symbols: SymbolTable,
    pub program_memory_range: AddressSet,
    pub data_memory_range: AddressSet,
    pub starting_address: u16,
    /// One past the last byte of the last emitted instruction.
    pub program_end_address: u32,
}

impl AssemblyOutput {
    pub fn instruction_at(&self, address: u16) -> Option<&ParsedInstruction> {
        self.parsed_program.iter().find(|p| p.address == address)
    }

    pub fn line_of(&self, address: u16) -> Option<usize> {
        self.address_to_line.get(&address).copied()
    }

    /// The bytes `ins` was encoded to.
    pub fn instruction_bytes(&self, ins: &ParsedInstruction) -> &[u8] {
        let len = ins
            .tokens
            .first()
            .and_then(|m| crate::instructions::lookup(m))
            .map_or(1, |d| u32::from(d.len));
        self.memory.range(ins.address, u32::from(ins.address) + len)
    }
}

/// Assembles a whole program.
pub fn assemble<S: AsRef<str>>(lines: &[S]) -> Result<AssemblyOutput, AsmError> {
    let stmts = source::parse_program(lines)?;

    let mut symbols = SymbolTable::new();
    let mut pending = symbols::collect_equs(&stmts, &mut symbols)?;
    let layout = symbols::assign_addresses(&stmts, &symbols)?;
    symbols::resolve_pending(&mut pending, &mut symbols, &layout.labels)?;
    symbols::ensure_resolved(&pending)?;

    let labels = layout.labels;
    let scope = Scope::new(&symbols, &labels);
    let mut memory = Memory::new();
    let mut program_memory_range = AddressSet::new();
    let mut data_memory_range = AddressSet::new();
    let mut parsed_program = Vec::new();
    let mut program_end_address = 0u32;
    let mut lc: u32 = 0;

    for stmt in &stmts {
        match &stmt.kind {
            StmtKind::Empty | StmtKind::Equ { .. } => {}
            StmtKind::Org(expr) => lc = symbols::org_address(&scope, expr, stmt.line)?,
            StmtKind::Ds(expr) => {
                let size = symbols::ds_size(&scope, expr, stmt.line)?;
                symbols::check_fits(lc, size, stmt.line)?;
                for addr in lc..lc + size {
                    data_memory_range.insert(addr as u16);
                }
                lc += size;
            }
            StmtKind::End => break,
            StmtKind::Instr { desc, operands } => {
                let decoded = decode_operands(desc, operands.as_slice(), &scope)
                    .map_err(|e| AsmError::new(stmt.line, e.into()))?;
                let bytes = i8085::encode(&decoded);
                symbols::check_fits(lc, bytes.len() as u32, stmt.line)?;
                let address = lc as u16;
                for (i, b) in bytes.iter().enumerate() {
                    let at = address.wrapping_add(i as u16);
                    memory.write_u8(at, *b);
                    program_memory_range.insert(at);
                }
                let mut tokens = Vec::with_capacity(operands.len() + 1);
                tokens.push(desc.mnemonic.to_string());
                tokens.extend(operands.iter().cloned());
                parsed_program.push(ParsedInstruction { address, tokens, line: stmt.line });
                lc += bytes.len() as u32;
                program_end_address = lc;
            }
        }
    }

    debug!(
        instructions = parsed_program.len(),
        code_bytes = program_memory_range.len(),
        data_bytes = data_memory_range.len(),
        end = program_end_address,
        "assembled"
    );

    Ok(AssemblyOutput {
        memory,
        parsed_program,
        line_to_address: layout.line_to_address,
        address_to_line: layout.address_to_line,
        labels,
        symbols,
        program_memory_range,
        data_memory_range,
        starting_address: layout.starting_address,
        program_end_address,
    })
}
