//! EQU resolution and the address-assigning first pass.

use std::collections::BTreeMap;

use tracing::debug;

use crate::asm::expr::{Scope, SymbolTable};
use crate::asm::source::{Statement, StmtKind};
use crate::asm::{AsmError, AsmErrorKind};

/// An EQU whose expression could not be evaluated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEqu {
    pub name: String,
    pub expr: String,
    pub line: usize,
}

/// Result of the first pass.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub labels: SymbolTable,
    pub line_to_address: BTreeMap<usize, u16>,
    pub address_to_line: BTreeMap<u16, usize>,
    pub starting_address: u16,
}

/// Collects every EQU and resolves as many as possible. Returns the ones
/// still waiting on labels.
pub fn collect_equs(stmts: &[Statement], symbols: &mut SymbolTable) -> Result<Vec<PendingEqu>, AsmError> {
    let mut pending: Vec<PendingEqu> = Vec::new();
    for stmt in stmts {
        if let StmtKind::Equ { name, expr } = &stmt.kind {
            if pending.iter().any(|p| &p.name == name) {
                return Err(AsmError::new(stmt.line, AsmErrorKind::DuplicateSymbol(name.clone())));
            }
            pending.push(PendingEqu { name: name.clone(), expr: expr.clone(), line: stmt.line });
        }
    }
    resolve_pending(&mut pending, symbols, &SymbolTable::new())?;
    debug!(resolved = symbols.len(), deferred = pending.len(), "EQU pre-pass");
    Ok(pending)
}

/// Fixpoint: evaluate until a round makes no progress.
pub fn resolve_pending(
    pending: &mut Vec<PendingEqu>,
    symbols: &mut SymbolTable,
    labels: &SymbolTable,
) -> Result<(), AsmError> {
    loop {
        let before = pending.len();
        let mut i = 0;
        while i < pending.len() {
            let value = Scope::new(symbols, labels)
                .evaluate(&pending[i].expr)
                .map_err(|e| AsmError::new(pending[i].line, e.into()))?;
            match value {
                Some(v) => {
                    let equ = pending.remove(i);
                    symbols.insert(equ.name, (v & 0xFFFF) as u16);
                }
                None => i += 1,
            }
        }
        if pending.is_empty() || pending.len() == before {
            return Ok(());
        }
    }
}

/// Fails with every still-unresolved name, reported on the first one's line.
pub fn ensure_resolved(pending: &[PendingEqu]) -> Result<(), AsmError> {
    let Some(first) = pending.first() else {
        return Ok(());
    };
    let names: Vec<&str> = pending.iter().map(|p| p.name.as_str()).collect();
    Err(AsmError::new(first.line, AsmErrorKind::UnresolvedEqu(names.join(", "))))
}

/// Evaluates a directive operand that must be known right now.
pub(crate) fn directive_value(scope: &Scope<'_>, expr: &str, line: usize) -> Result<i64, AsmError> {
    scope
        .evaluate(expr)
        .map_err(|e| AsmError::new(line, e.into()))?
        .ok_or_else(|| AsmError::new(line, AsmErrorKind::Unresolved(expr.to_string())))
}

pub(crate) fn org_address(scope: &Scope<'_>, expr: &str, line: usize) -> Result<u32, AsmError> {
    let v = directive_value(scope, expr, line)?;
    if !(0..=0xFFFF).contains(&v) {
        return Err(AsmError::new(line, AsmErrorKind::AddressRange(v)));
    }
    Ok(v as u32)
}

pub(crate) fn ds_size(scope: &Scope<'_>, expr: &str, line: usize) -> Result<u32, AsmError> {
    let v = directive_value(scope, expr, line)?;
    if !(0..=0x1_0000).contains(&v) {
        return Err(AsmError::new(line, AsmErrorKind::InvalidSize(v)));
    }
    Ok(v as u32)
}

/// Ensures `[addr, addr + len)` fits below 0x10000.
pub(crate) fn check_fits(addr: u32, len: u32, line: usize) -> Result<(), AsmError> {
    if addr + len > 0x1_0000 {
        return Err(AsmError::new(line, AsmErrorKind::AddressOverflow));
    }
    Ok(())
}

/// First pass: assigns an address to every label and instruction line.
pub fn assign_addresses(stmts: &[Statement], symbols: &SymbolTable) -> Result<Layout, AsmError> {
    let mut layout = Layout::default();
    let mut lc: u32 = 0;
    let mut seen_org = false;

    for stmt in stmts {
        if let Some(label) = &stmt.label {
            if layout.labels.contains_key(label) {
                return Err(AsmError::new(stmt.line, AsmErrorKind::DuplicateLabel(label.clone())));
            }
            // A trailing label just past FFFFH wraps like any 16-bit value.
            layout.labels.insert(label.clone(), (lc & 0xFFFF) as u16);
        }
        let scope = Scope::new(symbols, &layout.labels);
        match &stmt.kind {
            StmtKind::Empty | StmtKind::Equ { .. } => {}
            StmtKind::Org(expr) => {
                lc = org_address(&scope, expr, stmt.line)?;
                if !seen_org {
                    layout.starting_address = lc as u16;
                    seen_org = true;
                }
            }
            StmtKind::Ds(expr) => {
                let size = ds_size(&scope, expr, stmt.line)?;
                check_fits(lc, size, stmt.line)?;
                lc += size;
            }
            StmtKind::End => break,
            StmtKind::Instr { desc, .. } => {
                check_fits(lc, u32::from(desc.len), stmt.line)?;
                layout.line_to_address.insert(stmt.line, lc as u16);
                layout.address_to_line.insert(lc as u16, stmt.line);
                lc += u32::from(desc.len);
            }
        }
    }
    debug!(
        labels = layout.labels.len(),
        instructions = layout.line_to_address.len(),
        start = layout.starting_address,
        "address pass"
    );
    Ok(layout)
}
