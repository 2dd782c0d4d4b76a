//! Line lexer: one statement per source line.

use crate::asm::{AsmError, AsmErrorKind};
use crate::instructions::{lookup, InstrDesc};

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Label-only line.
    Empty,
    Equ { name: String, expr: String },
    Org(String),
    Ds(String),
    End,
    Instr { desc: &'static InstrDesc, operands: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Statement {
    /// 1-based source line.
    pub line: usize,
    pub label: Option<String>,
    pub kind: StmtKind,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_head(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn split_operands(
    desc: &InstrDesc,
    field: &str,
    line: usize,
) -> Result<Vec<String>, AsmError> {
    let count_err = |found: usize| {
        AsmError::new(
            line,
            AsmErrorKind::OperandCount { mnemonic: desc.mnemonic, expected: desc.form.arity(), found },
        )
    };
    let parts: Vec<String> = match desc.form.arity() {
        0 => {
            if !field.is_empty() {
                return Err(count_err(field.split(',').count()));
            }
            Vec::new()
        }
        1 => {
            if field.is_empty() {
                return Err(count_err(0));
            }
            if field.contains(',') {
                return Err(count_err(field.split(',').count()));
            }
            vec![field.to_string()]
        }
        _ => {
            if field.contains(',') {
                field.split(',').map(|p| p.trim().to_string()).collect()
            } else {
                // `MVI A 05H`: first word is the register, the rest is one value.
                let (first, rest) = split_head(field);
                [first, rest].iter().filter(|p| !p.is_empty()).map(|p| p.to_string()).collect()
            }
        }
    };
    if parts.len() != desc.form.arity() || parts.iter().any(|p| p.is_empty()) {
        let found = parts.iter().filter(|p| !p.is_empty()).count();
        return Err(count_err(found));
    }
    Ok(parts)
}

/// Parses one source line. Returns `None` for blank and comment-only lines.
pub fn parse_line(line: usize, raw: &str) -> Result<Option<Statement>, AsmError> {
    let upper = raw.to_uppercase();
    let text = upper.split(';').next().unwrap_or("").trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (head, mut rest) = split_head(text);
    let mut label = None;
    let mut mnemonic = head;

    if let Some((name, after)) = head.split_once(':') {
        if after.contains(':') || !is_identifier(name) {
            return Err(AsmError::new(line, AsmErrorKind::InvalidLabel(head.to_string())));
        }
        label = Some(name.to_string());
        if after.is_empty() {
            let (next, remainder) = split_head(rest);
            mnemonic = next;
            rest = remainder;
        } else {
            mnemonic = after;
        }
    } else {
        let (second, expr) = split_head(rest);
        if second == "EQU" {
            if !is_identifier(head) {
                return Err(AsmError::new(line, AsmErrorKind::InvalidSymbol(head.to_string())));
            }
            if expr.is_empty() {
                return Err(AsmError::new(line, AsmErrorKind::MissingOperand("EQU")));
            }
            return Ok(Some(Statement {
                line,
                label: None,
                kind: StmtKind::Equ { name: head.to_string(), expr: expr.to_string() },
            }));
        }
    }

    let kind = match mnemonic {
        "" => StmtKind::Empty,
        "EQU" => {
            // `NAME: EQU expr` names the symbol with the label.
            let Some(name) = label.take() else {
                return Err(AsmError::new(line, AsmErrorKind::MissingSymbolName));
            };
            if rest.is_empty() {
                return Err(AsmError::new(line, AsmErrorKind::MissingOperand("EQU")));
            }
            StmtKind::Equ { name, expr: rest.to_string() }
        }
        "ORG" if rest.is_empty() => {
            return Err(AsmError::new(line, AsmErrorKind::MissingOperand("ORG")));
        }
        "DS" if rest.is_empty() => {
            return Err(AsmError::new(line, AsmErrorKind::MissingOperand("DS")));
        }
        "ORG" => StmtKind::Org(rest.to_string()),
        "DS" => StmtKind::Ds(rest.to_string()),
        "END" => StmtKind::End,
        m => {
            let desc = lookup(m)
                .ok_or_else(|| AsmError::new(line, AsmErrorKind::UnknownInstruction(m.to_string())))?;
            let operands = split_operands(desc, rest, line)?;
            StmtKind::Instr { desc, operands }
        }
    };
    Ok(Some(Statement { line, label, kind }))
}

/// Lexes the whole program up to the first `END`. Past `END` only EQU
/// definitions are kept; anything else there is not examined.
pub fn parse_program<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Statement>, AsmError> {
    let mut out = Vec::new();
    let mut ended = false;
    for (i, raw) in lines.iter().enumerate() {
        if ended {
            if let Ok(Some(stmt)) = parse_line(i + 1, raw.as_ref()) {
                if matches!(stmt.kind, StmtKind::Equ { .. }) {
                    out.push(stmt);
                }
            }
            continue;
        }
        if let Some(stmt) = parse_line(i + 1, raw.as_ref())? {
            ended = matches!(stmt.kind, StmtKind::End);
            out.push(stmt);
        }
    }
    Ok(out)
}
