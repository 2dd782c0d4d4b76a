//! Constant expressions over EQU symbols, labels and numeric literals.
//!
//! Operators are `+ - * / & | ^ << >>`, applied strictly left to right:
//! `2 * 3 + 1` is 7 and `1 + 2 * 3` is 9.

use std::collections::BTreeMap;

pub type SymbolTable = BTreeMap<String, u16>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("malformed expression: {0}")]
    Malformed(String),
    #[error("division by zero in: {0}")]
    DivideByZero(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid number: {0}")]
pub struct InvalidNumber(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok<'a> {
    Operand(&'a str),
    Op(BinOp),
}

/// Parses a literal: hexadecimal when it ends in `H`/`h`, decimal otherwise.
pub fn parse_number(text: &str) -> Result<u32, InvalidNumber> {
    let t = text.trim();
    let (digits, radix) = match t.strip_suffix('H').or_else(|| t.strip_suffix('h')) {
        Some(hex) => (hex, 16),
        None => (t, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(InvalidNumber(t.to_string()));
    }
    u32::from_str_radix(digits, radix).map_err(|_| InvalidNumber(t.to_string()))
}

fn tokenize(expr: &str) -> Vec<Tok<'_>> {
    let bytes = expr.as_bytes();
    let mut toks = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        let two = bytes.get(i..i + 2);
        let op = match (bytes[i], two) {
            (_, Some(b"<<")) => Some((BinOp::Shl, 2)),
            (_, Some(b">>")) => Some((BinOp::Shr, 2)),
            (b'+', _) => Some((BinOp::Add, 1)),
            (b'-', _) => Some((BinOp::Sub, 1)),
            (b'*', _) => Some((BinOp::Mul, 1)),
            (b'/', _) => Some((BinOp::Div, 1)),
            (b'&', _) => Some((BinOp::And, 1)),
            (b'|', _) => Some((BinOp::Or, 1)),
            (b'^', _) => Some((BinOp::Xor, 1)),
            _ => None,
        };
        let boundary = op.is_some() || bytes[i].is_ascii_whitespace();
        if boundary {
            if let Some(s) = start.take() {
                toks.push(Tok::Operand(&expr[s..i]));
            }
        }
        match op {
            Some((op, width)) => {
                toks.push(Tok::Op(op));
                i += width;
            }
            None => {
                if !boundary && start.is_none() {
                    start = Some(i);
                }
                i += 1;
            }
        }
    }
    if let Some(s) = start {
        toks.push(Tok::Operand(&expr[s..]));
    }
    toks
}

/// Name resolution context: EQU symbols shadow labels, labels shadow literals.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub symbols: &'a SymbolTable,
    pub labels: &'a SymbolTable,
}

impl<'a> Scope<'a> {
    pub fn new(symbols: &'a SymbolTable, labels: &'a SymbolTable) -> Self {
        Self { symbols, labels }
    }

    fn operand(&self, text: &str) -> Result<Option<i64>, ExprError> {
        if let Some(v) = self.symbols.get(text) {
            return Ok(Some(i64::from(*v)));
        }
        if let Some(v) = self.labels.get(text) {
            return Ok(Some(i64::from(*v)));
        }
        match parse_number(text) {
            Ok(v) => Ok(Some(i64::from(v))),
            // Names never start with a digit, so this can only be a bad literal.
            Err(_) if text.starts_with(|c: char| c.is_ascii_digit()) => {
                Err(ExprError::InvalidNumber(text.to_string()))
            }
            Err(_) => Ok(None),
        }
    }

    /// `Ok(None)` means some operand is not (yet) known; callers defer or
    /// report it. Only malformed syntax is an error.
    pub fn evaluate(&self, expr: &str) -> Result<Option<i64>, ExprError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut toks = tokenize(expr);
        // A leading minus negates the first operand.
        if matches!(toks.first(), Some(Tok::Op(BinOp::Sub))) {
            toks.insert(0, Tok::Operand("0"));
        }
        let malformed = || ExprError::Malformed(expr.to_string());

        // Shape check first so a bad expression is reported even when it
        // also names something unresolved.
        if toks.len() % 2 == 0 {
            return Err(malformed());
        }
        for (i, t) in toks.iter().enumerate() {
            let want_operand = i % 2 == 0;
            if want_operand != matches!(t, Tok::Operand(_)) {
                return Err(malformed());
            }
        }

        let mut values = Vec::with_capacity(toks.len() / 2 + 1);
        for t in &toks {
            if let Tok::Operand(text) = t {
                match self.operand(text)? {
                    Some(v) => values.push(v),
                    None => return Ok(None),
                }
            }
        }

        let mut acc = values[0];
        let ops = toks.iter().filter_map(|t| match t {
            Tok::Op(op) => Some(*op),
            Tok::Operand(_) => None,
        });
        for (op, rhs) in ops.zip(values.into_iter().skip(1)) {
            acc = match op {
                BinOp::Add => acc.wrapping_add(rhs),
                BinOp::Sub => acc.wrapping_sub(rhs),
                BinOp::Mul => acc.wrapping_mul(rhs),
                BinOp::Div => {
                    if rhs == 0 {
                        return Err(ExprError::DivideByZero(expr.to_string()));
                    }
                    acc.div_euclid(rhs)
                }
                BinOp::And => acc & rhs,
                BinOp::Or => acc | rhs,
                BinOp::Xor => acc ^ rhs,
                BinOp::Shl => acc.wrapping_shl(rhs.clamp(0, 63) as u32),
                BinOp::Shr => acc.wrapping_shr(rhs.clamp(0, 63) as u32),
            };
        }
        Ok(Some(acc))
    }
}
