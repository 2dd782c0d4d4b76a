use serde::{Deserialize, Serialize};

use crate::asm::expr::{ExprError, Scope};
use crate::cpu::Trap;
use crate::instructions::{lookup, Form, InstrDesc, Op, Pair, Reg};

/// One instruction with every operand resolved. Fields an instruction does
/// not use keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub len: u8,
    pub dst: Reg,
    pub src: Reg,
    pub pair: Pair,
    pub imm: u16,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OperandError {
    #[error("invalid register: {0}")]
    InvalidRegister(String),
    #[error("invalid register pair: {0}")]
    InvalidRegisterPair(String),
    #[error("{mnemonic} only supports register pairs {allowed}, found {found}")]
    PairNotAllowed { mnemonic: &'static str, allowed: &'static str, found: String },
    #[error("could not resolve value: {0}")]
    Unresolved(String),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    Count { mnemonic: &'static str, expected: usize, found: usize },
    #[error("MOV M,M is not a valid instruction (opcode 0x76 is HLT)")]
    MovMemToMem,
    #[error("RST requires a number from 0-7, found {0}")]
    RstRange(i64),
}

fn reg(name: &str) -> Result<Reg, OperandError> {
    Reg::parse(name).ok_or_else(|| OperandError::InvalidRegister(name.to_string()))
}

fn pair(desc: &InstrDesc, name: &str, allowed: &[Pair], list: &'static str) -> Result<Pair, OperandError> {
    let p = Pair::parse(name).ok_or_else(|| OperandError::InvalidRegisterPair(name.to_string()))?;
    if !allowed.contains(&p) {
        return Err(OperandError::PairNotAllowed {
            mnemonic: desc.mnemonic,
            allowed: list,
            found: name.to_string(),
        });
    }
    Ok(p)
}

fn value(scope: &Scope<'_>, text: &str) -> Result<i64, OperandError> {
    scope
        .evaluate(text)?
        .ok_or_else(|| OperandError::Unresolved(text.to_string()))
}

// Immediates keep the low bits, so `0 - 1` assembles as FFH / FFFFH.
fn imm8(scope: &Scope<'_>, text: &str) -> Result<u16, OperandError> {
    Ok((value(scope, text)? & 0xFF) as u16)
}

fn imm16(scope: &Scope<'_>, text: &str) -> Result<u16, OperandError> {
    Ok((value(scope, text)? & 0xFFFF) as u16)
}

/// Resolves the operand text of one instruction. Shared by the assembler
/// (to encode) and the CPU (to execute), so both see the same values.
pub fn decode_operands<S: AsRef<str>>(
    desc: &InstrDesc,
    operands: &[S],
    scope: &Scope<'_>,
) -> Result<Decoded, OperandError> {
    let expected = desc.form.arity();
    if operands.len() != expected {
        return Err(OperandError::Count { mnemonic: desc.mnemonic, expected, found: operands.len() });
    }
    let arg = |i: usize| operands[i].as_ref().trim();

    let mut d = Decoded {
        op: desc.op,
        len: desc.len,
        dst: Reg::default(),
        src: Reg::default(),
        pair: Pair::default(),
        imm: 0,
    };
    match desc.form {
        Form::Implied => {}
        Form::Src => d.src = reg(arg(0))?,
        Form::Dst => d.dst = reg(arg(0))?,
        Form::RegReg => {
            d.dst = reg(arg(0))?;
            d.src = reg(arg(1))?;
            if d.dst == Reg::M && d.src == Reg::M {
                return Err(OperandError::MovMemToMem);
            }
        }
        Form::RegImm => {
            d.dst = reg(arg(0))?;
            d.imm = imm8(scope, arg(1))?;
        }
        Form::Pair => d.pair = pair(desc, arg(0), &[Pair::B, Pair::D, Pair::H, Pair::Sp], "B, D, H, SP")?,
        Form::PairImm => {
            d.pair = pair(desc, arg(0), &[Pair::B, Pair::D, Pair::H, Pair::Sp], "B, D, H, SP")?;
            d.imm = imm16(scope, arg(1))?;
        }
        Form::Stack => d.pair = pair(desc, arg(0), &[Pair::B, Pair::D, Pair::H, Pair::Psw], "B, D, H, PSW")?,
        Form::Indirect => d.pair = pair(desc, arg(0), &[Pair::B, Pair::D], "B, D")?,
        Form::Imm8 => d.imm = imm8(scope, arg(0))?,
        Form::Addr => d.imm = imm16(scope, arg(0))?,
        Form::Vector => {
            let n = value(scope, arg(0))?;
            if !(0..=7).contains(&n) {
                return Err(OperandError::RstRange(n));
            }
            d.imm = n as u16;
        }
    }
    Ok(d)
}

/// Turns one parsed-program token list (mnemonic first) into a `Decoded`.
pub trait Decoder {
    fn decode(&self, tokens: &[String], scope: &Scope<'_>) -> Result<Decoded, Trap>;
}

pub struct TokenDecoder;

impl Decoder for TokenDecoder {
    fn decode(&self, tokens: &[String], scope: &Scope<'_>) -> Result<Decoded, Trap> {
        let Some((mnemonic, operands)) = tokens.split_first() else {
            return Err(Trap::UnknownOpcode(String::new()));
        };
        let desc = lookup(mnemonic).ok_or_else(|| Trap::UnknownOpcode(mnemonic.clone()))?;
        decode_operands(desc, operands, scope).map_err(|source| Trap::Operand {
            op: mnemonic.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::expr::SymbolTable;
    use crate::instructions::Cond;

    fn decode(tokens: &[&str]) -> Result<Decoded, Trap> {
        let symbols = SymbolTable::from([("PORT".to_string(), 0x42)]);
        let labels = SymbolTable::from([("LOOP".to_string(), 0x2005)]);
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        TokenDecoder.decode(&tokens, &Scope::new(&symbols, &labels))
    }

    #[test]
    fn resolves_names_through_scope() {
        let d = decode(&["JNZ", "LOOP"]).unwrap();
        assert_eq!(d.op, Op::Jcc(Cond::Nz));
        assert_eq!(d.imm, 0x2005);
        assert_eq!(d.len, 3);
        assert_eq!(decode(&["OUT", "PORT"]).unwrap().imm, 0x42);
    }

    #[test]
    fn immediates_are_truncated() {
        assert_eq!(decode(&["MVI", "A", "1FFH"]).unwrap().imm, 0xFF);
        assert_eq!(decode(&["LXI", "H", "0 - 1"]).unwrap().imm, 0xFFFF);
    }

    #[test]
    fn rejects_bad_operands() {
        assert!(matches!(decode(&["MOV", "M", "M"]), Err(Trap::Operand { source: OperandError::MovMemToMem, .. })));
        assert!(matches!(decode(&["ADD", "X"]), Err(Trap::Operand { source: OperandError::InvalidRegister(_), .. })));
        assert!(matches!(decode(&["LDAX", "H"]), Err(Trap::Operand { source: OperandError::PairNotAllowed { .. }, .. })));
        assert!(matches!(decode(&["PUSH", "SP"]), Err(Trap::Operand { source: OperandError::PairNotAllowed { .. }, .. })));
        assert!(matches!(decode(&["RST", "8"]), Err(Trap::Operand { source: OperandError::RstRange(8), .. })));
        assert!(matches!(decode(&["JMP", "NOWHERE"]), Err(Trap::Operand { source: OperandError::Unresolved(_), .. })));
        assert!(matches!(decode(&["FOO"]), Err(Trap::UnknownOpcode(_))));
    }
}
