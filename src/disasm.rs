use crate::decoder::Decoded;
use crate::instructions::{Form, TABLE};

/// Source-style text of a token list: `MVI A, 05H`.
pub fn fmt_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    match tokens.split_first() {
        None => String::new(),
        Some((m, [])) => m.as_ref().to_string(),
        Some((m, ops)) => {
            let ops: Vec<&str> = ops.iter().map(|o| o.as_ref()).collect();
            format!("{} {}", m.as_ref(), ops.join(", "))
        }
    }
}

/// Canonical text with every operand resolved to hex.
pub fn fmt_decoded(d: &Decoded) -> String {
    let Some(desc) = TABLE.iter().find(|t| t.op == d.op) else {
        return format!("{:?}", d.op);
    };
    let m = desc.mnemonic;
    match desc.form {
        Form::Implied => m.to_string(),
        Form::Src => format!("{m} {}", d.src.name()),
        Form::Dst => format!("{m} {}", d.dst.name()),
        Form::RegReg => format!("{m} {}, {}", d.dst.name(), d.src.name()),
        Form::RegImm => format!("{m} {}, {:02X}H", d.dst.name(), d.imm),
        Form::Pair | Form::Stack | Form::Indirect => format!("{m} {}", d.pair.name()),
        Form::PairImm => format!("{m} {}, {:04X}H", d.pair.name(), d.imm),
        Form::Imm8 => format!("{m} {:02X}H", d.imm),
        Form::Addr => format!("{m} {:04X}H", d.imm),
        Form::Vector => format!("{m} {}", d.imm),
    }
}
