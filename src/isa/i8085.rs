use crate::decoder::Decoded;
use crate::instructions::{Cond, Op};

/// Intel 8085 opcode byte for a decoded instruction.
///
/// Register fields: `r` is B=0 .. M=6, A=7; `rp` is B=0, D=1, H=2, SP=3.
/// PUSH/POP PSW land on the SP slot (F5/F1).
pub fn opcode(d: &Decoded) -> u8 {
    let r_src = d.src.code();
    let r_dst = d.dst.code() << 3;
    let rp = d.pair.code() << 4;
    let cc = |c: Cond| c.code() << 3;
    match d.op {
        Op::Mov => 0x40 | r_dst | r_src,
        Op::Mvi => 0x06 | r_dst,
        Op::Lxi => 0x01 | rp,
        Op::Lda => 0x3A,
        Op::Sta => 0x32,
        Op::Lhld => 0x2A,
        Op::Shld => 0x22,
        Op::Ldax => 0x0A | rp,
        Op::Stax => 0x02 | rp,
        Op::Xchg => 0xEB,
        Op::Add => 0x80 | r_src,
        Op::Adc => 0x88 | r_src,
        Op::Sub => 0x90 | r_src,
        Op::Sbb => 0x98 | r_src,
        Op::Ana => 0xA0 | r_src,
        Op::Xra => 0xA8 | r_src,
        Op::Ora => 0xB0 | r_src,
        Op::Cmp => 0xB8 | r_src,
        Op::Adi => 0xC6,
        Op::Aci => 0xCE,
        Op::Sui => 0xD6,
        Op::Sbi => 0xDE,
        Op::Ani => 0xE6,
        Op::Xri => 0xEE,
        Op::Ori => 0xF6,
        Op::Cpi => 0xFE,
        Op::Inr => 0x04 | r_dst,
        Op::Dcr => 0x05 | r_dst,
        Op::Inx => 0x03 | rp,
        Op::Dcx => 0x0B | rp,
        Op::Dad => 0x09 | rp,
        Op::Daa => 0x27,
        Op::Cma => 0x2F,
        Op::Cmc => 0x3F,
        Op::Stc => 0x37,
        Op::Rlc => 0x07,
        Op::Rrc => 0x0F,
        Op::Ral => 0x17,
        Op::Rar => 0x1F,
        Op::Jmp => 0xC3,
        Op::Jcc(c) => 0xC2 | cc(c),
        Op::Call => 0xCD,
        Op::Ccc(c) => 0xC4 | cc(c),
        Op::Ret => 0xC9,
        Op::Rcc(c) => 0xC0 | cc(c),
        Op::Rst => 0xC7 | ((d.imm as u8 & 0x07) << 3),
        Op::Pchl => 0xE9,
        Op::Push => 0xC5 | rp,
        Op::Pop => 0xC1 | rp,
        Op::Xthl => 0xE3,
        Op::Sphl => 0xF9,
        Op::In => 0xDB,
        Op::Out => 0xD3,
        Op::Ei => 0xFB,
        Op::Di => 0xF3,
        Op::Rim => 0x20,
        Op::Sim => 0x30,
        Op::Nop => 0x00,
        Op::Hlt => 0x76,
    }
}

/// Machine code bytes; 16-bit operands are little-endian.
pub fn encode(d: &Decoded) -> Vec<u8> {
    let mut out = Vec::with_capacity(d.len as usize);
    out.push(opcode(d));
    match d.len {
        2 => out.push(d.imm as u8),
        3 => out.extend_from_slice(&d.imm.to_le_bytes()),
        _ => {}
    }
    out
}
