use serde::{Deserialize, Serialize};

/// 8-bit register operand. Discriminants are the 3-bit codes used by the
/// encoder; `M` is the memory byte addressed by HL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reg {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    M = 6,
    #[default]
    A = 7,
}

impl Reg {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "B" => Some(Reg::B),
            "C" => Some(Reg::C),
            "D" => Some(Reg::D),
            "E" => Some(Reg::E),
            "H" => Some(Reg::H),
            "L" => Some(Reg::L),
            "M" => Some(Reg::M),
            "A" => Some(Reg::A),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::B => "B",
            Reg::C => "C",
            Reg::D => "D",
            Reg::E => "E",
            Reg::H => "H",
            Reg::L => "L",
            Reg::M => "M",
            Reg::A => "A",
        }
    }
}

/// Register pair operand. `Psw` is only legal for PUSH/POP, `Sp` only for
/// the 16-bit arithmetic and LXI forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pair {
    #[default]
    B,
    D,
    H,
    Sp,
    Psw,
}

impl Pair {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "B" => Some(Pair::B),
            "D" => Some(Pair::D),
            "H" => Some(Pair::H),
            "SP" => Some(Pair::Sp),
            "PSW" => Some(Pair::Psw),
            _ => None,
        }
    }

    /// 2-bit pair code; PSW shares slot 3 with SP in the PUSH/POP encodings.
    pub fn code(self) -> u8 {
        match self {
            Pair::B => 0,
            Pair::D => 1,
            Pair::H => 2,
            Pair::Sp | Pair::Psw => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Pair::B => "B",
            Pair::D => "D",
            Pair::H => "H",
            Pair::Sp => "SP",
            Pair::Psw => "PSW",
        }
    }
}

/// Branch condition, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cond {
    Nz = 0,
    Z = 1,
    Nc = 2,
    C = 3,
    Po = 4,
    Pe = 5,
    P = 6,
    M = 7,
}

impl Cond {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Cond::Nz => "NZ",
            Cond::Z => "Z",
            Cond::Nc => "NC",
            Cond::C => "C",
            Cond::Po => "PO",
            Cond::Pe => "PE",
            Cond::P => "P",
            Cond::M => "M",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // Data transfer
    Mov,
    Mvi,
    Lxi,
    Lda,
    Sta,
    Lhld,
    Shld,
    Ldax,
    Stax,
    Xchg,
    // Arithmetic
    Add,
    Adc,
    Sub,
    Sbb,
    Cmp,
    Adi,
    Aci,
    Sui,
    Sbi,
    Cpi,
    Inr,
    Dcr,
    Inx,
    Dcx,
    Dad,
    Daa,
    // Logical
    Ana,
    Xra,
    Ora,
    Ani,
    Xri,
    Ori,
    Cma,
    Cmc,
    Stc,
    Rlc,
    Rrc,
    Ral,
    Rar,
    // Branch
    Jmp,
    Jcc(Cond),
    Call,
    Ccc(Cond),
    Ret,
    Rcc(Cond),
    Rst,
    Pchl,
    // Stack, I/O and machine control
    Push,
    Pop,
    Xthl,
    Sphl,
    In,
    Out,
    Ei,
    Di,
    Rim,
    Sim,
    Nop,
    Hlt,
}

/// Operand shape of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// No operands.
    Implied,
    /// `r` in the low three bits (ADD, CMP, ...).
    Src,
    /// `r` in bits 3..5 (INR, DCR).
    Dst,
    /// `r,r` (MOV).
    RegReg,
    /// `r,data8` (MVI).
    RegImm,
    /// `rp` from B/D/H/SP.
    Pair,
    /// `rp,data16` (LXI).
    PairImm,
    /// `rp` from B/D/H/PSW (PUSH, POP).
    Stack,
    /// `rp` from B/D (LDAX, STAX).
    Indirect,
    /// `data8` or port number.
    Imm8,
    /// `addr16` or `data16`.
    Addr,
    /// Restart vector 0..7.
    Vector,
}

impl Form {
    pub fn arity(self) -> usize {
        match self {
            Form::Implied => 0,
            Form::RegReg | Form::RegImm | Form::PairImm => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub form: Form,
    pub len: u8,
}

const fn desc(mnemonic: &'static str, op: Op, form: Form, len: u8) -> InstrDesc {
    InstrDesc { op, mnemonic, form, len }
}

pub const TABLE: &[InstrDesc] = &[
    desc("MOV", Op::Mov, Form::RegReg, 1),
    desc("MVI", Op::Mvi, Form::RegImm, 2),
    desc("LXI", Op::Lxi, Form::PairImm, 3),
    desc("LDA", Op::Lda, Form::Addr, 3),
    desc("STA", Op::Sta, Form::Addr, 3),
    desc("LHLD", Op::Lhld, Form::Addr, 3),
    desc("SHLD", Op::Shld, Form::Addr, 3),
    desc("LDAX", Op::Ldax, Form::Indirect, 1),
    desc("STAX", Op::Stax, Form::Indirect, 1),
    desc("XCHG", Op::Xchg, Form::Implied, 1),
    desc("ADD", Op::Add, Form::Src, 1),
    desc("ADC", Op::Adc, Form::Src, 1),
    desc("SUB", Op::Sub, Form::Src, 1),
    desc("SBB", Op::Sbb, Form::Src, 1),
    desc("CMP", Op::Cmp, Form::Src, 1),
    desc("ADI", Op::Adi, Form::Imm8, 2),
    desc("ACI", Op::Aci, Form::Imm8, 2),
    desc("SUI", Op::Sui, Form::Imm8, 2),
    desc("SBI", Op::Sbi, Form::Imm8, 2),
    desc("CPI", Op::Cpi, Form::Imm8, 2),
    desc("INR", Op::Inr, Form::Dst, 1),
    desc("DCR", Op::Dcr, Form::Dst, 1),
    desc("INX", Op::Inx, Form::Pair, 1),
    desc("DCX", Op::Dcx, Form::Pair, 1),
    desc("DAD", Op::Dad, Form::Pair, 1),
    desc("DAA", Op::Daa, Form::Implied, 1),
    desc("ANA", Op::Ana, Form::Src, 1),
    desc("XRA", Op::Xra, Form::Src, 1),
    desc("ORA", Op::Ora, Form::Src, 1),
    desc("ANI", Op::Ani, Form::Imm8, 2),
    desc("XRI", Op::Xri, Form::Imm8, 2),
    desc("ORI", Op::Ori, Form::Imm8, 2),
    desc("CMA", Op::Cma, Form::Implied, 1),
    desc("CMC", Op::Cmc, Form::Implied, 1),
    desc("STC", Op::Stc, Form::Implied, 1),
    desc("RLC", Op::Rlc, Form::Implied, 1),
    desc("RRC", Op::Rrc, Form::Implied, 1),
    desc("RAL", Op::Ral, Form::Implied, 1),
    desc("RAR", Op::Rar, Form::Implied, 1),
    desc("JMP", Op::Jmp, Form::Addr, 3),
    desc("JNZ", Op::Jcc(Cond::Nz), Form::Addr, 3),
    desc("JZ", Op::Jcc(Cond::Z), Form::Addr, 3),
    desc("JNC", Op::Jcc(Cond::Nc), Form::Addr, 3),
    desc("JC", Op::Jcc(Cond::C), Form::Addr, 3),
    desc("JPO", Op::Jcc(Cond::Po), Form::Addr, 3),
    desc("JPE", Op::Jcc(Cond::Pe), Form::Addr, 3),
    desc("JP", Op::Jcc(Cond::P), Form::Addr, 3),
    desc("JM", Op::Jcc(Cond::M), Form::Addr, 3),
    desc("CALL", Op::Call, Form::Addr, 3),
    desc("CNZ", Op::Ccc(Cond::Nz), Form::Addr, 3),
    desc("CZ", Op::Ccc(Cond::Z), Form::Addr, 3),
    desc("CNC", Op::Ccc(Cond::Nc), Form::Addr, 3),
    desc("CC", Op::Ccc(Cond::C), Form::Addr, 3),
    desc("CPO", Op::Ccc(Cond::Po), Form::Addr, 3),
    desc("CPE", Op::Ccc(Cond::Pe), Form::Addr, 3),
    desc("CP", Op::Ccc(Cond::P), Form::Addr, 3),
    desc("CM", Op::Ccc(Cond::M), Form::Addr, 3),
    desc("RET", Op::Ret, Form::Implied, 1),
    desc("RNZ", Op::Rcc(Cond::Nz), Form::Implied, 1),
    desc("RZ", Op::Rcc(Cond::Z), Form::Implied, 1),
    desc("RNC", Op::Rcc(Cond::Nc), Form::Implied, 1),
    desc("RC", Op::Rcc(Cond::C), Form::Implied, 1),
    desc("RPO", Op::Rcc(Cond::Po), Form::Implied, 1),
    desc("RPE", Op::Rcc(Cond::Pe), Form::Implied, 1),
    desc("RP", Op::Rcc(Cond::P), Form::Implied, 1),
    desc("RM", Op::Rcc(Cond::M), Form::Implied, 1),
    desc("RST", Op::Rst, Form::Vector, 1),
    desc("PCHL", Op::Pchl, Form::Implied, 1),
    desc("PUSH", Op::Push, Form::Stack, 1),
    desc("POP", Op::Pop, Form::Stack, 1),
    desc("XTHL", Op::Xthl, Form::Implied, 1),
    desc("SPHL", Op::Sphl, Form::Implied, 1),
    desc("IN", Op::In, Form::Imm8, 2),
    desc("OUT", Op::Out, Form::Imm8, 2),
    desc("EI", Op::Ei, Form::Implied, 1),
    desc("DI", Op::Di, Form::Implied, 1),
    desc("RIM", Op::Rim, Form::Implied, 1),
    desc("SIM", Op::Sim, Form::Implied, 1),
    desc("NOP", Op::Nop, Form::Implied, 1),
    desc("HLT", Op::Hlt, Form::Implied, 1),
];

/// Mnemonics are matched after the source has been upper-cased.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.mnemonic == mnemonic)
}
