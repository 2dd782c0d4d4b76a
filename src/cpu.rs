use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::asm::expr::{parse_number, Scope, SymbolTable};
use crate::asm::{AssemblyOutput, ParsedInstruction};
use crate::decoder::{Decoder, OperandError, TokenDecoder};
use crate::disasm::{fmt_decoded, fmt_tokens};
use crate::exec::{Executor, IntExecutor};
use crate::instructions::{Pair, Reg};
use crate::memory::{AddressSet, Bus, IoPorts, Memory, MemoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// SP after reset and after every program load.
    pub reset_sp: u16,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self { reset_sp: 0xFFFF }
    }
}

/// Register file. BC, DE and HL are views over the 8-bit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    pub fn new(sp: u16) -> Self {
        Self { a: 0, b: 0, c: 0, d: 0, e: 0, h: 0, l: 0, sp, pc: 0 }
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn set_bc(&mut self, v: u16) {
        [self.b, self.c] = v.to_be_bytes();
    }
    pub fn set_de(&mut self, v: u16) {
        [self.d, self.e] = v.to_be_bytes();
    }
    pub fn set_hl(&mut self, v: u16) {
        [self.h, self.l] = v.to_be_bytes();
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(CpuConfig::default().reset_sp)
    }
}

bitflags! {
/// Condition flags at their PSW bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags: u8 {
const S = 1 << 7;
const Z = 1 << 6;
const AC = 1 << 4;
const P = 1 << 2;
const C = 1 << 0;
}
}

impl Flags {
    /// S, Z and P from an 8-bit result. P is even parity.
    pub fn set_szp(&mut self, v: u8) {
        self.set(Flags::S, v & 0x80 != 0);
        self.set(Flags::Z, v == 0);
        self.set(Flags::P, v.count_ones() % 2 == 0);
    }

    /// Low byte of PSW; bit 1 always reads as 1.
    pub fn to_psw_byte(self) -> u8 {
        self.bits() | 0x02
    }

    pub fn from_psw_byte(b: u8) -> Self {
        Flags::from_bits_truncate(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ok,
    Halt,
    Error,
}

/// Runtime errors. Once recorded the CPU stays stopped until a reload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("No instruction at address {pc:04X}")]
    NoInstruction { pc: u16 },
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),
    #[error("Error executing {op}: {source}")]
    Operand {
        op: String,
        #[source]
        source: OperandError,
    },
}

/// Assembly metadata the CPU keeps after a load.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub parsed_program: Vec<ParsedInstruction>,
    pub line_to_address: BTreeMap<usize, u16>,
    pub address_to_line: BTreeMap<u16, usize>,
    pub labels: SymbolTable,
    pub symbols: SymbolTable,
    pub program_memory_range: AddressSet,
    pub data_memory_range: AddressSet,
    pub starting_address: u16,
    pub program_end_address: u32,
    index: HashMap<u16, usize>,
}

impl Program {
    fn split(out: AssemblyOutput) -> (Memory, Self) {
        let index = out
            .parsed_program
            .iter()
            .enumerate()
            .map(|(i, p)| (p.address, i))
            .collect();
        let program = Self {
            parsed_program: out.parsed_program,
            line_to_address: out.line_to_address,
            address_to_line: out.address_to_line,
            labels: out.labels,
            symbols: out.symbols,
            program_memory_range: out.program_memory_range,
            data_memory_range: out.data_memory_range,
            starting_address: out.starting_address,
            program_end_address: out.program_end_address,
            index,
        };
        (out.memory, program)
    }

    pub fn instruction_at(&self, pc: u16) -> Option<&ParsedInstruction> {
        self.index.get(&pc).map(|&i| &self.parsed_program[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagState {
    pub s: bool,
    pub z: bool,
    pub ac: bool,
    pub p: bool,
    pub c: bool,
}

impl From<Flags> for FlagState {
    fn from(f: Flags) -> Self {
        Self {
            s: f.contains(Flags::S),
            z: f.contains(Flags::Z),
            ac: f.contains(Flags::AC),
            p: f.contains(Flags::P),
            c: f.contains(Flags::C),
        }
    }
}

/// Serializable view of the processor for front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub registers: Registers,
    pub flags: FlagState,
    pub status: Status,
    pub error: Option<String>,
    pub last_instruction: Option<String>,
    pub line: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub regs: Registers,
    pub flags: Flags,
    pub mem: Memory,
    pub io: IoPorts,
    pub halted: bool,
    pub error: Option<Trap>,
    /// Text of the instruction most recently fetched.
    pub last_instruction: Option<String>,
    pub program: Program,
    pub cfg: CpuConfig,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self {
            regs: Registers::new(cfg.reset_sp),
            flags: Flags::empty(),
            mem: Memory::new(),
            io: IoPorts::new(),
            halted: false,
            error: None,
            last_instruction: None,
            program: Program::default(),
            cfg,
        }
    }

    /// Resets all state, installs the image and points PC at its start.
    pub fn load_program(&mut self, out: AssemblyOutput) {
        let (mem, program) = Program::split(out);
        *self = Self::new(self.cfg);
        self.mem = mem;
        self.regs.pc = program.starting_address;
        self.program = program;
        debug!(
            start = self.regs.pc,
            instructions = self.program.parsed_program.len(),
            "program loaded"
        );
    }

    pub fn status(&self) -> Status {
        if self.error.is_some() {
            Status::Error
        } else if self.halted {
            Status::Halt
        } else {
            Status::Ok
        }
    }

    pub fn step(&mut self) -> Status {
        self.step_with(&TokenDecoder, &IntExecutor)
    }

    /// Executes one instruction. HALT and ERROR are sticky.
    pub fn step_with<D: Decoder, X: Executor>(&mut self, dec: &D, exec: &X) -> Status {
        if self.halted {
            return Status::Halt;
        }
        if self.error.is_some() {
            return Status::Error;
        }
        match self.try_step(dec, exec) {
            Ok(()) if self.halted => Status::Halt,
            Ok(()) => Status::Ok,
            Err(trap) => {
                warn!(pc = self.regs.pc, %trap, "execution stopped");
                self.error = Some(trap);
                Status::Error
            }
        }
    }

    fn try_step<D: Decoder, X: Executor>(&mut self, dec: &D, exec: &X) -> Result<(), Trap> {
        let pc = self.regs.pc;
        let ins = self
            .program
            .instruction_at(pc)
            .ok_or(Trap::NoInstruction { pc })?;
        let text = fmt_tokens(&ins.tokens);
        let decoded = dec.decode(
            &ins.tokens,
            &Scope::new(&self.program.symbols, &self.program.labels),
        );
        self.last_instruction = Some(text);
        let d = decoded?;
        trace!(pc, insn = %fmt_decoded(&d), "step");

        self.regs.pc = pc.wrapping_add(u16::from(d.len));
        exec.exec(self, d)?;
        if self.halted {
            // HLT stays on its own line.
            self.regs.pc = pc;
        }
        Ok(())
    }

    pub fn read_reg(&self, r: Reg) -> u8 {
        match r {
            Reg::A => self.regs.a,
            Reg::B => self.regs.b,
            Reg::C => self.regs.c,
            Reg::D => self.regs.d,
            Reg::E => self.regs.e,
            Reg::H => self.regs.h,
            Reg::L => self.regs.l,
            Reg::M => self.mem.read_u8(self.regs.hl()),
        }
    }

    pub fn write_reg(&mut self, r: Reg, v: u8) {
        match r {
            Reg::A => self.regs.a = v,
            Reg::B => self.regs.b = v,
            Reg::C => self.regs.c = v,
            Reg::D => self.regs.d = v,
            Reg::E => self.regs.e = v,
            Reg::H => self.regs.h = v,
            Reg::L => self.regs.l = v,
            Reg::M => {
                let hl = self.regs.hl();
                self.mem.write_u8(hl, v);
            }
        }
    }

    pub fn read_pair(&self, p: Pair) -> u16 {
        match p {
            Pair::B => self.regs.bc(),
            Pair::D => self.regs.de(),
            Pair::H => self.regs.hl(),
            Pair::Sp => self.regs.sp,
            Pair::Psw => u16::from_be_bytes([self.regs.a, self.flags.to_psw_byte()]),
        }
    }

    pub fn write_pair(&mut self, p: Pair, v: u16) {
        match p {
            Pair::B => self.regs.set_bc(v),
            Pair::D => self.regs.set_de(v),
            Pair::H => self.regs.set_hl(v),
            Pair::Sp => self.regs.sp = v,
            Pair::Psw => {
                let [a, f] = v.to_be_bytes();
                self.regs.a = a;
                self.flags = Flags::from_psw_byte(f);
            }
        }
    }

    /// High byte to SP-1, low byte to SP-2, then one SP update.
    pub fn push16(&mut self, v: u16) {
        let sp = self.regs.sp;
        let [hi, lo] = v.to_be_bytes();
        self.mem.write_u8(sp.wrapping_sub(1), hi);
        self.mem.write_u8(sp.wrapping_sub(2), lo);
        self.regs.sp = sp.wrapping_sub(2);
    }

    pub fn pop16(&mut self) -> u16 {
        let sp = self.regs.sp;
        let v = self.mem.read_u16(sp);
        self.regs.sp = sp.wrapping_add(2);
        v
    }

    /// Name-keyed register read: A..L, SP, PC, and the pairs BC/DE/HL.
    pub fn register(&self, name: &str) -> Result<u16, OperandError> {
        let upper = name.trim().to_uppercase();
        let v = match upper.as_str() {
            "SP" => self.regs.sp,
            "PC" => self.regs.pc,
            "BC" => self.regs.bc(),
            "DE" => self.regs.de(),
            "HL" => self.regs.hl(),
            "M" => return Err(OperandError::InvalidRegister(upper)),
            other => match Reg::parse(other) {
                Some(r) => u16::from(self.read_reg(r)),
                None => return Err(OperandError::InvalidRegister(upper)),
            },
        };
        Ok(v)
    }

    /// Name-keyed flag read: S, Z, AC, P, C.
    pub fn flag(&self, name: &str) -> Option<bool> {
        let f = match name.trim().to_uppercase().as_str() {
            "S" => Flags::S,
            "Z" => Flags::Z,
            "AC" => Flags::AC,
            "P" => Flags::P,
            "C" | "CY" => Flags::C,
            _ => return None,
        };
        Some(self.flags.contains(f))
    }

    /// True for assembled code bytes that are not also declared data.
    pub fn is_program_memory(&self, addr: u16) -> bool {
        self.program.program_memory_range.contains(addr) && !self.program.data_memory_range.contains(addr)
    }

    /// Manual memory edit; code bytes are protected.
    pub fn write_memory(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        if self.is_program_memory(addr) {
            return Err(MemoryError::Protected { addr });
        }
        self.mem.write_u8(addr, value);
        Ok(())
    }

    /// `write_memory` with address and value in literal syntax (`2000H`, `255`).
    pub fn write_memory_text(&mut self, addr: &str, value: &str) -> Result<(), MemoryError> {
        let a = parse_number(addr)?;
        let addr = u16::try_from(a).map_err(|_| MemoryError::AddressRange(a))?;
        let v = parse_number(value)?;
        let value = u8::try_from(v).map_err(|_| MemoryError::ValueRange(v))?;
        self.write_memory(addr, value)
    }

    /// Source line of the instruction at PC.
    pub fn current_line(&self) -> Option<usize> {
        self.program.address_to_line.get(&self.regs.pc).copied()
    }

    pub fn snapshot(&self) -> CpuState {
        CpuState {
            registers: self.regs,
            flags: self.flags.into(),
            status: self.status(),
            error: self.error.as_ref().map(|e| e.to_string()),
            last_instruction: self.last_instruction.clone(),
            line: self.current_line(),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}
