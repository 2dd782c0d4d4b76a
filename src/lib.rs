pub mod asm;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod instructions;
pub mod memory;

pub mod isa {
    pub mod i8085; // Intel 8085 opcode encoding
}

pub use asm::expr::parse_number;
pub use asm::{assemble, AsmError, AsmErrorKind, AssemblyOutput, ParsedInstruction};
pub use cpu::{Cpu, CpuConfig, CpuState, Flags, Registers, Status, Trap};
pub use memory::{AddressSet, Bus, IoPorts, Memory, MemoryError};
