use pretty_assertions::assert_eq;

use i8085_rs::decoder::OperandError;
use i8085_rs::{assemble, AsmErrorKind, Cpu, Status, Trap};

fn asm_err(src: &[&str]) -> (usize, AsmErrorKind, String) {
    let err = assemble(src).unwrap_err();
    let msg = err.to_string();
    (err.line, err.kind, msg)
}

#[test]
fn syntax_errors_carry_line_and_cause() {
    let (line, kind, msg) = asm_err(&["NOP", "", "FROB A"]);
    assert_eq!((line, kind), (3, AsmErrorKind::UnknownInstruction("FROB".into())));
    assert_eq!(msg, "Line 3: unknown instruction: FROB");

    let (line, kind, _) = asm_err(&["X: NOP", "X: HLT"]);
    assert_eq!((line, kind), (2, AsmErrorKind::DuplicateLabel("X".into())));

    let (line, kind, _) = asm_err(&["NOP", "DS"]);
    assert_eq!((line, kind), (2, AsmErrorKind::MissingOperand("DS")));

    let (line, kind, _) = asm_err(&["ORG"]);
    assert_eq!((line, kind), (1, AsmErrorKind::MissingOperand("ORG")));

    let (line, kind, _) = asm_err(&["1ABC: NOP"]);
    assert_eq!((line, kind), (1, AsmErrorKind::InvalidLabel("1ABC:".into())));
}

#[test]
fn operand_errors() {
    let (_, kind, _) = asm_err(&["MOV A,Q"]);
    assert_eq!(kind, AsmErrorKind::Operand(OperandError::InvalidRegister("Q".into())));

    let (_, kind, _) = asm_err(&["LXI PSW,0"]);
    assert!(matches!(kind, AsmErrorKind::Operand(OperandError::PairNotAllowed { .. })));

    let (_, kind, _) = asm_err(&["POP SP"]);
    assert!(matches!(kind, AsmErrorKind::Operand(OperandError::PairNotAllowed { .. })));

    let (_, kind, _) = asm_err(&["INX Q"]);
    assert_eq!(kind, AsmErrorKind::Operand(OperandError::InvalidRegisterPair("Q".into())));

    let (_, kind, msg) = asm_err(&["RST 8"]);
    assert_eq!(kind, AsmErrorKind::Operand(OperandError::RstRange(8)));
    assert!(msg.contains("RST requires a number from 0-7"));

    let (_, kind, _) = asm_err(&["JMP NOWHERE"]);
    assert_eq!(kind, AsmErrorKind::Operand(OperandError::Unresolved("NOWHERE".into())));

    let (_, kind, _) = asm_err(&["MVI A,12G"]);
    assert!(matches!(kind, AsmErrorKind::Operand(OperandError::Expr(_))));

    let (_, kind, _) = asm_err(&["MVI A"]);
    assert!(matches!(kind, AsmErrorKind::OperandCount { expected: 2, found: 1, .. }));
}

#[test]
fn unresolvable_equ_chain() {
    let (line, kind, msg) = asm_err(&["NOP", "A EQU B", "B EQU A + 1"]);
    assert_eq!(line, 2);
    assert_eq!(kind, AsmErrorKind::UnresolvedEqu("A, B".into()));
    assert_eq!(msg, "Line 2: Could not resolve EQU symbols: A, B");

    let (_, kind, _) = asm_err(&["A EQU 1", "A EQU 2"]);
    assert_eq!(kind, AsmErrorKind::DuplicateSymbol("A".into()));
}

#[test]
fn address_space_overflow() {
    let (line, kind, _) = asm_err(&["ORG 0FFFFH", "NOP", "NOP"]);
    assert_eq!((line, kind), (3, AsmErrorKind::AddressOverflow));

    let (_, kind, _) = asm_err(&["ORG 10000H"]);
    assert_eq!(kind, AsmErrorKind::AddressRange(0x10000));
}

#[test]
fn runaway_pc_is_a_sticky_error() {
    let mut cpu = Cpu::default();
    cpu.load_program(assemble(&["ORG 100H", "MVI A,1"]).unwrap());
    assert_eq!(cpu.step(), Status::Ok);
    assert_eq!(cpu.step(), Status::Error);
    assert_eq!(cpu.error, Some(Trap::NoInstruction { pc: 0x102 }));
    assert_eq!(cpu.snapshot().error.as_deref(), Some("No instruction at address 0102"));

    let regs = cpu.regs;
    assert_eq!(cpu.step(), Status::Error);
    assert_eq!(cpu.regs, regs);
}

#[test]
fn jump_into_data_is_an_error() {
    let mut cpu = Cpu::default();
    cpu.load_program(assemble(&["JMP BUF", "BUF: DS 2"]).unwrap());
    assert_eq!(cpu.step(), Status::Ok);
    assert_eq!(cpu.step(), Status::Error);
    assert_eq!(cpu.status(), Status::Error);
    assert_eq!(cpu.error, Some(Trap::NoInstruction { pc: 3 }));
}

#[test]
fn pchl_off_instruction_boundary() {
    let mut cpu = Cpu::default();
    cpu.load_program(assemble(&["LXI H,1", "PCHL"]).unwrap());
    cpu.step();
    cpu.step();
    assert_eq!(cpu.step(), Status::Error);
    assert_eq!(cpu.error, Some(Trap::NoInstruction { pc: 1 }));
    assert_eq!(cpu.last_instruction.as_deref(), Some("PCHL"));
}
