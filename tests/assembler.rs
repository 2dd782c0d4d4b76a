use pretty_assertions::assert_eq;

use i8085_rs::{assemble, AsmErrorKind, ParsedInstruction};

fn bytes(src: &[&str]) -> Vec<u8> {
    let out = assemble(src).unwrap();
    out.memory.range(0, out.program_end_address).to_vec()
}

#[test]
fn register_encodings() {
    assert_eq!(bytes(&["MOV B,C", "MOV M,A", "MOV A,M"]), vec![0x41, 0x77, 0x7E]);
    assert_eq!(bytes(&["ADD B", "ADC M", "SUB A", "SBB E", "ANA H", "XRA L", "ORA C", "CMP D"]),
        vec![0x80, 0x8E, 0x97, 0x9B, 0xA4, 0xAD, 0xB1, 0xBA]);
    assert_eq!(bytes(&["INR B", "DCR A", "MVI M,0FFH"]), vec![0x04, 0x3D, 0x36, 0xFF]);
}

#[test]
fn pair_encodings() {
    assert_eq!(
        bytes(&["LXI B,1234H", "LXI SP,0FFFFH", "INX D", "DCX H", "DAD SP"]),
        vec![0x01, 0x34, 0x12, 0x31, 0xFF, 0xFF, 0x13, 0x2B, 0x39]
    );
    assert_eq!(
        bytes(&["PUSH B", "PUSH D", "PUSH H", "PUSH PSW", "POP PSW", "POP B"]),
        vec![0xC5, 0xD5, 0xE5, 0xF5, 0xF1, 0xC1]
    );
    assert_eq!(bytes(&["LDAX B", "STAX D", "XCHG", "XTHL", "SPHL", "PCHL"]), vec![0x0A, 0x12, 0xEB, 0xE3, 0xF9, 0xE9]);
}

#[test]
fn immediate_and_address_encodings() {
    assert_eq!(
        bytes(&["ADI 1", "ACI 2", "SUI 3", "SBI 4", "ANI 5", "XRI 6", "ORI 7", "CPI 8", "IN 10H", "OUT 11H"]),
        vec![0xC6, 1, 0xCE, 2, 0xD6, 3, 0xDE, 4, 0xE6, 5, 0xEE, 6, 0xF6, 7, 0xFE, 8, 0xDB, 0x10, 0xD3, 0x11]
    );
    assert_eq!(
        bytes(&["LDA 2050H", "STA 2051H", "LHLD 2052H", "SHLD 2054H"]),
        vec![0x3A, 0x50, 0x20, 0x32, 0x51, 0x20, 0x2A, 0x52, 0x20, 0x22, 0x54, 0x20]
    );
}

#[test]
fn branch_encodings() {
    let jumps = bytes(&["JMP 0", "JNZ 0", "JZ 0", "JNC 0", "JC 0", "JPO 0", "JPE 0", "JP 0", "JM 0"]);
    let opcodes: Vec<u8> = jumps.chunks(3).map(|c| c[0]).collect();
    assert_eq!(opcodes, vec![0xC3, 0xC2, 0xCA, 0xD2, 0xDA, 0xE2, 0xEA, 0xF2, 0xFA]);

    let calls = bytes(&["CALL 0", "CNZ 0", "CZ 0", "CNC 0", "CC 0", "CPO 0", "CPE 0", "CP 0", "CM 0"]);
    let opcodes: Vec<u8> = calls.chunks(3).map(|c| c[0]).collect();
    assert_eq!(opcodes, vec![0xCD, 0xC4, 0xCC, 0xD4, 0xDC, 0xE4, 0xEC, 0xF4, 0xFC]);

    assert_eq!(
        bytes(&["RET", "RNZ", "RZ", "RNC", "RC", "RPO", "RPE", "RP", "RM"]),
        vec![0xC9, 0xC0, 0xC8, 0xD0, 0xD8, 0xE0, 0xE8, 0xF0, 0xF8]
    );
    assert_eq!(bytes(&["RST 0", "RST 1", "RST 7"]), vec![0xC7, 0xCF, 0xFF]);
}

#[test]
fn machine_control_encodings() {
    assert_eq!(
        bytes(&["NOP", "EI", "DI", "RIM", "SIM", "DAA", "CMA", "CMC", "STC", "RLC", "RRC", "RAL", "RAR", "HLT"]),
        vec![0x00, 0xFB, 0xF3, 0x20, 0x30, 0x27, 0x2F, 0x3F, 0x37, 0x07, 0x0F, 0x17, 0x1F, 0x76]
    );
}

#[test]
fn forward_references_are_resolved() {
    let out = assemble(&["ORG 2000H", "JMP AHEAD", "NOP", "AHEAD: HLT"]).unwrap();
    assert_eq!(out.memory.range(0x2000, 0x2003), &[0xC3, 0x04, 0x20]);
}

#[test]
fn ds_reserves_data_without_bytes() {
    let out = assemble(&["ORG 3000H", "DS 10", "NEXT: MVI A,1"]).unwrap();
    for addr in 0x3000..=0x3009u16 {
        assert!(out.data_memory_range.contains(addr));
        assert!(!out.program_memory_range.contains(addr));
        assert_eq!(out.memory[addr], 0);
    }
    assert_eq!(out.data_memory_range.len(), 10);
    assert_eq!(out.labels["NEXT"], 0x300A);
    assert_eq!(out.memory[0x300A], 0x3E);
}

#[test]
fn program_range_covers_every_instruction_byte() {
    let out = assemble(&["ORG 10H", "LXI H,0", "MVI A,1", "NOP"]).unwrap();
    let covered: Vec<u16> = out.program_memory_range.iter().collect();
    assert_eq!(covered, (0x10..0x16).collect::<Vec<u16>>());
}

#[test]
fn metadata_maps_lines_and_addresses() {
    let out = assemble(&["; header", "  ORG 100H", "START: MVI B, 2", "", "  HLT", "  END", "  GARBAGE HERE"]).unwrap();
    assert_eq!(
        out.parsed_program,
        vec![
            ParsedInstruction { address: 0x100, tokens: vec!["MVI".into(), "B".into(), "2".into()], line: 3 },
            ParsedInstruction { address: 0x102, tokens: vec!["HLT".into()], line: 5 },
        ]
    );
    assert_eq!(out.line_to_address.get(&3), Some(&0x100));
    assert_eq!(out.address_to_line.get(&0x102), Some(&5));
    assert_eq!(out.line_of(0x101), None);
    assert_eq!(out.instruction_at(0x102).map(|p| p.line), Some(5));
    assert_eq!(out.program_end_address, 0x103);
}

#[test]
fn first_org_sets_start() {
    let out = assemble(&["ORG 4000H", "NOP", "ORG 1000H", "HLT"]).unwrap();
    assert_eq!(out.starting_address, 0x4000);
    assert_eq!(out.memory[0x1000], 0x76);
    let out = assemble(&["NOP"]).unwrap();
    assert_eq!(out.starting_address, 0);
}

#[test]
fn fused_label_and_operands_without_comma() {
    let out = assemble(&["LOOP:INR A", "MVI B 2 + 3", "JMP LOOP"]).unwrap();
    assert_eq!(out.labels["LOOP"], 0);
    assert_eq!(out.memory.range(0, 6), &[0x3C, 0x06, 0x05, 0xC3, 0x00, 0x00]);
}

#[test]
fn mov_m_m_is_rejected_everywhere() {
    let cases: [(&[&str], usize); 3] = [
        (&["MOV M,M"], 1),
        (&["NOP", "MOV M, M", "HLT"], 2),
        (&["ORG 2000H", "X: MOV M,M"], 2),
    ];
    for (src, line) in cases {
        let err = assemble(src).unwrap_err();
        assert_eq!(err.line, line);
        assert!(matches!(err.kind, AsmErrorKind::Operand(_)));
        assert!(err.to_string().contains("MOV M,M is not a valid instruction"));
    }
}

#[test]
fn equ_after_end_is_visible() {
    let out = assemble(&["MVI A, LIMIT", "HLT", "END", "LIMIT EQU 7", "NOT AN INSTRUCTION"]).unwrap();
    assert_eq!(out.memory.range(0, 3), &[0x3E, 0x07, 0x76]);
    assert_eq!(out.symbols["LIMIT"], 7);
    assert_eq!(out.parsed_program.len(), 2);
}
