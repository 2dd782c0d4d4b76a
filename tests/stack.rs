use pretty_assertions::assert_eq;

use i8085_rs::{assemble, Cpu, Status};

fn load(src: &[&str]) -> Cpu {
    let mut cpu = Cpu::default();
    cpu.load_program(assemble(src).unwrap());
    cpu
}

#[test]
fn push_pop_restores_each_pair() {
    let cases = [("B", "LXI B,1234H", "BC", 0x1234), ("D", "LXI D,5678H", "DE", 0x5678), ("H", "LXI H,9ABCH", "HL", 0x9ABC)];
    for (pair, setup, view, value) in cases {
        let push = format!("PUSH {pair}");
        let pop = format!("POP {pair}");
        let mut cpu = load(&["LXI SP,4000H", setup, push.as_str(), "LXI B,0", "LXI D,0", "LXI H,0", pop.as_str(), "HLT"]);
        cpu.step();
        cpu.step();
        cpu.step();
        assert_eq!(cpu.regs.sp, 0x3FFE);
        while cpu.step() == Status::Ok {}
        assert_eq!(cpu.register(view), Ok(value));
        assert_eq!(cpu.regs.sp, 0x4000);
    }
}

#[test]
fn push_writes_high_byte_first() {
    let mut cpu = load(&["LXI SP,4000H", "LXI D,0ABCDH", "PUSH D", "HLT"]);
    while cpu.step() == Status::Ok {}
    assert_eq!(cpu.mem[0x3FFF], 0xAB);
    assert_eq!(cpu.mem[0x3FFE], 0xCD);
}

#[test]
fn psw_round_trip_packs_flags() {
    let mut cpu = load(&[
        "LXI SP,4000H",
        "MVI A,0",
        "SUI 1",      // A=FF S=1 AC=1 P=1 C=1
        "PUSH PSW",
        "XRA A",      // clobber A and flags
        "POP PSW",
        "HLT",
    ]);
    while cpu.step() == Status::Ok {}
    assert_eq!(cpu.mem[0x3FFF], 0xFF);
    assert_eq!(cpu.mem[0x3FFE], 0x80 | 0x10 | 0x04 | 0x02 | 0x01);
    assert_eq!(cpu.regs.a, 0xFF);
    let flags = ["S", "Z", "AC", "P", "C"].map(|f| cpu.flag(f).unwrap());
    assert_eq!(flags, [true, false, true, true, true]);
}

#[test]
fn pop_psw_from_memory_image() {
    let mut cpu = load(&["LXI SP,STK", "POP PSW", "HLT", "STK: DS 2"]);
    let stk = cpu.program.labels["STK"];
    cpu.write_memory(stk, 0x41).unwrap(); // Z | C (+ bit 1 ignored)
    cpu.write_memory(stk + 1, 0x99).unwrap();
    while cpu.step() == Status::Ok {}
    assert_eq!(cpu.regs.a, 0x99);
    assert_eq!(cpu.flag("Z"), Some(true));
    assert_eq!(cpu.flag("C"), Some(true));
    assert_eq!(cpu.flag("S"), Some(false));
}

#[test]
fn xthl_sphl_xchg() {
    let mut cpu = load(&[
        "LXI SP,4000H",
        "LXI B,1122H",
        "PUSH B",
        "LXI H,3344H",
        "XTHL",
        "LXI D,5566H",
        "XCHG",
        "SPHL",
        "HLT",
    ]);
    while cpu.step() == Status::Ok {}
    assert_eq!(cpu.mem.range(0x3FFE, 0x4000), &[0x44, 0x33]);
    assert_eq!(cpu.regs.de(), 0x1122);
    assert_eq!(cpu.regs.hl(), 0x5566);
    assert_eq!(cpu.regs.sp, 0x5566);
}

#[test]
fn default_stack_pointer_wraps() {
    let mut cpu = load(&["LXI B,0BEEFH", "PUSH B", "POP D", "HLT"]);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.sp, 0xFFFD);
    assert_eq!(cpu.mem[0xFFFE], 0xBE);
    assert_eq!(cpu.mem[0xFFFD], 0xEF);
    cpu.step();
    assert_eq!(cpu.regs.de(), 0xBEEF);
    assert_eq!(cpu.regs.sp, 0xFFFF);
}
