use crate::cpu::{Cpu, Flags, Trap};
use crate::decoder::Decoded;
use crate::instructions::{Cond, Op};
use crate::memory::Bus;

/// Applies one decoded instruction. PC already points past it when this
/// runs; branches overwrite it.
pub trait Executor {
    fn exec(&self, cpu: &mut Cpu, d: Decoded) -> Result<(), Trap>;
}

fn cond_met(flags: Flags, c: Cond) -> bool {
    match c {
        Cond::Nz => !flags.contains(Flags::Z),
        Cond::Z => flags.contains(Flags::Z),
        Cond::Nc => !flags.contains(Flags::C),
        Cond::C => flags.contains(Flags::C),
        Cond::Po => !flags.contains(Flags::P),
        Cond::Pe => flags.contains(Flags::P),
        Cond::P => !flags.contains(Flags::S),
        Cond::M => flags.contains(Flags::S),
    }
}

fn add8(cpu: &mut Cpu, v: u8, carry: bool) -> u8 {
    let a = cpu.regs.a;
    let c = u8::from(carry);
    let sum = u16::from(a) + u16::from(v) + u16::from(c);
    let res = sum as u8;
    cpu.flags.set(Flags::AC, (a & 0x0F) + (v & 0x0F) + c > 0x0F);
    cpu.flags.set(Flags::C, sum > 0xFF);
    cpu.flags.set_szp(res);
    res
}

// Borrow convention for AC and C.
fn sub8(cpu: &mut Cpu, v: u8, borrow: bool) -> u8 {
    let a = cpu.regs.a;
    let b = u8::from(borrow);
    let res = a.wrapping_sub(v).wrapping_sub(b);
    cpu.flags.set(Flags::AC, (a & 0x0F) < (v & 0x0F) + b);
    cpu.flags.set(Flags::C, u16::from(a) < u16::from(v) + u16::from(b));
    cpu.flags.set_szp(res);
    res
}

fn logic(cpu: &mut Cpu, res: u8, ac: bool) {
    cpu.regs.a = res;
    cpu.flags.set_szp(res);
    cpu.flags.remove(Flags::C);
    cpu.flags.set(Flags::AC, ac);
}

fn daa(cpu: &mut Cpu) {
    let orig = cpu.regs.a;
    let lo = orig & 0x0F;
    let mut a = u16::from(orig);
    let mut ac = false;
    if lo > 9 || cpu.flags.contains(Flags::AC) {
        a += 6;
        ac = lo + 6 > 0x0F;
    }
    let carry = (a >> 4) > 9 || cpu.flags.contains(Flags::C) || (orig >= 0x90 && lo > 9);
    if carry {
        a += 0x60;
    }
    let res = a as u8;
    cpu.regs.a = res;
    cpu.flags.set_szp(res);
    cpu.flags.set(Flags::AC, ac);
    cpu.flags.set(Flags::C, carry);
}

fn jump_if(cpu: &mut Cpu, taken: bool, target: u16) {
    if taken {
        cpu.regs.pc = target;
    }
}

fn call_if(cpu: &mut Cpu, taken: bool, target: u16) {
    if taken {
        let ret = cpu.regs.pc;
        cpu.push16(ret);
        cpu.regs.pc = target;
    }
}

fn ret_if(cpu: &mut Cpu, taken: bool) {
    if taken {
        cpu.regs.pc = cpu.pop16();
    }
}

pub struct IntExecutor;

impl Executor for IntExecutor {
    fn exec(&self, cpu: &mut Cpu, d: Decoded) -> Result<(), Trap> {
        match d.op {
            // Data transfer
            Op::Mov => {
                let v = cpu.read_reg(d.src);
                cpu.write_reg(d.dst, v);
            }
            Op::Mvi => cpu.write_reg(d.dst, d.imm as u8),
            Op::Lxi => cpu.write_pair(d.pair, d.imm),
            Op::Lda => cpu.regs.a = cpu.mem.read_u8(d.imm),
            Op::Sta => {
                let a = cpu.regs.a;
                cpu.mem.write_u8(d.imm, a);
            }
            Op::Lhld => {
                let v = cpu.mem.read_u16(d.imm);
                cpu.regs.set_hl(v);
            }
            Op::Shld => {
                let hl = cpu.regs.hl();
                cpu.mem.write_u16(d.imm, hl);
            }
            Op::Ldax => {
                let addr = cpu.read_pair(d.pair);
                cpu.regs.a = cpu.mem.read_u8(addr);
            }
            Op::Stax => {
                let addr = cpu.read_pair(d.pair);
                let a = cpu.regs.a;
                cpu.mem.write_u8(addr, a);
            }
            Op::Xchg => {
                let (de, hl) = (cpu.regs.de(), cpu.regs.hl());
                cpu.regs.set_de(hl);
                cpu.regs.set_hl(de);
            }

            // Arithmetic
            Op::Add | Op::Adc | Op::Adi | Op::Aci => {
                let v = match d.op {
                    Op::Add | Op::Adc => cpu.read_reg(d.src),
                    _ => d.imm as u8,
                };
                let carry = matches!(d.op, Op::Adc | Op::Aci) && cpu.flags.contains(Flags::C);
                cpu.regs.a = add8(cpu, v, carry);
            }
            Op::Sub | Op::Sbb | Op::Sui | Op::Sbi => {
                let v = match d.op {
                    Op::Sub | Op::Sbb => cpu.read_reg(d.src),
                    _ => d.imm as u8,
                };
                let borrow = matches!(d.op, Op::Sbb | Op::Sbi) && cpu.flags.contains(Flags::C);
                cpu.regs.a = sub8(cpu, v, borrow);
            }
            Op::Cmp => {
                let v = cpu.read_reg(d.src);
                sub8(cpu, v, false);
            }
            Op::Cpi => {
                sub8(cpu, d.imm as u8, false);
            }
            Op::Inr => {
                let v = cpu.read_reg(d.dst);
                let res = v.wrapping_add(1);
                cpu.write_reg(d.dst, res);
                cpu.flags.set_szp(res);
                cpu.flags.set(Flags::AC, v & 0x0F == 0x0F);
            }
            Op::Dcr => {
                let v = cpu.read_reg(d.dst);
                let res = v.wrapping_sub(1);
                cpu.write_reg(d.dst, res);
                cpu.flags.set_szp(res);
                cpu.flags.set(Flags::AC, v & 0x0F == 0);
            }
            Op::Inx => {
                let v = cpu.read_pair(d.pair).wrapping_add(1);
                cpu.write_pair(d.pair, v);
            }
            Op::Dcx => {
                let v = cpu.read_pair(d.pair).wrapping_sub(1);
                cpu.write_pair(d.pair, v);
            }
            Op::Dad => {
                let (res, carry) = cpu.regs.hl().overflowing_add(cpu.read_pair(d.pair));
                cpu.regs.set_hl(res);
                cpu.flags.set(Flags::C, carry);
            }
            Op::Daa => daa(cpu),

            // Logical
            Op::Ana | Op::Ani => {
                let v = if d.op == Op::Ana { cpu.read_reg(d.src) } else { d.imm as u8 };
                let res = cpu.regs.a & v;
                logic(cpu, res, true);
            }
            Op::Ora | Op::Ori => {
                let v = if d.op == Op::Ora { cpu.read_reg(d.src) } else { d.imm as u8 };
                let res = cpu.regs.a | v;
                logic(cpu, res, false);
            }
            Op::Xra | Op::Xri => {
                let v = if d.op == Op::Xra { cpu.read_reg(d.src) } else { d.imm as u8 };
                let res = cpu.regs.a ^ v;
                logic(cpu, res, false);
            }
            Op::Cma => cpu.regs.a = !cpu.regs.a,
            Op::Cmc => cpu.flags.toggle(Flags::C),
            Op::Stc => cpu.flags.insert(Flags::C),
            Op::Rlc => {
                let a = cpu.regs.a;
                cpu.regs.a = a.rotate_left(1);
                cpu.flags.set(Flags::C, a & 0x80 != 0);
            }
            Op::Rrc => {
                let a = cpu.regs.a;
                cpu.regs.a = a.rotate_right(1);
                cpu.flags.set(Flags::C, a & 0x01 != 0);
            }
            Op::Ral => {
                let a = cpu.regs.a;
                let c = u8::from(cpu.flags.contains(Flags::C));
                cpu.regs.a = (a << 1) | c;
                cpu.flags.set(Flags::C, a & 0x80 != 0);
            }
            Op::Rar => {
                let a = cpu.regs.a;
                let c = u8::from(cpu.flags.contains(Flags::C));
                cpu.regs.a = (a >> 1) | (c << 7);
                cpu.flags.set(Flags::C, a & 0x01 != 0);
            }

            // Branch
            Op::Jmp => jump_if(cpu, true, d.imm),
            Op::Jcc(c) => {
                let taken = cond_met(cpu.flags, c);
                jump_if(cpu, taken, d.imm);
            }
            Op::Call => call_if(cpu, true, d.imm),
            Op::Ccc(c) => {
                let taken = cond_met(cpu.flags, c);
                call_if(cpu, taken, d.imm);
            }
            Op::Ret => ret_if(cpu, true),
            Op::Rcc(c) => {
                let taken = cond_met(cpu.flags, c);
                ret_if(cpu, taken);
            }
            Op::Rst => call_if(cpu, true, d.imm * 8),
            Op::Pchl => cpu.regs.pc = cpu.regs.hl(),

            // Stack
            Op::Push => {
                let v = cpu.read_pair(d.pair);
                cpu.push16(v);
            }
            Op::Pop => {
                let v = cpu.pop16();
                cpu.write_pair(d.pair, v);
            }
            Op::Xthl => {
                let sp = cpu.regs.sp;
                let top = cpu.mem.read_u16(sp);
                let hl = cpu.regs.hl();
                cpu.mem.write_u16(sp, hl);
                cpu.regs.set_hl(top);
            }
            Op::Sphl => cpu.regs.sp = cpu.regs.hl(),

            // I/O and machine control
            Op::In => cpu.regs.a = cpu.io.read(d.imm as u8),
            Op::Out => {
                let a = cpu.regs.a;
                cpu.io.write(d.imm as u8, a);
            }
            Op::Ei | Op::Di | Op::Rim | Op::Sim | Op::Nop => {}
            Op::Hlt => cpu.halted = true,
        }
        Ok(())
    }
}
