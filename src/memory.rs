use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

pub const MEMORY_SIZE: usize = 0x1_0000;
pub const IO_PORTS: usize = 0x100;

/// Byte-addressed 16-bit address space. Word accesses are little-endian and
/// wrap at 0xFFFF.
pub trait Bus {
    fn read_u8(&self, addr: u16) -> u8;
    fn write_u8(&mut self, addr: u16, val: u8);

    fn read_u16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }

    fn write_u16(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_u8(addr, lo);
        self.write_u8(addr.wrapping_add(1), hi);
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub mem: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            mem: vec![0; MEMORY_SIZE],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mem
    }

    /// Bytes in `[start, end)`; `end` may be 0x10000.
    pub fn range(&self, start: u16, end: u32) -> &[u8] {
        let end = (end as usize).clamp(start as usize, MEMORY_SIZE);
        &self.mem[start as usize..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.mem.iter().filter(|b| **b != 0).count();
        f.debug_struct("Memory").field("nonzero_bytes", &used).finish()
    }
}

impl Bus for Memory {
    fn read_u8(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }
    fn write_u8(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }
}

impl std::ops::Index<u16> for Memory {
    type Output = u8;
    fn index(&self, addr: u16) -> &u8 {
        &self.mem[addr as usize]
    }
}

/// The 256-entry I/O port space, disjoint from memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoPorts {
    pub ports: Vec<u8>,
}

impl IoPorts {
    pub fn new() -> Self {
        Self {
            ports: vec![0; IO_PORTS],
        }
    }

    pub fn read(&self, port: u8) -> u8 {
        self.ports[port as usize]
    }

    pub fn write(&mut self, port: u8, val: u8) {
        self.ports[port as usize] = val;
    }
}

impl Default for IoPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IoPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live: Vec<(usize, u8)> = self
            .ports
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| (i, *v))
            .collect();
        f.debug_struct("IoPorts").field("nonzero", &live).finish()
    }
}

/// A set of 16-bit addresses, one bit per address.
#[derive(Clone, PartialEq, Eq)]
pub struct AddressSet {
    bits: BitVec<u64, Lsb0>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; MEMORY_SIZE],
        }
    }

    pub fn insert(&mut self, addr: u16) {
        self.bits.set(addr as usize, true);
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.bits[addr as usize]
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.bits.iter_ones().map(|i| i as u16)
    }

    /// Maximal runs of consecutive members as `(first, last)` pairs.
    pub fn runs(&self) -> Vec<(u16, u16)> {
        let mut out: Vec<(u16, u16)> = Vec::new();
        for addr in self.iter() {
            match out.last_mut() {
                Some((_, last)) if *last as u32 + 1 == addr as u32 => *last = addr,
                _ => out.push((addr, addr)),
            }
        }
        out
    }
}

impl Default for AddressSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.runs().iter().map(|(a, b)| format!("{a:04X}..={b:04X}")))
            .finish()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("cannot modify program memory at {addr:04X}H")]
    Protected { addr: u16 },
    #[error("address must be in range 0-65535 (0000H-FFFFH), found {0}")]
    AddressRange(u32),
    #[error("value must be in range 0-255 (00H-FFH), found {0}")]
    ValueRange(u32),
    #[error(transparent)]
    Number(#[from] crate::asm::expr::InvalidNumber),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_little_endian_and_wrap() {
        let mut mem = Memory::new();
        mem.write_u16(0x2000, 0x1234);
        assert_eq!(mem[0x2000], 0x34);
        assert_eq!(mem[0x2001], 0x12);
        mem.write_u16(0xFFFF, 0xABCD);
        assert_eq!(mem[0xFFFF], 0xCD);
        assert_eq!(mem[0x0000], 0xAB);
        assert_eq!(mem.read_u16(0xFFFF), 0xABCD);
    }

    #[test]
    fn address_set_runs() {
        let mut set = AddressSet::new();
        assert!(set.is_empty());
        for a in [0x2000, 0x2001, 0x2002, 0x3000, 0xFFFF] {
            set.insert(a);
        }
        assert_eq!(set.len(), 5);
        assert!(set.contains(0x2001));
        assert!(!set.contains(0x2003));
        assert_eq!(set.runs(), vec![(0x2000, 0x2002), (0x3000, 0x3000), (0xFFFF, 0xFFFF)]);
    }
}
