//! Memory map info table

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    Normal,
    Device,
    Reserved,
    NotPopulated,
    Invalid,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryInfoHeader {
    pub dram_base: u64,
    pub dram_size: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub kind: MemoryKind,
    pub phys_addr: u64,
    pub virt_addr: u64,
    pub size: u64,
    pub flags: u64,
}

impl MemoryRegion {
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.phys_addr && addr - self.phys_addr < self.size
    }
}

pub type MemoryTable = InfoTable<MemoryInfoHeader, MemoryRegion>;
pub type MemoryWriter<'a> = TableWriter<'a, MemoryInfoHeader, MemoryRegion>;

impl MemoryTable {
    /// Address and flags of the `instance`-th region of `kind`.
    pub fn get_addr(&self, kind: MemoryKind, instance: usize) -> Option<(u64, u64)> {
        self.entries()
            .iter()
            .filter(|region| region.kind == kind)
            .nth(instance)
            .map(|region| (region.phys_addr, region.flags))
    }

    /// Kind and flags of the region holding `addr`; `Invalid` when no
    /// region covers it.
    pub fn get_info(&self, addr: u64) -> (MemoryKind, u64) {
        self.entries()
            .iter()
            .find(|region| region.contains(addr))
            .map_or((MemoryKind::Invalid, 0), |region| (region.kind, region.flags))
    }
}
