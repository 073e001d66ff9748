//! NUMA description: HMAT bandwidth per memory proximity domain and SRAT
//! affinity ranges.

use super::{InfoTable, TableWriter};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HmatDomain {
    pub proximity_domain: u32,
    pub read_bandwidth: u64,
    pub write_bandwidth: u64,
}

pub type HmatTable = InfoTable<(), HmatDomain>;
pub type HmatWriter<'a> = TableWriter<'a, (), HmatDomain>;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SratNode {
    Memory,
    Gicc,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SratEntry {
    pub node: SratNode,
    pub proximity_domain: u32,
    pub flags: u32,
    pub base: u64,
    pub length: u64,
    pub processor_uid: u32,
}

pub type SratTable = InfoTable<(), SratEntry>;
pub type SratWriter<'a> = TableWriter<'a, (), SratEntry>;

impl SratTable {
    pub fn memory_ranges(&self) -> impl Iterator<Item = &SratEntry> + '_ {
        self.entries()
            .iter()
            .filter(|entry| entry.node == SratNode::Memory)
    }

    pub fn domain_of(&self, addr: u64) -> Option<u32> {
        self.memory_ranges()
            .find(|range| addr >= range.base && addr - range.base < range.length)
            .map(|range| range.proximity_domain)
    }
}

impl HmatTable {
    pub fn bandwidth(&self, proximity_domain: u32) -> Option<&HmatDomain> {
        self.entries()
            .iter()
            .find(|domain| domain.proximity_domain == proximity_domain)
    }
}
