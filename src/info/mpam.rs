//! MPAM memory system component (MSC) table, one entry per MSC

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MpamLocator {
    ProcessorCache,
    Memory,
    Smmu,
    MemoryCache,
    AcpiDevice,
    Unknown,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MscEntry {
    pub base: u64,
    pub length: u32,
    pub max_nrdy_usec: u32,
    pub resource_count: u32,
    /// Locator of the first resource behind this MSC.
    pub locator: MpamLocator,
    pub descriptor: u64,
}

pub type MpamTable = InfoTable<(), MscEntry>;
pub type MpamWriter<'a> = TableWriter<'a, (), MscEntry>;

impl MpamTable {
    pub fn msc_count(&self) -> usize {
        self.len()
    }

    pub fn memory_mscs(&self) -> impl Iterator<Item = &MscEntry> + '_ {
        self.entries()
            .iter()
            .filter(|msc| msc.locator == MpamLocator::Memory)
    }
}
