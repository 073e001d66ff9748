//! System PMU info table

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmuNode {
    ProcessorCache,
    MemoryController,
    Smmu,
    PciRootComplex,
    AcpiDevice,
    PeCluster,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PmuEntry {
    pub node: PmuNode,
    pub primary_instance: u64,
    pub secondary_instance: u32,
    pub dual_page_extension: bool,
    pub base0: u64,
    pub base1: u64,
}

pub type PmuTable = InfoTable<(), PmuEntry>;
pub type PmuWriter<'a> = TableWriter<'a, (), PmuEntry>;

impl PmuTable {
    pub fn of_node(&self, node: PmuNode) -> impl Iterator<Item = &PmuEntry> + '_ {
        self.entries().iter().filter(move |entry| entry.node == node)
    }
}
