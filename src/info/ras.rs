//! RAS error nodes and RAS2 feature blocks

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasNode {
    Pe,
    MemoryController,
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasInterface {
    SystemRegister,
    Mmio,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasNodeEntry {
    pub node: RasNode,
    pub interface: RasInterface,
    /// Error record group base for MMIO nodes.
    pub base: u64,
    /// MPIDR of the PE, or proximity domain of a memory controller.
    pub owner: u64,
    pub start_record: u32,
    pub num_records: u32,
    /// Bitmap of implemented error records.
    pub implemented: u64,
    pub fault_gsiv: u32,
    pub error_gsiv: u32,
}

pub type RasTable = InfoTable<(), RasNodeEntry>;
pub type RasWriter<'a> = TableWriter<'a, (), RasNodeEntry>;

impl RasTable {
    pub fn of_node(&self, node: RasNode) -> impl Iterator<Item = &RasNodeEntry> + '_ {
        self.entries().iter().filter(move |entry| entry.node == node)
    }

    /// RAS node describing the PE with affinity `mpidr`.
    pub fn pe_node(&self, mpidr: u64) -> Option<&RasNodeEntry> {
        self.of_node(RasNode::Pe).find(|node| node.owner == mpidr)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ras2Block {
    pub proximity_domain: u32,
    pub patrol_scrub: bool,
}

pub type Ras2Table = InfoTable<(), Ras2Block>;
pub type Ras2Writer<'a> = TableWriter<'a, (), Ras2Block>;
