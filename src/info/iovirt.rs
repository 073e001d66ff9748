//! IO virtualization table: SMMUs, root complexes, named components,
//! ITS groups and PMCGs.
//!
//! Requester nodes record the base of the SMMU their DMA goes through
//! (0 when they bypass translation) and their cache-coherency attribute.
//! ID mappings are not kept; no check here needs them.

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IovirtNode {
    ItsGroup,
    NamedComponent,
    PciRootComplex,
    SmmuV2,
    SmmuV3,
    Pmcg,
}

/// Coherent, DMA-capable requester.
pub const CCA_COHERENT: u32 = 1;

pub const NAME_LEN: usize = 32;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IovirtEntry {
    pub node: IovirtNode,
    /// Register base of an SMMU or PMCG node.
    pub base: u64,
    /// PCIe segment of a root complex, ITS id of an ITS group.
    pub id: u32,
    pub cca: u32,
    /// SMMU in front of a requester node.
    pub smmu_base: u64,
    pub name: [u8; NAME_LEN],
}

impl IovirtEntry {
    pub const fn new(node: IovirtNode) -> Self {
        Self {
            node,
            base: 0,
            id: 0,
            cca: 0,
            smmu_base: 0,
            name: [0; NAME_LEN],
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        let len = name.len().min(NAME_LEN);
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        self
    }

    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("?")
    }

    pub fn is_smmu(&self) -> bool {
        matches!(self.node, IovirtNode::SmmuV2 | IovirtNode::SmmuV3)
    }

    /// Coherent DMA requester without an SMMU in its path.
    pub fn dma_bypasses_smmu(&self) -> bool {
        self.cca == CCA_COHERENT && self.smmu_base == 0
    }
}

pub type IovirtTable = InfoTable<(), IovirtEntry>;
pub type IovirtWriter<'a> = TableWriter<'a, (), IovirtEntry>;

impl IovirtTable {
    pub fn nodes(&self, node: IovirtNode) -> impl Iterator<Item = &IovirtEntry> + '_ {
        self.entries().iter().filter(move |entry| entry.node == node)
    }

    pub fn smmus(&self) -> impl Iterator<Item = &IovirtEntry> + '_ {
        self.entries().iter().filter(|entry| entry.is_smmu())
    }

    pub fn smmu_count(&self) -> usize {
        self.smmus().count()
    }

    /// Architecture major version of SMMU `index`.
    pub fn smmu_version(&self, index: usize) -> Option<u32> {
        self.smmus().nth(index).map(|smmu| match smmu.node {
            IovirtNode::SmmuV2 => 2,
            _ => 3,
        })
    }

    pub fn smmu_base(&self, index: usize) -> Option<u64> {
        self.smmus().nth(index).map(|smmu| smmu.base)
    }
}
