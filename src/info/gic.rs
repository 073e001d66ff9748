//! GIC info table
//!
//! One entry per GIC component frame. Counts per component type are
//! derived from the entries rather than stored twice.

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GicComponent {
    Distributor = 0x1000,
    /// Redistributor discovery range (GICR region).
    RedistributorRange,
    /// Per-CPU redistributor from the CPU interface description.
    CpuRedistributor,
    Its,
    MsiFrame,
    Hypervisor,
    CpuInterface,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GicInfoHeader {
    /// Architecture version as described by firmware; 0 when unknown.
    pub version: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicInfoEntry {
    pub component: GicComponent,
    pub base: u64,
    pub length: u64,
    /// ITS id, or first SPI of an MSI frame.
    pub id: u32,
    pub spi_count: u32,
}

impl GicInfoEntry {
    pub const fn frame(component: GicComponent, base: u64, length: u64) -> Self {
        Self {
            component,
            base,
            length,
            id: 0,
            spi_count: 0,
        }
    }
}

pub type GicTable = InfoTable<GicInfoHeader, GicInfoEntry>;
pub type GicWriter<'a> = TableWriter<'a, GicInfoHeader, GicInfoEntry>;

impl GicTable {
    pub fn components(&self, component: GicComponent) -> impl Iterator<Item = &GicInfoEntry> + '_ {
        self.entries()
            .iter()
            .filter(move |entry| entry.component == component)
    }

    pub fn count(&self, component: GicComponent) -> usize {
        self.components(component).count()
    }

    pub fn gicd_base(&self) -> Option<u64> {
        self.components(GicComponent::Distributor)
            .next()
            .map(|entry| entry.base)
    }

    /// First redistributor region, as `(base, length)`.
    pub fn gicr_range(&self) -> Option<(u64, u64)> {
        self.components(GicComponent::RedistributorRange)
            .next()
            .or_else(|| self.components(GicComponent::CpuRedistributor).next())
            .map(|entry| (entry.base, entry.length))
    }

    pub fn gich_base(&self) -> Option<u64> {
        self.components(GicComponent::Hypervisor)
            .next()
            .map(|entry| entry.base)
    }

    pub fn cpuif_base(&self) -> Option<u64> {
        self.components(GicComponent::CpuInterface)
            .next()
            .map(|entry| entry.base)
    }

    pub fn its(&self, index: usize) -> Option<&GicInfoEntry> {
        self.components(GicComponent::Its).nth(index)
    }
}
