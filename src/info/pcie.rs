//! PCIe ECAM regions and the enumerated function table

use super::{InfoTable, TableWriter};
use crate::peripherals::pcie::{Bdf, PortType};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PcieInfoHeader {
    /// Root ports may forward peer-to-peer traffic.
    pub p2p_supported: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcamRegion {
    pub base: u64,
    pub segment: u32,
    pub start_bus: u32,
    pub end_bus: u32,
}

impl EcamRegion {
    pub fn covers(&self, bdf: Bdf) -> bool {
        bdf.segment() == self.segment
            && (self.start_bus..=self.end_bus).contains(&bdf.bus())
    }
}

pub type PcieTable = InfoTable<PcieInfoHeader, EcamRegion>;
pub type PcieWriter<'a> = TableWriter<'a, PcieInfoHeader, EcamRegion>;

impl PcieTable {
    pub fn region_for(&self, bdf: Bdf) -> Option<&EcamRegion> {
        self.entries().iter().find(|ecam| ecam.covers(bdf))
    }

    pub fn p2p_supported(&self) -> bool {
        self.header().p2p_supported
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcieFunction {
    pub bdf: Bdf,
    pub vendor_id: u16,
    pub device_id: u16,
    pub class_code: u32,
    pub port_type: PortType,
}

pub type PcieDeviceTable = InfoTable<(), PcieFunction>;
pub type PcieDeviceWriter<'a> = TableWriter<'a, (), PcieFunction>;

impl PcieDeviceTable {
    pub fn of_type(&self, port_type: PortType) -> impl Iterator<Item = &PcieFunction> + '_ {
        self.entries()
            .iter()
            .filter(move |function| function.port_type == port_type)
    }
}
