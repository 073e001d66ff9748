//! PCIe configuration space over ECAM
//!
//! Function addressing, capability list walks and the bus scan that fills
//! the PCIe device table.

use core::fmt;

use log::{debug, trace};

use crate::arch::Mmio;
use crate::error::AvsError;
use crate::info::pcie::{PcieDeviceWriter, PcieFunction, PcieTable};

// ── Type 0/1 header ──────────────────────────────────────────────────
pub const VENDOR_ID: u32 = 0x00;
pub const STATUS_COMMAND: u32 = 0x04;
pub const CLASS_REVISION: u32 = 0x08;
pub const HEADER_TYPE: u32 = 0x0E;
pub const CAP_POINTER: u32 = 0x34;
pub const EXT_CAP_START: u32 = 0x100;

const STATUS_CAP_LIST: u32 = 1 << 20;
const HEADER_MULTI_FUNCTION: u8 = 0x80;
const NO_DEVICE: u16 = 0xFFFF;

// ── Capability ids ───────────────────────────────────────────────────
pub const CAP_PCIE: u8 = 0x10;
pub const ECAP_ACS: u16 = 0x000D;
pub const ECAP_ATS: u16 = 0x000F;
pub const ECAP_PRI: u16 = 0x0013;

/// ACS capability register, relative to the ACS extended capability.
pub const ACS_CAPABILITY: u32 = 0x4;

const MAX_CAPS: usize = 48;
const MAX_EXT_CAPS: usize = (4096 - 256) / 8;

/// Segment/bus/device/function, packed as `seg[31:24] bus[23:16]
/// dev[15:8] func[7:0]`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bdf(u32);

impl Bdf {
    pub const fn new(segment: u32, bus: u32, device: u32, function: u32) -> Self {
        Self(
            ((segment & 0xFF) << 24)
                | ((bus & 0xFF) << 16)
                | ((device & 0x1F) << 8)
                | (function & 0x7),
        )
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn segment(self) -> u32 {
        self.0 >> 24
    }

    pub const fn bus(self) -> u32 {
        (self.0 >> 16) & 0xFF
    }

    pub const fn device(self) -> u32 {
        (self.0 >> 8) & 0x1F
    }

    pub const fn function(self) -> u32 {
        self.0 & 0x7
    }
}

impl fmt::Debug for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{}",
            self.segment(),
            self.bus(),
            self.device(),
            self.function()
        )
    }
}

impl fmt::Display for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Device/port type from the PCI Express capability.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortType {
    Endpoint,
    LegacyEndpoint,
    RootPort,
    UpstreamSwitch,
    DownstreamSwitch,
    PcieToPciBridge,
    PciToPcieBridge,
    RcIntegratedEndpoint,
    RcEventCollector,
    /// No PCI Express capability.
    Conventional,
    Unknown,
}

impl PortType {
    fn from_field(raw: u32) -> Self {
        match raw {
            0x0 => Self::Endpoint,
            0x1 => Self::LegacyEndpoint,
            0x4 => Self::RootPort,
            0x5 => Self::UpstreamSwitch,
            0x6 => Self::DownstreamSwitch,
            0x7 => Self::PcieToPciBridge,
            0x8 => Self::PciToPcieBridge,
            0x9 => Self::RcIntegratedEndpoint,
            0xA => Self::RcEventCollector,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Pci(u8),
    Extended(u16),
}

/// Configuration space of every function behind the described ECAM regions.
pub struct ConfigSpace<'a, M: ?Sized> {
    mmio: &'a M,
    ecam: &'a PcieTable,
}

impl<'a, M: Mmio + ?Sized> ConfigSpace<'a, M> {
    pub fn new(mmio: &'a M, ecam: &'a PcieTable) -> Self {
        Self { mmio, ecam }
    }

    pub fn address(&self, bdf: Bdf, offset: u32) -> Result<u64, AvsError> {
        let region = self.ecam.region_for(bdf).ok_or(AvsError::NoEcam(bdf.raw()))?;
        let function = (u64::from(bdf.bus() - region.start_bus) << 20)
            | (u64::from(bdf.device()) << 15)
            | (u64::from(bdf.function()) << 12);
        Ok(region.base + function + u64::from(offset & 0xFFF))
    }

    pub fn read32(&self, bdf: Bdf, offset: u32) -> Result<u32, AvsError> {
        Ok(self.mmio.read32(self.address(bdf, offset & !0x3)?))
    }

    pub fn read16(&self, bdf: Bdf, offset: u32) -> Result<u16, AvsError> {
        Ok((self.read32(bdf, offset)? >> ((offset & 0x2) * 8)) as u16)
    }

    pub fn read8(&self, bdf: Bdf, offset: u32) -> Result<u8, AvsError> {
        Ok((self.read32(bdf, offset)? >> ((offset & 0x3) * 8)) as u8)
    }

    pub fn write32(&self, bdf: Bdf, offset: u32, value: u32) -> Result<(), AvsError> {
        self.mmio.write32(self.address(bdf, offset & !0x3)?, value);
        Ok(())
    }

    /// Config space offset of capability `cap`, if the function has it.
    pub fn find_capability(&self, bdf: Bdf, cap: Capability) -> Result<Option<u32>, AvsError> {
        match cap {
            Capability::Pci(id) => {
                if self.read32(bdf, STATUS_COMMAND)? & STATUS_CAP_LIST == 0 {
                    return Ok(None);
                }
                let mut next = u32::from(self.read8(bdf, CAP_POINTER)?) & !0x3;
                for _ in 0..MAX_CAPS {
                    if next == 0 {
                        break;
                    }
                    let header = self.read32(bdf, next)?;
                    if header as u8 == id {
                        return Ok(Some(next));
                    }
                    next = (header >> 8) & 0xFC;
                }
                Ok(None)
            }
            Capability::Extended(id) => {
                let mut next = EXT_CAP_START;
                for _ in 0..MAX_EXT_CAPS {
                    let header = self.read32(bdf, next)?;
                    if header == 0 || header == u32::MAX {
                        break;
                    }
                    if header as u16 == id {
                        return Ok(Some(next));
                    }
                    next = (header >> 20) & 0xFFC;
                    if next < EXT_CAP_START {
                        break;
                    }
                }
                Ok(None)
            }
        }
    }

    pub fn port_type(&self, bdf: Bdf) -> Result<PortType, AvsError> {
        match self.find_capability(bdf, Capability::Pci(CAP_PCIE))? {
            Some(cap) => {
                let pcie_caps = self.read16(bdf, cap + 2)?;
                Ok(PortType::from_field(u32::from(pcie_caps >> 4) & 0xF))
            }
            None => Ok(PortType::Conventional),
        }
    }
}

/// Scans every bus of every ECAM region and records the functions found.
pub fn enumerate<M: Mmio + ?Sized>(
    mmio: &M,
    ecam: &PcieTable,
    table: &mut PcieDeviceWriter<'_>,
) -> Result<(), AvsError> {
    let config = ConfigSpace::new(mmio, ecam);
    for region in ecam.entries() {
        debug!(
            "scanning segment {} buses {:#x}..={:#x} at {:#x}",
            region.segment, region.start_bus, region.end_bus, region.base
        );
        for bus in region.start_bus..=region.end_bus {
            for device in 0..32 {
                for function in 0..8 {
                    let bdf = Bdf::new(region.segment, bus, device, function);
                    let id = config.read32(bdf, VENDOR_ID)?;
                    if id as u16 == NO_DEVICE {
                        if function == 0 {
                            break;
                        }
                        continue;
                    }
                    let port_type = config.port_type(bdf)?;
                    trace!("  {} {:04x}:{:04x} {:?}", bdf, id as u16, id >> 16, port_type);
                    table.push(PcieFunction {
                        bdf,
                        vendor_id: id as u16,
                        device_id: (id >> 16) as u16,
                        class_code: config.read32(bdf, CLASS_REVISION)? >> 8,
                        port_type,
                    })?;
                    if function == 0 && config.read8(bdf, HEADER_TYPE)? & HEADER_MULTI_FUNCTION == 0 {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
