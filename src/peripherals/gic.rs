//! GIC distributor helpers
//!
//! Interrupt ids:
//! - SGI (0-15) and PPI (16-31) are banked per PE
//! - SPI (32-1019) are routed through the distributor
//!
//! Only the SPI range can be routed, queried and cleared here; extended SPI
//! and LPI ranges are rejected with [`AvsError::UnsupportedIntId`].

use log::debug;

use crate::arch::Mmio;
use crate::error::AvsError;
use crate::info::gic::GicComponent;
use crate::info::GicTable;

/// GICD register offsets
const GICD_CTLR: u64 = 0x000; // Distributor Control Register
const GICD_TYPER: u64 = 0x004; // Interrupt Controller Type Register
const GICD_ISPENDR: u64 = 0x200; // Interrupt Set-Pending Registers
const GICD_ICPENDR: u64 = 0x280; // Interrupt Clear-Pending Registers
const GICD_ISACTIVER: u64 = 0x300; // Interrupt Set-Active Registers
const GICD_ICACTIVER: u64 = 0x380; // Interrupt Clear-Active Registers
const GICD_ICFGR: u64 = 0xC00; // Interrupt Configuration Registers
const GICD_IROUTER: u64 = 0x6000; // Interrupt Routing Registers (GICv3)
const GICD_PIDR2: u64 = 0xFFE8;

pub const SPI_START: u32 = 32;
pub const SPI_END: u32 = 1019;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerType {
    Level,
    Edge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicSummary {
    pub version: u32,
    /// One past the highest SPI the distributor implements.
    pub max_intid: u32,
    /// 1 when GICD_CTLR.DS disables security, 2 otherwise.
    pub security_states: u32,
    pub affinity_routing: bool,
    pub group1_enabled: bool,
    pub its_count: usize,
    pub msi_frame_count: usize,
}

const CTLR_ENABLE_GRP1: u32 = 0b11;
const CTLR_ARE: u32 = 1 << 4;
const CTLR_DS: u32 = 1 << 6;

/// GIC distributor wrapper
pub struct GicDistributor<'a, M: ?Sized> {
    mmio: &'a M,
    base: u64,
}

impl<'a, M: Mmio + ?Sized> GicDistributor<'a, M> {
    pub const fn new(mmio: &'a M, base: u64) -> Self {
        Self { mmio, base }
    }

    /// Distributor of the platform described in `gic`.
    pub fn from_table(mmio: &'a M, gic: &GicTable) -> Result<Self, AvsError> {
        gic.gicd_base()
            .map(|base| Self::new(mmio, base))
            .ok_or(AvsError::NoGicDistributor)
    }

    fn read_reg(&self, offset: u64) -> u32 {
        self.mmio.read32(self.base + offset)
    }

    fn write_reg(&self, offset: u64, value: u32) {
        self.mmio.write32(self.base + offset, value)
    }

    fn spi(intid: u32) -> Result<(u64, u32), AvsError> {
        if !(SPI_START..=SPI_END).contains(&intid) {
            return Err(AvsError::UnsupportedIntId(intid));
        }
        Ok((u64::from(intid / 32) * 4, 1 << (intid % 32)))
    }

    /// Architecture version from GICD_PIDR2.ArchRev.
    pub fn arch_version(&self) -> u32 {
        (self.read_reg(GICD_PIDR2) >> 4) & 0xF
    }

    pub fn max_intid(&self) -> u32 {
        32 * ((self.read_reg(GICD_TYPER) & 0x1F) + 1)
    }

    /// Version, interrupt range and distributor state. The described
    /// version wins over the ID register when the table has one.
    pub fn summary(&self, gic: &GicTable) -> GicSummary {
        let described = gic.header().version;
        let ctlr = self.read_reg(GICD_CTLR);
        GicSummary {
            version: if described != 0 { described } else { self.arch_version() },
            max_intid: self.max_intid(),
            security_states: if ctlr & CTLR_DS != 0 { 1 } else { 2 },
            affinity_routing: ctlr & CTLR_ARE != 0,
            group1_enabled: ctlr & CTLR_ENABLE_GRP1 != 0,
            its_count: gic.count(GicComponent::Its),
            msi_frame_count: gic.count(GicComponent::MsiFrame),
        }
    }

    /// Routes an SPI to the PE with affinity `mpidr` (GICv3 affinity routing).
    pub fn route_spi(&self, intid: u32, mpidr: u64) -> Result<(), AvsError> {
        Self::spi(intid)?;
        let affinity = (mpidr & 0xFF_00FF_FFFF) & !(1 << 31);
        debug!("route SPI {} to {:#x}", intid, affinity);
        self.mmio.write64(self.base + GICD_IROUTER + 8 * u64::from(intid), affinity);
        Ok(())
    }

    pub fn is_pending(&self, intid: u32) -> Result<bool, AvsError> {
        let (word, bit) = Self::spi(intid)?;
        Ok(self.read_reg(GICD_ISPENDR + word) & bit != 0)
    }

    pub fn is_active(&self, intid: u32) -> Result<bool, AvsError> {
        let (word, bit) = Self::spi(intid)?;
        Ok(self.read_reg(GICD_ISACTIVER + word) & bit != 0)
    }

    pub fn clear_pending(&self, intid: u32) -> Result<(), AvsError> {
        let (word, bit) = Self::spi(intid)?;
        self.write_reg(GICD_ICPENDR + word, bit);
        Ok(())
    }

    pub fn clear_active(&self, intid: u32) -> Result<(), AvsError> {
        let (word, bit) = Self::spi(intid)?;
        self.write_reg(GICD_ICACTIVER + word, bit);
        Ok(())
    }

    pub fn trigger_type(&self, intid: u32) -> Result<TriggerType, AvsError> {
        Self::spi(intid)?;
        let cfg = self.read_reg(GICD_ICFGR + u64::from(intid / 16) * 4);
        // Int_config[1] of each 2-bit field
        Ok(if cfg & (2 << ((intid % 16) * 2)) != 0 {
            TriggerType::Edge
        } else {
            TriggerType::Level
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Regs(RefCell<HashMap<u64, u32>>);

    impl Mmio for Regs {
        fn read32(&self, addr: u64) -> u32 {
            self.0.borrow().get(&addr).copied().unwrap_or(0)
        }
        fn write32(&self, addr: u64, value: u32) {
            self.0.borrow_mut().insert(addr, value);
        }
    }

    #[test]
    fn spi_bits_and_range() {
        let regs = Regs::default();
        regs.write32(0x1000 + GICD_ISPENDR + 4, 1 << 16);
        regs.write32(0x1000 + GICD_ICFGR + 12, 2 << 2);
        let gicd = GicDistributor::new(&regs, 0x1000);

        assert_eq!(gicd.is_pending(48), Ok(true));
        assert_eq!(gicd.is_pending(49), Ok(false));
        assert_eq!(gicd.trigger_type(49), Ok(TriggerType::Edge));
        assert_eq!(gicd.is_active(16), Err(AvsError::UnsupportedIntId(16)));
        assert_eq!(gicd.clear_pending(1020), Err(AvsError::UnsupportedIntId(1020)));

        gicd.clear_pending(48).unwrap();
        assert_eq!(regs.read32(0x1000 + GICD_ICPENDR + 4), 1 << 16);
    }
}
