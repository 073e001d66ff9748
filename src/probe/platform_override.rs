//! Static platform description from `platform.rs`

use crate::error::AvsError;
use crate::info::gic::{GicComponent, GicInfoEntry, GicWriter};
use crate::info::iovirt::{IovirtEntry, IovirtNode, IovirtWriter, CCA_COHERENT};
use crate::info::memory::{MemoryKind, MemoryRegion, MemoryWriter};
use crate::info::pcie::{EcamRegion, PcieWriter};
use crate::info::pe::{PeFlags, PeInfoEntry, PeWriter};
use crate::info::peripheral::{PeripheralEntry, PeripheralKind, PeripheralWriter};
use crate::info::timer::{TimerFlags, TimerInfoHeader, TimerWriter};
use crate::info::watchdog::{WatchdogWriter, WdFlags, WdInfoEntry};
use crate::platform;
use crate::probe::PlatformProbe;

/// Describes the board with the compiled-in constants.
pub struct OverrideProbe;

impl PlatformProbe for OverrideProbe {
    fn fill_pe(&self, table: &mut PeWriter<'_>) -> Result<(), AvsError> {
        for (index, &mpidr) in platform::PE_MPIDRS.iter().enumerate() {
            let mut flags = PeFlags::PMU_PPI;
            if index == 0 {
                flags |= PeFlags::PRIMARY;
            }
            table.push(PeInfoEntry {
                pe_num: index as u32,
                flags,
                mpidr,
                pmu_gsiv: platform::PE_PMU_GSIV,
                gmain_gsiv: platform::PE_GMAIN_GSIV,
            })?;
        }
        Ok(())
    }

    fn fill_gic(&self, table: &mut GicWriter<'_>) -> Result<(), AvsError> {
        table.header_mut().version = platform::GIC_VERSION;
        table.push(GicInfoEntry::frame(GicComponent::Distributor, platform::GICD_BASE, 0x1_0000))?;
        table.push(GicInfoEntry::frame(
            GicComponent::RedistributorRange,
            platform::GICR_BASE,
            platform::GICR_LENGTH,
        ))?;
        table.push(GicInfoEntry::frame(GicComponent::Its, platform::GICITS_BASE, 0x2_0000))?;
        Ok(())
    }

    fn fill_timer(&self, table: &mut TimerWriter<'_>) -> Result<(), AvsError> {
        let level = TimerFlags::empty();
        *table.header_mut() = TimerInfoHeader {
            cnt_frequency: platform::TIMER_CNTFRQ,
            s_el1_gsiv: platform::TIMER_S_EL1_GSIV,
            s_el1_flags: level | TimerFlags::SECURE,
            ns_el1_gsiv: platform::TIMER_NS_EL1_GSIV,
            ns_el1_flags: level,
            virtual_gsiv: platform::TIMER_VIRT_GSIV,
            virtual_flags: level,
            el2_gsiv: platform::TIMER_EL2_GSIV,
            el2_flags: level,
            ..TimerInfoHeader::default()
        };
        Ok(())
    }

    fn fill_watchdog(&self, table: &mut WatchdogWriter<'_>) -> Result<(), AvsError> {
        table.push(WdInfoEntry {
            ctrl_base: platform::WD_CTRL_BASE,
            refresh_base: platform::WD_REFRESH_BASE,
            gsiv: platform::WD_GSIV,
            flags: WdFlags::empty(),
        })?;
        Ok(())
    }

    fn fill_pcie(&self, table: &mut PcieWriter<'_>) -> Result<(), AvsError> {
        table.header_mut().p2p_supported = false;
        table.push(EcamRegion {
            base: platform::PCIE_ECAM_BASE,
            segment: platform::PCIE_SEGMENT,
            start_bus: platform::PCIE_START_BUS,
            end_bus: platform::PCIE_END_BUS,
        })?;
        Ok(())
    }

    fn fill_iovirt(&self, table: &mut IovirtWriter<'_>) -> Result<(), AvsError> {
        table.push(IovirtEntry {
            base: platform::SMMU_BASE,
            ..IovirtEntry::new(IovirtNode::SmmuV3)
        })?;
        table.push(IovirtEntry {
            id: platform::PCIE_SEGMENT,
            cca: CCA_COHERENT,
            smmu_base: platform::SMMU_BASE,
            ..IovirtEntry::new(IovirtNode::PciRootComplex)
        })?;
        Ok(())
    }

    fn fill_peripheral(&self, table: &mut PeripheralWriter<'_>) -> Result<(), AvsError> {
        table.push(PeripheralEntry {
            kind: PeripheralKind::Uart,
            bdf: 0,
            base0: platform::UART_BASE as u64,
            base1: 0,
            irq: platform::UART_GSIV,
            flags: 0,
        })?;
        Ok(())
    }

    fn fill_memory(&self, table: &mut MemoryWriter<'_>) -> Result<(), AvsError> {
        let header = table.header_mut();
        header.dram_base = platform::DRAM_BASE;
        header.dram_size = platform::DRAM_SIZE;
        table.push(MemoryRegion {
            kind: MemoryKind::Normal,
            phys_addr: platform::DRAM_BASE,
            virt_addr: platform::DRAM_BASE,
            size: platform::DRAM_SIZE,
            flags: 0,
        })?;
        table.push(MemoryRegion {
            kind: MemoryKind::Device,
            phys_addr: platform::GICD_BASE,
            virt_addr: platform::GICD_BASE,
            size: 0x1_0000,
            flags: 0,
        })?;
        Ok(())
    }
}
