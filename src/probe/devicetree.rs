//! Device tree probe
//!
//! Describes the platform from the flattened device tree handed over at
//! boot. The `fdt` crate parses in place, so the probe needs neither a heap
//! nor a copy of the blob.
//!
//! Interrupt specifiers are assumed to be GIC three-cell triplets
//! `<type number flags>`, which holds for every SBSA platform.

use fdt::node::FdtNode;
use fdt::Fdt;
use log::{debug, warn};

use crate::error::AvsError;
use crate::info::gic::{GicComponent, GicInfoEntry, GicWriter};
use crate::info::iovirt::{IovirtEntry, IovirtNode, IovirtWriter, CCA_COHERENT};
use crate::info::memory::{MemoryKind, MemoryRegion, MemoryWriter};
use crate::info::pcie::{EcamRegion, PcieWriter};
use crate::info::pe::{PeFlags, PeInfoEntry, PeWriter};
use crate::info::peripheral::{PeripheralEntry, PeripheralKind, PeripheralWriter};
use crate::info::pmu::{PmuEntry, PmuNode, PmuWriter};
use crate::info::timer::{TimerFlags, TimerInfoHeader, TimerWriter};
use crate::info::watchdog::{WatchdogWriter, WdFlags, WdInfoEntry};
use crate::info::TableKind;
use crate::probe::PlatformProbe;

const FDT_MAGIC: u32 = 0xD00D_FEED;

const GIC_SPI: u32 = 0;
const GIC_PPI: u32 = 1;
const IRQ_TYPE_EDGE_RISING: u32 = 1;
const IRQ_TYPE_EDGE_FALLING: u32 = 2;
const IRQ_TYPE_LEVEL_LOW: u32 = 8;

pub struct FdtProbe<'a> {
    fdt: Fdt<'a>,
}

/// One decoded GIC interrupt specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GicIrq {
    intid: u32,
    flags: u32,
}

impl GicIrq {
    fn is_edge(self) -> bool {
        self.flags & (IRQ_TYPE_EDGE_RISING | IRQ_TYPE_EDGE_FALLING) != 0
    }

    fn is_active_low(self) -> bool {
        self.flags & (IRQ_TYPE_EDGE_FALLING | IRQ_TYPE_LEVEL_LOW) != 0
    }
}

fn be_cells(value: &[u8]) -> impl Iterator<Item = u32> + '_ {
    value
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
}

fn is_compatible(node: &FdtNode<'_, '_>, names: &[&str]) -> bool {
    node.compatible()
        .map_or(false, |compatible| compatible.all().any(|c| names.contains(&c)))
}

fn gic_irqs<'a>(node: &FdtNode<'_, 'a>) -> impl Iterator<Item = GicIrq> + 'a {
    let value = node.property("interrupts").map_or(&[][..], |p| p.value);
    value.chunks_exact(12).filter_map(|spec| {
        let mut cells = be_cells(spec);
        let (kind, number, flags) = (cells.next()?, cells.next()?, cells.next()?);
        let intid = match kind {
            GIC_SPI => number + 32,
            GIC_PPI => number + 16,
            _ => return None,
        };
        Some(GicIrq { intid, flags })
    })
}

/// `n`-th `reg` region as `(base, size)`.
fn reg(node: &FdtNode<'_, '_>, n: usize) -> Option<(u64, u64)> {
    node.reg()?
        .nth(n)
        .map(|r| (r.starting_address as u64, r.size.unwrap_or(0) as u64))
}

fn u32_prop(node: &FdtNode<'_, '_>, name: &str) -> Option<u32> {
    node.property(name).and_then(|p| be_cells(p.value).next())
}

fn timer_flags(irq: GicIrq) -> TimerFlags {
    let mut flags = TimerFlags::empty();
    flags.set(TimerFlags::EDGE, irq.is_edge());
    flags.set(TimerFlags::ACTIVE_LOW, irq.is_active_low());
    flags
}

impl<'a> FdtProbe<'a> {
    pub fn new(blob: &'a [u8]) -> Result<Self, AvsError> {
        let fdt = Fdt::new(blob).map_err(|_| AvsError::Probe {
            table: TableKind::Pe,
            reason: "malformed device tree",
        })?;
        Ok(Self { fdt })
    }

    /// Probe over a blob left in memory by firmware.
    ///
    /// # Safety
    /// `addr` must be zero or point to readable memory holding a complete
    /// flattened device tree that outlives the probe.
    pub unsafe fn from_addr(addr: usize) -> Option<FdtProbe<'static>> {
        if addr == 0 || addr % 8 != 0 {
            return None;
        }
        let magic = core::ptr::read_volatile(addr as *const u32);
        if u32::from_be(magic) != FDT_MAGIC {
            return None;
        }
        match Fdt::from_ptr(addr as *const u8) {
            Ok(fdt) => Some(FdtProbe { fdt }),
            Err(err) => {
                warn!("device tree at {:#x} rejected: {:?}", addr, err);
                None
            }
        }
    }

    fn first_compatible(&self, names: &[&str]) -> Option<FdtNode<'_, 'a>> {
        self.fdt.all_nodes().find(|node| is_compatible(node, names))
    }

    /// Base of the SMMU whose phandle sits in cell `cell` of `prop`.
    fn smmu_behind(&self, node: &FdtNode<'_, '_>, prop: &str, cell: usize) -> u64 {
        node.property(prop)
            .and_then(|p| be_cells(p.value).nth(cell))
            .and_then(|phandle| self.fdt.find_phandle(phandle))
            .and_then(|smmu| reg(&smmu, 0))
            .map_or(0, |(base, _)| base)
    }
}

impl PlatformProbe for FdtProbe<'_> {
    fn fill_pe(&self, table: &mut PeWriter<'_>) -> Result<(), AvsError> {
        let cpus = self.fdt.find_node("/cpus").ok_or(AvsError::Probe {
            table: TableKind::Pe,
            reason: "no /cpus node",
        })?;
        let pmu_gsiv = self
            .first_compatible(&["arm,armv8-pmuv3"])
            .and_then(|pmu| gic_irqs(&pmu).next())
            .map_or(0, |irq| irq.intid);
        let gmain_gsiv = self
            .first_compatible(&["arm,gic-v3", "arm,gic-400"])
            .and_then(|gic| gic_irqs(&gic).next())
            .map_or(0, |irq| irq.intid);

        for cpu in cpus.children().filter(|n| n.name.starts_with("cpu@")) {
            let Some(cpu_reg) = cpu.property("reg") else {
                continue;
            };
            let mpidr = be_cells(cpu_reg.value).fold(0u64, |acc, cell| (acc << 32) | u64::from(cell));
            let index = table.len();
            let mut flags = PeFlags::empty();
            flags.set(PeFlags::PRIMARY, index == 0);
            flags.set(PeFlags::PMU_PPI, (16..32).contains(&pmu_gsiv));
            table.push(PeInfoEntry {
                pe_num: index as u32,
                flags,
                mpidr,
                pmu_gsiv,
                gmain_gsiv,
            })?;
        }
        debug!("fdt: {} PEs", table.len());
        Ok(())
    }

    fn fill_gic(&self, table: &mut GicWriter<'_>) -> Result<(), AvsError> {
        if let Some(gic) = self.first_compatible(&["arm,gic-v3"]) {
            table.header_mut().version = 3;
            let frames = [
                GicComponent::Distributor,
                GicComponent::RedistributorRange,
                GicComponent::CpuInterface,
                GicComponent::Hypervisor,
            ];
            for (n, component) in frames.into_iter().enumerate() {
                if let Some((base, size)) = reg(&gic, n) {
                    table.push(GicInfoEntry::frame(component, base, size))?;
                }
            }
        } else if let Some(gic) = self.first_compatible(&["arm,gic-400", "arm,cortex-a15-gic"]) {
            table.header_mut().version = 2;
            let frames = [
                GicComponent::Distributor,
                GicComponent::CpuInterface,
                GicComponent::Hypervisor,
            ];
            for (n, component) in frames.into_iter().enumerate() {
                if let Some((base, size)) = reg(&gic, n) {
                    table.push(GicInfoEntry::frame(component, base, size))?;
                }
            }
        }

        let mut its_id = 0;
        for node in self.fdt.all_nodes() {
            if is_compatible(&node, &["arm,gic-v3-its"]) {
                if let Some((base, size)) = reg(&node, 0) {
                    table.push(GicInfoEntry {
                        id: its_id,
                        ..GicInfoEntry::frame(GicComponent::Its, base, size)
                    })?;
                    its_id += 1;
                }
            } else if is_compatible(&node, &["arm,gic-v2m-frame"]) {
                if let Some((base, size)) = reg(&node, 0) {
                    table.push(GicInfoEntry {
                        id: u32_prop(&node, "arm,msi-base-spi").unwrap_or(0),
                        spi_count: u32_prop(&node, "arm,msi-num-spis").unwrap_or(0),
                        ..GicInfoEntry::frame(GicComponent::MsiFrame, base, size)
                    })?;
                }
            }
        }
        Ok(())
    }

    fn fill_timer(&self, table: &mut TimerWriter<'_>) -> Result<(), AvsError> {
        let Some(timer) = self.first_compatible(&["arm,armv8-timer"]) else {
            return Ok(());
        };
        let mut irqs = gic_irqs(&timer);
        let mut next = || irqs.next().map_or((0, TimerFlags::empty()), |i| (i.intid, timer_flags(i)));
        let (s_el1_gsiv, s_el1_flags) = next();
        let (ns_el1_gsiv, ns_el1_flags) = next();
        let (virtual_gsiv, virtual_flags) = next();
        let (el2_gsiv, el2_flags) = next();
        let (el2_virt_gsiv, el2_virt_flags) = next();
        *table.header_mut() = TimerInfoHeader {
            cnt_frequency: u32_prop(&timer, "clock-frequency").map_or(0, u64::from),
            s_el1_gsiv,
            s_el1_flags: s_el1_flags | TimerFlags::SECURE,
            ns_el1_gsiv,
            ns_el1_flags,
            virtual_gsiv,
            virtual_flags,
            el2_gsiv,
            el2_flags,
            el2_virt_gsiv,
            el2_virt_flags,
        };
        Ok(())
    }

    fn fill_watchdog(&self, table: &mut WatchdogWriter<'_>) -> Result<(), AvsError> {
        for wd in self.fdt.all_nodes().filter(|n| is_compatible(n, &["arm,sbsa-gwdt"])) {
            let (Some((refresh_base, _)), Some((ctrl_base, _))) = (reg(&wd, 0), reg(&wd, 1)) else {
                warn!("fdt: watchdog {} lacks refresh/control frames", wd.name);
                continue;
            };
            let irq = gic_irqs(&wd).next();
            let mut flags = WdFlags::empty();
            flags.set(WdFlags::EDGE, irq.map_or(false, GicIrq::is_edge));
            flags.set(WdFlags::ACTIVE_LOW, irq.map_or(false, GicIrq::is_active_low));
            table.push(WdInfoEntry {
                ctrl_base,
                refresh_base,
                gsiv: irq.map_or(0, |i| i.intid),
                flags,
            })?;
        }
        Ok(())
    }

    fn fill_pcie(&self, table: &mut PcieWriter<'_>) -> Result<(), AvsError> {
        for host in self.fdt.all_nodes().filter(|n| is_compatible(n, &["pci-host-ecam-generic"])) {
            let Some((base, _)) = reg(&host, 0) else {
                continue;
            };
            let mut bus_range = host
                .property("bus-range")
                .map(|p| be_cells(p.value))
                .into_iter()
                .flatten();
            let start_bus = bus_range.next().unwrap_or(0);
            let end_bus = bus_range.next().unwrap_or(0xFF);
            table.push(EcamRegion {
                base,
                segment: u32_prop(&host, "linux,pci-domain").unwrap_or(0),
                start_bus,
                end_bus,
            })?;
        }
        Ok(())
    }

    fn fill_iovirt(&self, table: &mut IovirtWriter<'_>) -> Result<(), AvsError> {
        for node in self.fdt.all_nodes() {
            let coherent = node.property("dma-coherent").is_some();
            let entry = if is_compatible(&node, &["arm,smmu-v3"]) {
                IovirtEntry {
                    base: reg(&node, 0).map_or(0, |(base, _)| base),
                    ..IovirtEntry::new(IovirtNode::SmmuV3)
                }
            } else if is_compatible(&node, &["arm,mmu-500", "arm,smmu-v2"]) {
                IovirtEntry {
                    base: reg(&node, 0).map_or(0, |(base, _)| base),
                    ..IovirtEntry::new(IovirtNode::SmmuV2)
                }
            } else if is_compatible(&node, &["pci-host-ecam-generic"]) {
                IovirtEntry {
                    id: u32_prop(&node, "linux,pci-domain").unwrap_or(0),
                    cca: if coherent { CCA_COHERENT } else { 0 },
                    // iommu-map = <rid-base &smmu sid-base length>
                    smmu_base: self.smmu_behind(&node, "iommu-map", 1),
                    ..IovirtEntry::new(IovirtNode::PciRootComplex)
                }
            } else if node.property("iommus").is_some() {
                IovirtEntry {
                    cca: if coherent { CCA_COHERENT } else { 0 },
                    smmu_base: self.smmu_behind(&node, "iommus", 0),
                    ..IovirtEntry::new(IovirtNode::NamedComponent)
                }
                .with_name(node.name)
            } else if is_compatible(&node, &["arm,smmu-v3-pmcg"]) {
                IovirtEntry {
                    base: reg(&node, 0).map_or(0, |(base, _)| base),
                    ..IovirtEntry::new(IovirtNode::Pmcg)
                }
            } else {
                continue;
            };
            table.push(entry)?;
        }
        Ok(())
    }

    fn fill_peripheral(&self, table: &mut PeripheralWriter<'_>) -> Result<(), AvsError> {
        for node in self.fdt.all_nodes() {
            let kind = if is_compatible(&node, &["arm,pl011", "arm,sbsa-uart"]) {
                PeripheralKind::Uart
            } else if is_compatible(&node, &["generic-xhci", "generic-ehci"]) {
                PeripheralKind::Usb
            } else if is_compatible(&node, &["generic-ahci"]) {
                PeripheralKind::Sata
            } else {
                continue;
            };
            table.push(PeripheralEntry {
                kind,
                bdf: 0,
                base0: reg(&node, 0).map_or(0, |(base, _)| base),
                base1: reg(&node, 1).map_or(0, |(base, _)| base),
                irq: gic_irqs(&node).next().map_or(0, |irq| irq.intid),
                flags: 0,
            })?;
        }
        Ok(())
    }

    fn fill_memory(&self, table: &mut MemoryWriter<'_>) -> Result<(), AvsError> {
        for node in self.fdt.all_nodes().filter(|n| n.name.starts_with("memory@") || n.name == "memory") {
            for region in node.reg().into_iter().flatten() {
                let base = region.starting_address as u64;
                let size = region.size.unwrap_or(0) as u64;
                if table.is_empty() {
                    let header = table.header_mut();
                    header.dram_base = base;
                    header.dram_size = size;
                }
                table.push(MemoryRegion {
                    kind: MemoryKind::Normal,
                    phys_addr: base,
                    virt_addr: base,
                    size,
                    flags: 0,
                })?;
            }
        }
        Ok(())
    }

    fn fill_pmu(&self, table: &mut PmuWriter<'_>) -> Result<(), AvsError> {
        for node in self.fdt.all_nodes().filter(|n| is_compatible(n, &["arm,smmu-v3-pmcg"])) {
            table.push(PmuEntry {
                node: PmuNode::Smmu,
                primary_instance: 0,
                secondary_instance: 0,
                dual_page_extension: reg(&node, 1).is_some(),
                base0: reg(&node, 0).map_or(0, |(base, _)| base),
                base1: reg(&node, 1).map_or(0, |(base, _)| base),
            })?;
        }
        Ok(())
    }
}
