//! Platform info tables
//!
//! Every table is one page-aligned block carved from the table arena:
//!
//! ```text
//! +-------------+------------------+---------+---------+-----
//! | entry count | table header (H) | entry 0 | entry 1 | ...
//! +-------------+------------------+---------+---------+-----
//! ```
//!
//! The block is sized for the platform limit of that table up front and
//! never grows. A table is filled once through a [`TableWriter`]; the entry
//! count is committed only when the fill succeeds, so a table is either
//! fully populated or reads as empty. Tests only ever see `&InfoTables`.

use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use log::{debug, error, info, warn};

use crate::arch::Mmio;
use crate::error::AvsError;
use crate::mm::{align_up, BumpAllocator};
use crate::probe::PlatformProbe;

pub mod cache;
pub mod gic;
pub mod iovirt;
pub mod memory;
pub mod mpam;
pub mod numa;
pub mod pcie;
pub mod pe;
pub mod peripheral;
pub mod pmu;
pub mod ras;
pub mod timer;
pub mod watchdog;

pub use cache::CacheTable;
pub use gic::GicTable;
pub use iovirt::IovirtTable;
pub use memory::MemoryTable;
pub use mpam::MpamTable;
pub use numa::{HmatTable, SratTable};
pub use pcie::{PcieDeviceTable, PcieTable};
pub use pe::PeTable;
pub use peripheral::PeripheralTable;
pub use pmu::PmuTable;
pub use ras::{Ras2Table, RasTable};
pub use timer::TimerTable;
pub use watchdog::WatchdogTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Pe,
    Gic,
    Timer,
    Watchdog,
    Pcie,
    PcieDevices,
    Iovirt,
    Peripheral,
    Memory,
    Pmu,
    Ras,
    Ras2,
    Cache,
    Mpam,
    Hmat,
    Srat,
}

/// Maximum entry count of each table on this platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformLimits {
    pub pe: usize,
    pub gic: usize,
    pub timer: usize,
    pub watchdog: usize,
    pub pcie_ecam: usize,
    pub pcie_devices: usize,
    pub iovirt: usize,
    pub peripheral: usize,
    pub memory: usize,
    pub pmu: usize,
    pub ras: usize,
    pub ras2: usize,
    pub cache: usize,
    pub mpam: usize,
    pub hmat: usize,
    pub srat: usize,
}

impl PlatformLimits {
    pub const fn capacity(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Pe => self.pe,
            TableKind::Gic => self.gic,
            TableKind::Timer => self.timer,
            TableKind::Watchdog => self.watchdog,
            TableKind::Pcie => self.pcie_ecam,
            TableKind::PcieDevices => self.pcie_devices,
            TableKind::Iovirt => self.iovirt,
            TableKind::Peripheral => self.peripheral,
            TableKind::Memory => self.memory,
            TableKind::Pmu => self.pmu,
            TableKind::Ras => self.ras,
            TableKind::Ras2 => self.ras2,
            TableKind::Cache => self.cache,
            TableKind::Mpam => self.mpam,
            TableKind::Hmat => self.hmat,
            TableKind::Srat => self.srat,
        }
    }
}

#[repr(C)]
struct BlockHeader<H> {
    count: u32,
    header: H,
}

/// Read-only view of one table block.
pub struct InfoTable<H, E> {
    base: Option<NonNull<u8>>,
    _marker: PhantomData<(H, E)>,
}

// Written once through `&mut`, then only read.
unsafe impl<H: Sync, E: Sync> Sync for InfoTable<H, E> {}
unsafe impl<H: Send, E: Send> Send for InfoTable<H, E> {}

impl<H: Copy + Default, E: Copy> InfoTable<H, E> {
    pub const fn empty() -> Self {
        Self {
            base: None,
            _marker: PhantomData,
        }
    }

    const fn entries_offset() -> usize {
        align_up(size_of::<BlockHeader<H>>() as u64, align_of::<E>() as u64) as usize
    }

    /// Bytes needed for a block of `capacity` entries, before page rounding.
    pub const fn block_size(capacity: usize) -> usize {
        Self::entries_offset() + capacity * size_of::<E>()
    }

    /// Allocates the block and lets `fill` populate it.
    pub fn create(
        kind: TableKind,
        arena: &mut BumpAllocator,
        capacity: usize,
        fill: impl FnOnce(&mut TableWriter<'_, H, E>) -> Result<(), AvsError>,
    ) -> Result<Self, AvsError> {
        let bytes = Self::block_size(capacity) as u64;
        let base = arena
            .alloc_pages(bytes)
            .and_then(|addr| NonNull::new(addr as *mut u8))
            .ok_or(AvsError::OutOfMemory { table: kind, bytes })?;

        let mut writer = TableWriter {
            kind,
            header: H::default(),
            // Page alignment satisfies both H and E.
            entries: unsafe { base.as_ptr().add(Self::entries_offset()).cast::<E>() },
            len: 0,
            capacity,
            _block: PhantomData,
        };
        fill(&mut writer)?;

        unsafe {
            base.as_ptr().cast::<BlockHeader<H>>().write(BlockHeader {
                count: writer.len as u32,
                header: writer.header,
            });
        }
        debug!("{:?} table: {} entries at {:#x}", kind, writer.len, base.as_ptr() as u64);
        Ok(Self {
            base: Some(base),
            _marker: PhantomData,
        })
    }

    fn block(&self) -> Option<&BlockHeader<H>> {
        self.base
            .map(|base| unsafe { &*base.as_ptr().cast::<BlockHeader<H>>() })
    }

    pub fn is_created(&self) -> bool {
        self.base.is_some()
    }

    /// Table header; the default header when the table was never created.
    pub fn header(&self) -> H {
        self.block().map_or_else(H::default, |b| b.header)
    }

    pub fn entries(&self) -> &[E] {
        match (self.base, self.block()) {
            (Some(base), Some(block)) => unsafe {
                core::slice::from_raw_parts(
                    base.as_ptr().add(Self::entries_offset()).cast::<E>(),
                    block.count as usize,
                )
            },
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.block().map_or(0, |b| b.count as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries().get(index)
    }

    fn release(&mut self) {
        self.base = None;
    }
}

/// Fill handle passed to probes while a table is being created.
pub struct TableWriter<'a, H, E> {
    kind: TableKind,
    header: H,
    entries: *mut E,
    len: usize,
    capacity: usize,
    _block: PhantomData<&'a mut E>,
}

impl<H, E: Copy> TableWriter<'_, H, E> {
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn header_mut(&mut self) -> &mut H {
        &mut self.header
    }

    pub fn push(&mut self, entry: E) -> Result<usize, AvsError> {
        if self.len == self.capacity {
            return Err(AvsError::TableFull {
                table: self.kind,
                capacity: self.capacity,
            });
        }
        unsafe { self.entries.add(self.len).write(entry) };
        self.len += 1;
        Ok(self.len - 1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries written so far.
    pub fn entries(&self) -> &[E] {
        unsafe { core::slice::from_raw_parts(self.entries, self.len) }
    }
}

fn build<H: Copy + Default, E: Copy>(
    arena: &mut BumpAllocator,
    limits: &PlatformLimits,
    kind: TableKind,
    fill: impl FnOnce(&mut TableWriter<'_, H, E>) -> Result<(), AvsError>,
) -> Result<InfoTable<H, E>, AvsError> {
    InfoTable::create(kind, arena, limits.capacity(kind), fill)
}

/// A table the suite can run without: failure is logged and leaves it empty.
fn build_optional<H: Copy + Default, E: Copy>(
    arena: &mut BumpAllocator,
    limits: &PlatformLimits,
    kind: TableKind,
    fill: impl FnOnce(&mut TableWriter<'_, H, E>) -> Result<(), AvsError>,
) -> InfoTable<H, E> {
    build(arena, limits, kind, fill).unwrap_or_else(|err| {
        warn!("{:?} info table not available: {}", kind, err);
        InfoTable::empty()
    })
}

/// All info tables of one suite run, plus the arena backing them.
pub struct InfoTables {
    arena: BumpAllocator,
    limits: PlatformLimits,
    live: bool,
    pe: PeTable,
    gic: GicTable,
    timer: TimerTable,
    watchdog: WatchdogTable,
    pcie: PcieTable,
    pcie_devices: PcieDeviceTable,
    iovirt: IovirtTable,
    peripheral: PeripheralTable,
    memory: MemoryTable,
    pmu: PmuTable,
    ras: RasTable,
    ras2: Ras2Table,
    cache: CacheTable,
    mpam: MpamTable,
    hmat: HmatTable,
    srat: SratTable,
}

impl InfoTables {
    pub fn new(arena: BumpAllocator, limits: PlatformLimits) -> Self {
        Self {
            arena,
            limits,
            live: false,
            pe: InfoTable::empty(),
            gic: InfoTable::empty(),
            timer: InfoTable::empty(),
            watchdog: InfoTable::empty(),
            pcie: InfoTable::empty(),
            pcie_devices: InfoTable::empty(),
            iovirt: InfoTable::empty(),
            peripheral: InfoTable::empty(),
            memory: InfoTable::empty(),
            pmu: InfoTable::empty(),
            ras: InfoTable::empty(),
            ras2: InfoTable::empty(),
            cache: InfoTable::empty(),
            mpam: InfoTable::empty(),
            hmat: InfoTable::empty(),
            srat: InfoTable::empty(),
        }
    }

    /// Builds every table. A PE or GIC failure is returned and ends setup;
    /// the other tables degrade to empty.
    ///
    /// Whatever was allocated before a failure stays owned by `self` and is
    /// released by [`InfoTables::free`].
    pub fn create_all<P, M>(&mut self, probe: &P, mmio: &M) -> Result<(), AvsError>
    where
        P: PlatformProbe + ?Sized,
        M: Mmio + ?Sized,
    {
        self.live = true;
        let arena = &mut self.arena;
        let limits = &self.limits;

        self.pe = build(arena, limits, TableKind::Pe, |w| probe.fill_pe(w)).map_err(|err| {
            error!("PE info table failed: {}", err);
            err
        })?;
        if self.pe.is_empty() {
            error!("PE info table has no PEs");
            return Err(AvsError::Probe {
                table: TableKind::Pe,
                reason: "no PE described",
            });
        }
        info!(" PE_INFO: Number of PE detected       : {:4}", self.pe.len());

        self.gic = build(arena, limits, TableKind::Gic, |w| probe.fill_gic(w)).map_err(|err| {
            error!("GIC info table failed: {}", err);
            err
        })?;
        if self.gic.gicd_base().is_none() {
            error!("GIC info table has no distributor");
            return Err(AvsError::Probe {
                table: TableKind::Gic,
                reason: "no distributor described",
            });
        }
        info!(" GIC_INFO: GIC version                : v{}", self.gic.header().version);

        self.timer = build_optional(arena, limits, TableKind::Timer, |w| probe.fill_timer(w));
        self.watchdog = build_optional(arena, limits, TableKind::Watchdog, |w| probe.fill_watchdog(w));
        info!(" WD_INFO: Number of Watchdogs         : {:4}", self.watchdog.len());
        self.cache = build_optional(arena, limits, TableKind::Cache, |w| probe.fill_cache(w));
        self.mpam = build_optional(arena, limits, TableKind::Mpam, |w| probe.fill_mpam(w));
        self.hmat = build_optional(arena, limits, TableKind::Hmat, |w| probe.fill_hmat(w));
        self.srat = build_optional(arena, limits, TableKind::Srat, |w| probe.fill_srat(w));
        self.ras2 = build_optional(arena, limits, TableKind::Ras2, |w| probe.fill_ras2(w));

        self.pcie = build_optional(arena, limits, TableKind::Pcie, |w| probe.fill_pcie(w));
        let ecam = &self.pcie;
        self.pcie_devices = build_optional(arena, limits, TableKind::PcieDevices, |w| {
            crate::peripherals::pcie::enumerate(mmio, ecam, w)
        });
        info!(" PCIE_INFO: Number of ECAM regions    : {:4}", self.pcie.len());
        info!(" PCIE_INFO: Number of functions       : {:4}", self.pcie_devices.len());
        self.iovirt = build_optional(arena, limits, TableKind::Iovirt, |w| probe.fill_iovirt(w));
        info!(" SMMU_INFO: Number of SMMU CTRL       : {:4}", self.iovirt.smmu_count());

        self.peripheral = build_optional(arena, limits, TableKind::Peripheral, |w| {
            probe.fill_peripheral(w)
        });
        self.memory = build_optional(arena, limits, TableKind::Memory, |w| probe.fill_memory(w));
        self.pmu = build_optional(arena, limits, TableKind::Pmu, |w| probe.fill_pmu(w));
        self.ras = build_optional(arena, limits, TableKind::Ras, |w| probe.fill_ras(w));

        debug!("info tables use {:#x} bytes of arena", self.arena.allocated());
        Ok(())
    }

    /// Releases every table and hands the arena back. Returns `false` when
    /// there was nothing left to release.
    pub fn free(&mut self) -> bool {
        if !self.live {
            return false;
        }
        self.pe.release();
        self.gic.release();
        self.timer.release();
        self.watchdog.release();
        self.pcie.release();
        self.pcie_devices.release();
        self.iovirt.release();
        self.peripheral.release();
        self.memory.release();
        self.pmu.release();
        self.ras.release();
        self.ras2.release();
        self.cache.release();
        self.mpam.release();
        self.hmat.release();
        self.srat.release();
        self.arena.reset();
        self.live = false;
        debug!("info tables freed");
        true
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn arena_in_use(&self) -> u64 {
        self.arena.allocated()
    }

    pub fn pe(&self) -> &PeTable {
        &self.pe
    }

    pub fn gic(&self) -> &GicTable {
        &self.gic
    }

    pub fn timer(&self) -> &TimerTable {
        &self.timer
    }

    pub fn watchdog(&self) -> &WatchdogTable {
        &self.watchdog
    }

    pub fn pcie(&self) -> &PcieTable {
        &self.pcie
    }

    pub fn pcie_devices(&self) -> &PcieDeviceTable {
        &self.pcie_devices
    }

    pub fn iovirt(&self) -> &IovirtTable {
        &self.iovirt
    }

    pub fn peripheral(&self) -> &PeripheralTable {
        &self.peripheral
    }

    pub fn memory(&self) -> &MemoryTable {
        &self.memory
    }

    pub fn pmu(&self) -> &PmuTable {
        &self.pmu
    }

    pub fn ras(&self) -> &RasTable {
        &self.ras
    }

    pub fn ras2(&self) -> &Ras2Table {
        &self.ras2
    }

    pub fn cache(&self) -> &CacheTable {
        &self.cache
    }

    pub fn mpam(&self) -> &MpamTable {
        &self.mpam
    }

    pub fn hmat(&self) -> &HmatTable {
        &self.hmat
    }

    pub fn srat(&self) -> &SratTable {
        &self.srat
    }
}

impl Drop for InfoTables {
    fn drop(&mut self) {
        self.free();
    }
}
