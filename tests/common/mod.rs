//! Host stand-ins for the hardware seams.
//!
//! `FakeHw` keeps system registers and MMIO in maps, runs "secondary" PEs
//! inline on the calling thread and turns a panic inside a guarded body into
//! a [`Fault`], the way the exception trampoline does on hardware.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use sbsa_acs::arch::aarch64::sysreg::PhysReg;
use sbsa_acs::arch::{Clock, Fault, FaultBoundary, Mmio, PeLauncher, SysRegAccess};
use sbsa_acs::config::{SkipList, SuiteConfig};
use sbsa_acs::coordinator::Job;
use sbsa_acs::error::AvsError;
use sbsa_acs::info::gic::{GicComponent, GicInfoEntry, GicWriter};
use sbsa_acs::info::iovirt::{IovirtEntry, IovirtNode, IovirtWriter};
use sbsa_acs::info::memory::{MemoryKind, MemoryRegion, MemoryWriter};
use sbsa_acs::info::pcie::{EcamRegion, PcieWriter};
use sbsa_acs::info::pe::{PeFlags, PeInfoEntry, PeWriter};
use sbsa_acs::info::watchdog::{WatchdogWriter, WdFlags, WdInfoEntry};
use sbsa_acs::info::{InfoTables, PlatformLimits};
use sbsa_acs::mm::{BumpAllocator, PAGE_SIZE};
use sbsa_acs::probe::PlatformProbe;
use sbsa_acs::status::AvsStatus;
use sbsa_acs::sysreg::RegId;

pub const FREQUENCY: u64 = 1_000_000;
/// Ticks the fake counter advances on every read.
pub const TICK_STEP: u64 = 1_000;

pub const GICD_BASE: u64 = 0x2f00_0000;
pub const DRAM_BASE: u64 = 0x8000_0000;
pub const DRAM_SIZE: u64 = 0x4000_0000;

/// What happens to a PE the suite tries to power on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchMode {
    /// Runs the job right away on the calling thread.
    Inline,
    /// Accepts the request but never runs the job.
    Dead,
    /// PSCI refuses the request.
    Refuse,
    /// The first request per PE finds it still on (ALREADY_ON); later ones
    /// run inline.
    BusyOnce,
}

const PSCI_ALREADY_ON: i32 = -4;

pub struct FakeHw {
    sysregs: Mutex<HashMap<PhysReg, u64>>,
    mmio: Mutex<HashMap<u64, u32>>,
    traps: Mutex<HashSet<PhysReg>>,
    ticks: AtomicU64,
    pub launch_mode: LaunchMode,
    pub launched: Mutex<Vec<u64>>,
    /// Jobs accepted but not run yet, by PE index.
    parked: Mutex<HashSet<usize>>,
    pub revoked: Mutex<Vec<usize>>,
}

impl FakeHw {
    /// A compliant PE at EL2: EL2 and EL3 implemented, 48-bit PA, 4KB
    /// granule in use.
    pub fn new() -> Self {
        let hw = Self {
            sysregs: Mutex::new(HashMap::new()),
            mmio: Mutex::new(HashMap::new()),
            traps: Mutex::new(HashSet::new()),
            ticks: AtomicU64::new(0),
            launch_mode: LaunchMode::Inline,
            launched: Mutex::new(Vec::new()),
            parked: Mutex::new(HashSet::new()),
            revoked: Mutex::new(Vec::new()),
        };
        hw.set_el(2);
        hw.set_reg(RegId::MpidrEl1, 0x8000_0000);
        hw.set_reg(RegId::IdAa64pfr0El1, 0x1111);
        hw.set_reg(RegId::IdAa64mmfr0El1, 0x5);
        hw.set_reg(RegId::IdAa64dfr0El1, 0x0000_0000_0000_0506);
        hw.set_reg(RegId::PmcrEl0, 6 << 11);
        hw.set_phys(PhysReg::TcrEl2, 0);
        hw.set_phys(PhysReg::HcrEl2, 0);
        hw.set_phys(PhysReg::MairEl2, 0xFF);
        hw.set_phys(PhysReg::Ttbr0El2, 0x8100_0000);
        hw.mmio_write(GICD_BASE + 0xFFE8, 0x3B);
        hw
    }

    pub fn with_launch_mode(mut self, mode: LaunchMode) -> Self {
        self.launch_mode = mode;
        self
    }

    pub fn set_el(&self, el: u64) {
        self.set_reg(RegId::CurrentEl, el << 2);
    }

    pub fn set_reg(&self, id: RegId, value: u64) {
        self.set_phys(PhysReg::Direct(id), value);
    }

    pub fn set_phys(&self, reg: PhysReg, value: u64) {
        self.sysregs.lock().unwrap().insert(reg, value);
    }

    pub fn remove_phys(&self, reg: PhysReg) {
        self.sysregs.lock().unwrap().remove(&reg);
    }

    pub fn phys(&self, reg: PhysReg) -> Option<u64> {
        self.sysregs.lock().unwrap().get(&reg).copied()
    }

    /// The next access to `reg` takes a synchronous exception.
    pub fn trap(&self, reg: PhysReg) {
        self.traps.lock().unwrap().insert(reg);
    }

    pub fn mmio_write(&self, addr: u64, value: u32) {
        self.mmio.lock().unwrap().insert(addr, value);
    }

    pub fn mmio_value(&self, addr: u64) -> Option<u32> {
        self.mmio.lock().unwrap().get(&addr).copied()
    }
}

impl SysRegAccess for FakeHw {
    fn read_sysreg(&self, reg: PhysReg) -> Option<u64> {
        let trapped = self.traps.lock().unwrap().contains(&reg);
        if trapped {
            panic!("synchronous exception reading {:?}", reg);
        }
        self.sysregs.lock().unwrap().get(&reg).copied()
    }

    fn write_sysreg(&self, reg: PhysReg, value: u64) -> bool {
        let mut regs = self.sysregs.lock().unwrap();
        match regs.get_mut(&reg) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Unmapped addresses read as all-ones, like an empty bus.
impl Mmio for FakeHw {
    fn read32(&self, addr: u64) -> u32 {
        self.mmio.lock().unwrap().get(&addr).copied().unwrap_or(u32::MAX)
    }

    fn write32(&self, addr: u64, value: u32) {
        self.mmio_write(addr, value);
    }
}

impl Clock for FakeHw {
    fn counter(&self) -> u64 {
        self.ticks.fetch_add(TICK_STEP, Ordering::Relaxed)
    }

    fn frequency(&self) -> u64 {
        FREQUENCY
    }
}

impl PeLauncher for FakeHw {
    fn launch(&self, mpidr: u64, job: Job<'_>) -> Result<(), AvsError> {
        let first = {
            let mut launched = self.launched.lock().unwrap();
            let first = !launched.contains(&mpidr);
            launched.push(mpidr);
            first
        };
        match self.launch_mode {
            LaunchMode::Inline => {
                job.run();
                Ok(())
            }
            LaunchMode::Dead => {
                self.parked.lock().unwrap().insert(job.index);
                Ok(())
            }
            LaunchMode::Refuse => Err(AvsError::LaunchFailed {
                index: job.index,
                code: -2,
            }),
            LaunchMode::BusyOnce if first => Err(AvsError::PeBusy {
                index: job.index,
                code: PSCI_ALREADY_ON,
            }),
            LaunchMode::BusyOnce => {
                job.run();
                Ok(())
            }
        }
    }

    fn revoke(&self, index: usize) -> bool {
        let withdrawn = self.parked.lock().unwrap().remove(&index);
        if withdrawn {
            self.revoked.lock().unwrap().push(index);
        }
        withdrawn
    }
}

impl FaultBoundary for FakeHw {
    fn guarded(&self, body: &mut dyn FnMut() -> AvsStatus) -> Result<AvsStatus, Fault> {
        panic::catch_unwind(AssertUnwindSafe(|| body())).map_err(|_| Fault {
            vector: 0x200,
            esr: 0x9600_0000,
            far: 0,
            elr: 0,
        })
    }
}

/// Page-aligned host memory standing in for the table arena.
pub struct Arena {
    mem: Vec<u8>,
}

impl Arena {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size + PAGE_SIZE as usize],
        }
    }

    pub fn allocator(&mut self) -> BumpAllocator {
        // SAFETY: the tables built on this allocator are dropped before the
        // arena in every test.
        unsafe { BumpAllocator::new(self.mem.as_mut_ptr() as u64, self.mem.len() as u64) }
    }

    pub fn tables(&mut self) -> InfoTables {
        InfoTables::new(self.allocator(), LIMITS)
    }
}

pub const LIMITS: PlatformLimits = PlatformLimits {
    pe: 8,
    gic: 8,
    timer: 1,
    watchdog: 2,
    pcie_ecam: 2,
    pcie_devices: 32,
    iovirt: 8,
    peripheral: 4,
    memory: 4,
    pmu: 4,
    ras: 4,
    ras2: 4,
    cache: 4,
    mpam: 4,
    hmat: 4,
    srat: 4,
};

/// Platform description built from plain fields.
#[derive(Clone, Debug)]
pub struct TestProbe {
    pub num_pe: usize,
    pub pmu_gsiv: u32,
    pub gmain_gsiv: u32,
    pub gic_version: u32,
    pub with_gicd: bool,
    pub watchdogs: Vec<WdInfoEntry>,
    pub ecam: Vec<EcamRegion>,
    pub p2p: bool,
    pub smmu_versions: Vec<IovirtNode>,
    pub memory: bool,
}

impl TestProbe {
    pub fn sbsa(num_pe: usize) -> Self {
        Self {
            num_pe,
            pmu_gsiv: 23,
            gmain_gsiv: 25,
            gic_version: 3,
            with_gicd: true,
            watchdogs: Vec::new(),
            ecam: Vec::new(),
            p2p: false,
            smmu_versions: Vec::new(),
            memory: true,
        }
    }

    pub fn mpidr(index: usize) -> u64 {
        0x8000_0000 | index as u64
    }
}

impl PlatformProbe for TestProbe {
    fn fill_pe(&self, table: &mut PeWriter<'_>) -> Result<(), AvsError> {
        for index in 0..self.num_pe {
            let mut flags = PeFlags::PMU_PPI;
            flags.set(PeFlags::PRIMARY, index == 0);
            table.push(PeInfoEntry {
                pe_num: index as u32,
                flags,
                mpidr: Self::mpidr(index),
                pmu_gsiv: self.pmu_gsiv,
                gmain_gsiv: self.gmain_gsiv,
            })?;
        }
        Ok(())
    }

    fn fill_gic(&self, table: &mut GicWriter<'_>) -> Result<(), AvsError> {
        table.header_mut().version = self.gic_version;
        if self.with_gicd {
            table.push(GicInfoEntry::frame(GicComponent::Distributor, GICD_BASE, 0x1_0000))?;
        }
        table.push(GicInfoEntry::frame(GicComponent::RedistributorRange, 0x2f10_0000, 0x10_0000))?;
        Ok(())
    }

    fn fill_watchdog(&self, table: &mut WatchdogWriter<'_>) -> Result<(), AvsError> {
        for wd in &self.watchdogs {
            table.push(*wd)?;
        }
        Ok(())
    }

    fn fill_pcie(&self, table: &mut PcieWriter<'_>) -> Result<(), AvsError> {
        table.header_mut().p2p_supported = self.p2p;
        for ecam in &self.ecam {
            table.push(*ecam)?;
        }
        Ok(())
    }

    fn fill_iovirt(&self, table: &mut IovirtWriter<'_>) -> Result<(), AvsError> {
        for (n, node) in self.smmu_versions.iter().enumerate() {
            table.push(IovirtEntry {
                base: 0x0900_0000 + 0x2_0000 * n as u64,
                ..IovirtEntry::new(*node)
            })?;
        }
        Ok(())
    }

    fn fill_memory(&self, table: &mut MemoryWriter<'_>) -> Result<(), AvsError> {
        if !self.memory {
            return Ok(());
        }
        let header = table.header_mut();
        header.dram_base = DRAM_BASE;
        header.dram_size = DRAM_SIZE;
        table.push(MemoryRegion {
            kind: MemoryKind::Normal,
            phys_addr: DRAM_BASE,
            virt_addr: DRAM_BASE,
            size: DRAM_SIZE,
            flags: 0,
        })?;
        Ok(())
    }
}

pub fn watchdog(ctrl_base: u64, refresh_base: u64, gsiv: u32) -> WdInfoEntry {
    WdInfoEntry {
        ctrl_base,
        refresh_base,
        gsiv,
        flags: WdFlags::empty(),
    }
}

pub fn config(level: u32) -> SuiteConfig {
    SuiteConfig {
        level,
        print_level: 3,
        wakeup_timeout_ms: 10,
        enable_pcie_tests: true,
        skip: SkipList::empty(),
        single_test: None,
        single_module: None,
    }
}
