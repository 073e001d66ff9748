//! Platform/Board Constants (QEMU sbsa-ref machine)
//!
//! All board-specific addresses, override values and table limits live
//! here so they can be changed in one place when targeting a different
//! platform. The static description below feeds `probe::OverrideProbe`
//! when no device tree is handed over at boot.

use crate::info::PlatformLimits;

// ── Console ──────────────────────────────────────────────────────────
pub const UART_BASE: usize = 0x6000_0000;

// ── Info table arena ─────────────────────────────────────────────────
pub const TABLE_ARENA_BASE: u64 = 0x100_0100_0000;
pub const TABLE_ARENA_SIZE: u64 = 0x100_0000; // 16MB

/// Upper bound on PEs the status registry can track.
pub const MAX_PE: usize = 256;

// ── Suite overrides ──────────────────────────────────────────────────
pub const OVERRIDE_SBSA_LEVEL: u32 = 4;
pub const OVERRIDE_PRINT_LEVEL: u32 = 3;
pub const OVERRIDE_WAKEUP_TIMEOUT_MS: u32 = 500;
pub const OVERRIDE_ENABLE_PCIE_TESTS: bool = true;
pub const OVERRIDE_SKIP_LIST: &[u32] = &[];

pub const LIMITS: PlatformLimits = PlatformLimits {
    pe: 256,
    gic: 64,
    timer: 8,
    watchdog: 4,
    pcie_ecam: 8,
    pcie_devices: 512,
    iovirt: 64,
    peripheral: 16,
    memory: 32,
    pmu: 64,
    ras: 64,
    ras2: 16,
    cache: 256,
    mpam: 32,
    hmat: 16,
    srat: 64,
};

// ── Static platform description ──────────────────────────────────────
pub const PE_MPIDRS: &[u64] = &[0x0, 0x1, 0x2, 0x3];
pub const PE_PMU_GSIV: u32 = 23;
pub const PE_GMAIN_GSIV: u32 = 25;

pub const GIC_VERSION: u32 = 3;
pub const GICD_BASE: u64 = 0x4006_0000;
pub const GICR_BASE: u64 = 0x4008_0000;
pub const GICR_LENGTH: u64 = 0x400_0000;
pub const GICITS_BASE: u64 = 0x4408_1000;

pub const TIMER_CNTFRQ: u64 = 62_500_000;
pub const TIMER_S_EL1_GSIV: u32 = 29;
pub const TIMER_NS_EL1_GSIV: u32 = 30;
pub const TIMER_VIRT_GSIV: u32 = 27;
pub const TIMER_EL2_GSIV: u32 = 26;

pub const WD_REFRESH_BASE: u64 = 0x5001_0000;
pub const WD_CTRL_BASE: u64 = 0x5001_1000;
pub const WD_GSIV: u32 = 48;

pub const PCIE_ECAM_BASE: u64 = 0xF000_0000;
pub const PCIE_SEGMENT: u32 = 0;
pub const PCIE_START_BUS: u32 = 0;
pub const PCIE_END_BUS: u32 = 0xFF;

pub const SMMU_BASE: u64 = 0x6005_0000;

pub const DRAM_BASE: u64 = 0x100_0000_0000;
pub const DRAM_SIZE: u64 = 0x4000_0000;

pub const UART_GSIV: u32 = 33;
