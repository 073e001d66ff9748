//! Hardware seams
//!
//! Everything the runtime needs from the machine goes through these traits:
//! system registers, memory-mapped registers, the generic counter, PSCI
//! CPU_ON and the exception trampoline. The bare-metal implementation lives
//! in `arch::aarch64`; host tests provide fakes.

use crate::arch::aarch64::sysreg::PhysReg;
use crate::coordinator::Job;
use crate::error::AvsError;
use crate::status::AvsStatus;

/// Raw system register access. `None`/`false` means the implementation has
/// no accessor for that register in that direction.
pub trait SysRegAccess {
    fn read_sysreg(&self, reg: PhysReg) -> Option<u64>;
    fn write_sysreg(&self, reg: PhysReg, value: u64) -> bool;
}

/// Memory-mapped register access (GIC, ECAM, watchdog frames).
pub trait Mmio {
    fn read32(&self, addr: u64) -> u32;
    fn write32(&self, addr: u64, value: u32);

    fn read64(&self, addr: u64) -> u64 {
        u64::from(self.read32(addr)) | (u64::from(self.read32(addr + 4)) << 32)
    }

    fn write64(&self, addr: u64, value: u64) {
        self.write32(addr, value as u32);
        self.write32(addr + 4, (value >> 32) as u32);
    }
}

/// System counter used for every timeout in the suite.
pub trait Clock {
    fn counter(&self) -> u64;
    fn frequency(&self) -> u64;

    /// Counter ticks in `ms` milliseconds, never zero.
    fn ticks_for_ms(&self, ms: u64) -> u64 {
        (self.frequency().saturating_mul(ms) / 1000).max(1)
    }
}

/// Powers up a secondary PE and has it execute a job.
///
/// `launch` answers [`AvsError::PeBusy`] while the PE is still on from an
/// earlier job; the coordinator retries those until the wake-up timeout.
pub trait PeLauncher {
    fn launch(&self, mpidr: u64, job: Job<'_>) -> Result<(), AvsError>;

    /// Withdraws the job handed to PE `index` if the PE has not taken it
    /// yet. Returns whether a job was withdrawn.
    fn revoke(&self, _index: usize) -> bool {
        false
    }

    /// Number of secondaries still inside a job.
    fn busy(&self) -> usize {
        0
    }
}

/// Synchronous exception or SError taken while a guarded body ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fault {
    pub vector: u64,
    pub esr: u64,
    pub far: u64,
    pub elr: u64,
}

/// Runs a body with the default exception handler armed. A fault unwinds
/// straight back here and is returned instead of the body's verdict.
pub trait FaultBoundary {
    fn guarded(&self, body: &mut dyn FnMut() -> AvsStatus) -> Result<AvsStatus, Fault>;
}

/// Everything the suite needs from one machine.
pub trait Hardware: SysRegAccess + Mmio + Clock + PeLauncher + FaultBoundary + Sync {}

impl<T> Hardware for T where T: SysRegAccess + Mmio + Clock + PeLauncher + FaultBoundary + Sync {}
