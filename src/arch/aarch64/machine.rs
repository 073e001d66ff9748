//! The real machine behind the hardware seams
//!
//! Secondary PEs are started with PSCI CPU_ON at `acs_secondary_entry`,
//! with their PE index as context id. Each PE index owns a mailbox the
//! primary fills with the job before powering the PE on; the secondary
//! takes it, runs it and powers itself off again.

use core::arch::global_asm;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use super::defs::{PSCI_ALREADY_ON, PSCI_ON_PENDING};
use super::sysreg::{self, PhysReg};
use super::{exception, psci, timer};
use crate::arch::{Clock, Fault, FaultBoundary, Mmio, PeLauncher, SysRegAccess};
use crate::coordinator::Job;
use crate::error::AvsError;
use crate::platform::MAX_PE;
use crate::status::AvsStatus;
use crate::sync::SpinLock;

const SECONDARY_STACK_SIZE: usize = 8 * 1024;

#[repr(C, align(16))]
struct SecondaryStacks(UnsafeCell<[[u8; SECONDARY_STACK_SIZE]; MAX_PE]>);

// Each stack is only ever used by the PE with the matching index.
unsafe impl Sync for SecondaryStacks {}

#[no_mangle]
static ACS_SECONDARY_STACKS: SecondaryStacks =
    SecondaryStacks(UnsafeCell::new([[0; SECONDARY_STACK_SIZE]; MAX_PE]));

global_asm!(
    r#"
.section .text
.global acs_secondary_entry
acs_secondary_entry:
    // x0: PE index
    adrp    x1, ACS_SECONDARY_STACKS
    add     x1, x1, :lo12:ACS_SECONDARY_STACKS
    add     x2, x0, #1
    lsl     x2, x2, #13
    add     x1, x1, x2
    mov     sp, x1
    bl      acs_secondary_main
1:  wfe
    b       1b
"#
);

extern "C" {
    fn acs_secondary_entry();
}

const NO_JOB: SpinLock<Option<Job<'static>>> = SpinLock::new(None);
static MAILBOXES: [SpinLock<Option<Job<'static>>>; MAX_PE] = [NO_JOB; MAX_PE];

/// Secondaries between taking a job and finishing it.
static RUNNING: AtomicUsize = AtomicUsize::new(0);

/// Called by the exception handler on a secondary that faulted in its job.
pub(super) fn job_abandoned() {
    let _ = RUNNING.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
}

#[no_mangle]
extern "C" fn acs_secondary_main(index: u64) -> ! {
    exception::install_vectors();
    let job = MAILBOXES.get(index as usize).and_then(|mailbox| {
        let mut slot = mailbox.lock();
        let job = slot.take();
        if job.is_some() {
            RUNNING.fetch_add(1, Ordering::AcqRel);
        }
        job
    });
    if let Some(job) = job {
        job.run();
        RUNNING.fetch_sub(1, Ordering::AcqRel);
    }
    psci::cpu_off()
}

/// AArch64 bare-metal implementation of [`crate::arch::Hardware`].
pub struct BareMetal;

impl SysRegAccess for BareMetal {
    fn read_sysreg(&self, reg: PhysReg) -> Option<u64> {
        sysreg::read(reg)
    }

    fn write_sysreg(&self, reg: PhysReg, value: u64) -> bool {
        sysreg::write(reg, value)
    }
}

impl Mmio for BareMetal {
    fn read32(&self, addr: u64) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    fn write32(&self, addr: u64, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    fn read64(&self, addr: u64) -> u64 {
        unsafe { core::ptr::read_volatile(addr as *const u64) }
    }

    fn write64(&self, addr: u64, value: u64) {
        unsafe { core::ptr::write_volatile(addr as *mut u64, value) }
    }
}

impl Clock for BareMetal {
    fn counter(&self) -> u64 {
        timer::counter()
    }

    fn frequency(&self) -> u64 {
        timer::frequency()
    }
}

impl PeLauncher for BareMetal {
    fn launch(&self, mpidr: u64, job: Job<'_>) -> Result<(), AvsError> {
        let index = job.index;
        let mailbox = MAILBOXES.get(index).ok_or(AvsError::InvalidPeIndex(index))?;
        // SAFETY: the job borrows the runtime held by the suite context,
        // which outlives the guarded phase. The coordinator withdraws jobs
        // not taken before the join timeout, and the dispatcher drains
        // secondaries still inside a job before the context is dropped.
        let job: Job<'static> = unsafe { core::mem::transmute::<Job<'_>, Job<'static>>(job) };
        *mailbox.lock() = Some(job);

        let entry = acs_secondary_entry as usize as u64;
        match psci::cpu_on(mpidr, entry, index as u64) {
            Ok(()) => {
                debug!("PE {} ({:#x}) powered on", index, mpidr);
                Ok(())
            }
            Err(code) => {
                mailbox.lock().take();
                if code == PSCI_ALREADY_ON || code == PSCI_ON_PENDING {
                    return Err(AvsError::PeBusy { index, code });
                }
                Err(AvsError::LaunchFailed { index, code })
            }
        }
    }

    fn revoke(&self, index: usize) -> bool {
        MAILBOXES
            .get(index)
            .map_or(false, |mailbox| mailbox.lock().take().is_some())
    }

    fn busy(&self) -> usize {
        RUNNING.load(Ordering::Acquire)
    }
}

impl FaultBoundary for BareMetal {
    fn guarded(&self, body: &mut dyn FnMut() -> AvsStatus) -> Result<AvsStatus, Fault> {
        exception::guarded(body)
    }
}
