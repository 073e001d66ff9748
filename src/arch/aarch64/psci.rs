//! PSCI calls over the SMC conduit

use super::defs::{PSCI_CPU_OFF, PSCI_CPU_ON_64, PSCI_SUCCESS, PSCI_SYSTEM_OFF};

/// Issue a PSCI call with up to three arguments.
///
/// x4-x17 may be clobbered by the firmware per SMCCC.
#[inline(never)]
pub fn call(function: u32, arg0: u64, arg1: u64, arg2: u64) -> i64 {
    let ret: u64;
    unsafe {
        core::arch::asm!(
            "smc #0",
            inout("x0") u64::from(function) => ret,
            inout("x1") arg0 => _,
            inout("x2") arg1 => _,
            inout("x3") arg2 => _,
            lateout("x4") _,
            lateout("x5") _,
            lateout("x6") _,
            lateout("x7") _,
            lateout("x8") _,
            lateout("x9") _,
            lateout("x10") _,
            lateout("x11") _,
            lateout("x12") _,
            lateout("x13") _,
            lateout("x14") _,
            lateout("x15") _,
            lateout("x16") _,
            lateout("x17") _,
            options(nostack),
        );
    }
    ret as i64
}

/// Power on the PE with affinity `mpidr` at `entry`, with `context_id` in x0.
pub fn cpu_on(mpidr: u64, entry: u64, context_id: u64) -> Result<(), i32> {
    match call(PSCI_CPU_ON_64, mpidr, entry, context_id) as i32 {
        PSCI_SUCCESS => Ok(()),
        code => Err(code),
    }
}

/// Power off the calling PE.
pub fn cpu_off() -> ! {
    call(PSCI_CPU_OFF, 0, 0, 0);
    // CPU_OFF only returns on failure
    loop {
        unsafe { core::arch::asm!("wfe") };
    }
}

pub fn system_off() -> ! {
    call(PSCI_SYSTEM_OFF, 0, 0, 0);
    loop {
        unsafe { core::arch::asm!("wfe") };
    }
}
