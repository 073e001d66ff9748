//! Default exception handling
//!
//! Every vector of the table funnels into `acs_handle_exception` with its
//! vector index. The fault is recorded and, when the faulting PE is the one
//! running a guarded phase, execution resumes at the guard point with the
//! callee-saved state captured on entry (`acs_guarded_call`), so the guard
//! returns "faulted" to its caller. Any other PE reports and powers off.

use core::arch::global_asm;
use core::ffi::c_void;
use core::sync::atomic::{AtomicU64, Ordering};

use super::defs::{CURRENT_EL_MASK, CURRENT_EL_SHIFT, MPIDR_AFFINITY_MASK};
use super::psci;
use crate::arch::Fault;
use crate::status::AvsStatus;

global_asm!(
    r#"
.section .text.acs_vectors, "ax"
.balign 2048
.global acs_vector_table
acs_vector_table:
.irp idx, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15
    .balign 0x80
    mov     x0, #\idx
    b       acs_exception_entry
.endr

.section .text
acs_exception_entry:
    bl      acs_handle_exception
    // x0: jump buffer of the armed guard
    adr     x1, acs_fault_resume
    mrs     x2, CurrentEL
    cmp     x2, #(2 << 2)
    b.eq    1f
    msr     elr_el1, x1
    isb
    eret
1:
    msr     elr_el2, x1
    isb
    eret

// u64 acs_guarded_call(JumpBuffer *buf, u32 (*body)(void *), void *arg)
.global acs_guarded_call
acs_guarded_call:
    stp     x19, x20, [x0, #0]
    stp     x21, x22, [x0, #16]
    stp     x23, x24, [x0, #32]
    stp     x25, x26, [x0, #48]
    stp     x27, x28, [x0, #64]
    stp     x29, x30, [x0, #80]
    mov     x9, sp
    str     x9, [x0, #96]
    mov     x19, x0
    mov     x0, x2
    blr     x1
    // Normal return: status in w0
    mov     w0, w0
    ldr     x30, [x19, #88]
    ldr     x19, [x19, #0]
    ret

.global acs_fault_resume
acs_fault_resume:
    ldp     x19, x20, [x0, #0]
    ldp     x21, x22, [x0, #16]
    ldp     x23, x24, [x0, #32]
    ldp     x25, x26, [x0, #48]
    ldp     x27, x28, [x0, #64]
    ldp     x29, x30, [x0, #80]
    ldr     x9, [x0, #96]
    mov     sp, x9
    mov     x0, #1
    lsl     x0, x0, #32
    ret
"#
);

extern "C" {
    static acs_vector_table: u8;
    fn acs_guarded_call(
        buf: *mut JumpBuffer,
        body: extern "C" fn(*mut c_void) -> u32,
        arg: *mut c_void,
    ) -> u64;
}

/// x19-x30 and sp of the guard frame.
#[repr(C, align(16))]
struct JumpBuffer {
    regs: [u64; 14],
}

/// Set while a guarded phase runs: the jump buffer and the owning PE.
static ARMED_BUFFER: AtomicU64 = AtomicU64::new(0);
static ARMED_MPIDR: AtomicU64 = AtomicU64::new(0);

/// Last fault taken on the guarded PE.
static FAULT_VECTOR: AtomicU64 = AtomicU64::new(0);
static FAULT_ESR: AtomicU64 = AtomicU64::new(0);
static FAULT_FAR: AtomicU64 = AtomicU64::new(0);
static FAULT_ELR: AtomicU64 = AtomicU64::new(0);

const FAULTED: u64 = 1 << 32;

fn current_el() -> u64 {
    let el: u64;
    unsafe { core::arch::asm!("mrs {}, CurrentEL", out(reg) el, options(nomem, nostack)) };
    (el >> CURRENT_EL_SHIFT) & CURRENT_EL_MASK
}

fn mpidr() -> u64 {
    let mpidr: u64;
    unsafe { core::arch::asm!("mrs {}, mpidr_el1", out(reg) mpidr, options(nomem, nostack)) };
    mpidr & MPIDR_AFFINITY_MASK
}

/// Points VBAR of the current EL at the vector table.
pub fn install_vectors() {
    let vbar = unsafe { &acs_vector_table as *const u8 as u64 };
    unsafe {
        if current_el() == 2 {
            core::arch::asm!("msr vbar_el2, {}", "isb", in(reg) vbar, options(nostack));
        } else {
            core::arch::asm!("msr vbar_el1, {}", "isb", in(reg) vbar, options(nostack));
        }
    }
}

fn syndrome() -> (u64, u64, u64) {
    let (esr, far, elr): (u64, u64, u64);
    unsafe {
        if current_el() == 2 {
            core::arch::asm!(
                "mrs {esr}, esr_el2",
                "mrs {far}, far_el2",
                "mrs {elr}, elr_el2",
                esr = out(reg) esr,
                far = out(reg) far,
                elr = out(reg) elr,
                options(nomem, nostack),
            );
        } else {
            core::arch::asm!(
                "mrs {esr}, esr_el1",
                "mrs {far}, far_el1",
                "mrs {elr}, elr_el1",
                esr = out(reg) esr,
                far = out(reg) far,
                elr = out(reg) elr,
                options(nomem, nostack),
            );
        }
    }
    (esr, far, elr)
}

#[no_mangle]
extern "C" fn acs_handle_exception(vector: u64) -> u64 {
    let (esr, far, elr) = syndrome();
    crate::uart::write_fmt_nowait(format_args!(
        "\n      Unexpected exception {} on PE {:#x}: ESR {:#x} FAR {:#x} ELR {:#x}\n",
        vector,
        mpidr(),
        esr,
        far,
        elr
    ));

    let buffer = ARMED_BUFFER.load(Ordering::Acquire);
    if ARMED_MPIDR.load(Ordering::Relaxed) != mpidr() {
        // Secondary PE: its job ends here, the slot stays pending
        super::machine::job_abandoned();
        psci::cpu_off();
    }
    if buffer == 0 {
        // Nothing to unwind to
        psci::cpu_off();
    }

    FAULT_VECTOR.store(vector, Ordering::Relaxed);
    FAULT_ESR.store(esr, Ordering::Relaxed);
    FAULT_FAR.store(far, Ordering::Relaxed);
    FAULT_ELR.store(elr, Ordering::Relaxed);
    ARMED_BUFFER.store(0, Ordering::Release);
    buffer
}

extern "C" fn trampoline(arg: *mut c_void) -> u32 {
    let body = unsafe { &mut *(arg as *mut &mut dyn FnMut() -> AvsStatus) };
    match body() {
        AvsStatus::Pass => 0,
        AvsStatus::Fail => 1,
        AvsStatus::Skip => 2,
        AvsStatus::Error => 3,
    }
}

/// Runs `body` with the fault trampoline armed on this PE.
///
/// On a fault the frames of `body` are abandoned without running their
/// destructors.
pub fn guarded(body: &mut dyn FnMut() -> AvsStatus) -> Result<AvsStatus, Fault> {
    install_vectors();
    let mut buffer = JumpBuffer { regs: [0; 14] };
    let mut body = body;

    ARMED_MPIDR.store(mpidr(), Ordering::Relaxed);
    ARMED_BUFFER.store(&mut buffer as *mut JumpBuffer as u64, Ordering::Release);
    let ret = unsafe {
        acs_guarded_call(
            &mut buffer,
            trampoline,
            &mut body as *mut &mut dyn FnMut() -> AvsStatus as *mut c_void,
        )
    };
    ARMED_BUFFER.store(0, Ordering::Release);

    if ret & FAULTED != 0 {
        return Err(Fault {
            vector: FAULT_VECTOR.load(Ordering::Relaxed),
            esr: FAULT_ESR.load(Ordering::Relaxed),
            far: FAULT_FAR.load(Ordering::Relaxed),
            elr: FAULT_ELR.load(Ordering::Relaxed),
        });
    }
    Ok(match ret as u32 {
        0 => AvsStatus::Pass,
        1 => AvsStatus::Fail,
        2 => AvsStatus::Skip,
        _ => AvsStatus::Error,
    })
}
