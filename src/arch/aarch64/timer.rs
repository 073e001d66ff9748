//! ARM Generic Timer, physical counter view

#[inline]
pub fn counter() -> u64 {
    let cnt: u64;
    unsafe {
        core::arch::asm!(
            "isb",
            "mrs {cnt}, cntpct_el0",
            cnt = out(reg) cnt,
            options(nostack, nomem),
        );
    }
    cnt
}

#[inline]
pub fn frequency() -> u64 {
    let freq: u64;
    unsafe {
        core::arch::asm!(
            "mrs {freq}, cntfrq_el0",
            freq = out(reg) freq,
            options(nostack, nomem),
        );
    }
    freq
}
