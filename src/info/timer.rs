//! Timer info table: architected PE timers in the header, memory-mapped
//! system timer frames as entries.

use bitflags::bitflags;

use super::{InfoTable, TableWriter};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TimerFlags: u32 {
        const EDGE = 1 << 0;
        const ACTIVE_LOW = 1 << 1;
        const ALWAYS_ON = 1 << 2;
        const SECURE = 1 << 3;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerInfoHeader {
    pub cnt_frequency: u64,
    pub s_el1_gsiv: u32,
    pub s_el1_flags: TimerFlags,
    pub ns_el1_gsiv: u32,
    pub ns_el1_flags: TimerFlags,
    pub virtual_gsiv: u32,
    pub virtual_flags: TimerFlags,
    pub el2_gsiv: u32,
    pub el2_flags: TimerFlags,
    pub el2_virt_gsiv: u32,
    pub el2_virt_flags: TimerFlags,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SysTimerFrame {
    pub cnt_ctl_base: u64,
    pub cnt_base: u64,
    pub frame: u32,
    pub gsiv: u32,
    pub flags: TimerFlags,
}

pub type TimerTable = InfoTable<TimerInfoHeader, SysTimerFrame>;
pub type TimerWriter<'a> = TableWriter<'a, TimerInfoHeader, SysTimerFrame>;

/// Per-PE architected timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeTimer {
    SecurePhysical,
    NonSecurePhysical,
    Virtual,
    Hypervisor,
    HypervisorVirtual,
}

impl TimerTable {
    /// Interrupt id and flags of a PE timer; `None` when not described.
    pub fn pe_timer(&self, timer: PeTimer) -> Option<(u32, TimerFlags)> {
        let h = self.header();
        let (gsiv, flags) = match timer {
            PeTimer::SecurePhysical => (h.s_el1_gsiv, h.s_el1_flags),
            PeTimer::NonSecurePhysical => (h.ns_el1_gsiv, h.ns_el1_flags),
            PeTimer::Virtual => (h.virtual_gsiv, h.virtual_flags),
            PeTimer::Hypervisor => (h.el2_gsiv, h.el2_flags),
            PeTimer::HypervisorVirtual => (h.el2_virt_gsiv, h.el2_virt_flags),
        };
        (gsiv != 0).then_some((gsiv, flags))
    }

    pub fn cnt_frequency(&self) -> Option<u64> {
        Some(self.header().cnt_frequency).filter(|f| *f != 0)
    }

    pub fn num_platform_timers(&self) -> usize {
        self.len()
    }
}
