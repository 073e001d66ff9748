//! SBSA generic watchdog control frame

use log::debug;

use crate::arch::{Clock, Mmio};
use crate::info::timer::TimerTable;
use crate::info::watchdog::WdInfoEntry;

const WCS: u64 = 0x000; // Control and status
const WOR_LOW: u64 = 0x008; // Offset register
const WOR_HIGH: u64 = 0x00C;
const W_IIDR: u64 = 0xFCC;
const WRR: u64 = 0x000; // Refresh frame

const WCS_ENABLE: u32 = 1 << 0;
pub const WCS_WS0: u32 = 1 << 1;
pub const WCS_WS1: u32 = 1 << 2;

/// One generic watchdog, addressed through its control and refresh frames.
pub struct Watchdog<'a, M: ?Sized> {
    mmio: &'a M,
    ctrl_base: u64,
    refresh_base: u64,
}

impl<'a, M: Mmio + ?Sized> Watchdog<'a, M> {
    pub fn new(mmio: &'a M, entry: &WdInfoEntry) -> Self {
        Self {
            mmio,
            ctrl_base: entry.ctrl_base,
            refresh_base: entry.refresh_base,
        }
    }

    /// W_IIDR.ArchitectureRevision
    pub fn arch_revision(&self) -> u32 {
        (self.mmio.read32(self.ctrl_base + W_IIDR) >> 16) & 0xF
    }

    /// Width of the offset register: 32 bits for revision 0, 48 after.
    pub fn offset_width(&self) -> u32 {
        if self.arch_revision() == 0 {
            32
        } else {
            48
        }
    }

    pub fn status(&self) -> u32 {
        self.mmio.read32(self.ctrl_base + WCS)
    }

    pub fn enable(&self) {
        self.mmio.write32(self.ctrl_base + WCS, WCS_ENABLE);
    }

    pub fn disable(&self) {
        self.mmio.write32(self.ctrl_base + WCS, 0);
    }

    pub fn refresh(&self) {
        self.mmio.write32(self.refresh_base + WRR, 0);
    }

    /// Programs the WS0 timeout in counter ticks and enables the watchdog.
    /// A zero timeout disables it. Returns `false` when `ticks` does not fit
    /// the offset register.
    pub fn set_ws0(&self, ticks: u64) -> bool {
        if ticks == 0 {
            self.disable();
            return true;
        }
        let width = self.offset_width();
        if ticks >> width != 0 {
            debug!("watchdog timeout {:#x} exceeds {} bits", ticks, width);
            return false;
        }
        self.mmio.write32(self.ctrl_base + WOR_LOW, ticks as u32);
        if width > 32 {
            self.mmio.write32(self.ctrl_base + WOR_HIGH, (ticks >> 32) as u32);
        }
        self.enable();
        true
    }

    /// Offset register as programmed, masked to its implemented width.
    pub fn offset(&self) -> u64 {
        let low = u64::from(self.mmio.read32(self.ctrl_base + WOR_LOW));
        if self.offset_width() > 32 {
            low | (u64::from(self.mmio.read32(self.ctrl_base + WOR_HIGH) & 0xFFFF) << 32)
        } else {
            low
        }
    }
}

/// Frequency the watchdogs count at: CNTFRQ as described by firmware, else
/// what the PE reads from its own counter.
pub fn counter_frequency<C: Clock + ?Sized>(timer: &TimerTable, clock: &C) -> u64 {
    timer.cnt_frequency().unwrap_or_else(|| clock.frequency())
}

/// WS0 offset for a timeout of `ms` milliseconds, never zero.
pub fn timeout_ticks(frequency: u64, ms: u64) -> u64 {
    (frequency.saturating_mul(ms) / 1000).max(1)
}
