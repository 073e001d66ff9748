//! Generic watchdog info table

use bitflags::bitflags;

use super::{InfoTable, TableWriter};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WdFlags: u32 {
        const EDGE = 1 << 0;
        const ACTIVE_LOW = 1 << 1;
        const SECURE = 1 << 2;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WdInfoEntry {
    pub ctrl_base: u64,
    pub refresh_base: u64,
    pub gsiv: u32,
    pub flags: WdFlags,
}

impl WdInfoEntry {
    pub fn is_secure(&self) -> bool {
        self.flags.contains(WdFlags::SECURE)
    }

    pub fn is_edge(&self) -> bool {
        self.flags.contains(WdFlags::EDGE)
    }
}

pub type WatchdogTable = InfoTable<(), WdInfoEntry>;
pub type WatchdogWriter<'a> = TableWriter<'a, (), WdInfoEntry>;

impl WatchdogTable {
    pub fn non_secure(&self) -> impl Iterator<Item = (usize, &WdInfoEntry)> + '_ {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, wd)| !wd.is_secure())
    }
}
