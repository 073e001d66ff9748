//! Peripheral info table (USB, SATA, UART controllers)

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeripheralKind {
    Usb,
    Sata,
    Uart,
    Other,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralEntry {
    pub kind: PeripheralKind,
    /// PCIe BDF for PCIe-attached controllers, 0 otherwise.
    pub bdf: u32,
    pub base0: u64,
    pub base1: u64,
    pub irq: u32,
    pub flags: u32,
}

pub type PeripheralTable = InfoTable<(), PeripheralEntry>;
pub type PeripheralWriter<'a> = TableWriter<'a, (), PeripheralEntry>;

impl PeripheralTable {
    pub fn of_kind(&self, kind: PeripheralKind) -> impl Iterator<Item = &PeripheralEntry> + '_ {
        self.entries().iter().filter(move |entry| entry.kind == kind)
    }

    pub fn count(&self, kind: PeripheralKind) -> usize {
        self.of_kind(kind).count()
    }
}
