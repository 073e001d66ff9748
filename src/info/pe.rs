//! PE info table

use bitflags::bitflags;

use super::{InfoTable, TableWriter};
use crate::arch::aarch64::defs::MPIDR_AFFINITY_MASK;
use crate::error::AvsError;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PeFlags: u32 {
        /// PE the suite was started on.
        const PRIMARY = 1 << 0;
        /// PE exposes PMU overflow as a PPI.
        const PMU_PPI = 1 << 1;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeInfoEntry {
    pub pe_num: u32,
    pub flags: PeFlags,
    pub mpidr: u64,
    pub pmu_gsiv: u32,
    pub gmain_gsiv: u32,
}

pub type PeTable = InfoTable<(), PeInfoEntry>;
pub type PeWriter<'a> = TableWriter<'a, (), PeInfoEntry>;

impl PeTable {
    pub fn num_pe(&self) -> usize {
        self.len()
    }

    /// Entry `index`; valid indices are `0..num_pe()`.
    pub fn entry(&self, index: usize) -> Result<&PeInfoEntry, AvsError> {
        self.get(index).ok_or(AvsError::InvalidPeIndex(index))
    }

    pub fn mpidr(&self, index: usize) -> Result<u64, AvsError> {
        self.entry(index).map(|pe| pe.mpidr)
    }

    /// Table index of the PE with affinity `mpidr`.
    pub fn index_of(&self, mpidr: u64) -> Option<usize> {
        let affinity = mpidr & MPIDR_AFFINITY_MASK;
        self.entries()
            .iter()
            .position(|pe| pe.mpidr & MPIDR_AFFINITY_MASK == affinity)
    }

    pub fn pmu_gsiv(&self, index: usize) -> Result<u32, AvsError> {
        self.entry(index).map(|pe| pe.pmu_gsiv)
    }

    pub fn gmain_gsiv(&self, index: usize) -> Result<u32, AvsError> {
        self.entry(index).map(|pe| pe.gmain_gsiv)
    }

    pub fn primary_index(&self) -> Option<usize> {
        self.entries()
            .iter()
            .position(|pe| pe.flags.contains(PeFlags::PRIMARY))
    }
}
