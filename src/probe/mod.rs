//! Platform discovery
//!
//! A probe knows how to describe one platform. Table creation hands it one
//! writer per table; whatever it pushes becomes the table content. PE and
//! GIC must be described, every other table may stay empty.

use crate::error::AvsError;
use crate::info::cache::CacheWriter;
use crate::info::gic::GicWriter;
use crate::info::iovirt::IovirtWriter;
use crate::info::memory::MemoryWriter;
use crate::info::mpam::MpamWriter;
use crate::info::numa::{HmatWriter, SratWriter};
use crate::info::pcie::PcieWriter;
use crate::info::pe::PeWriter;
use crate::info::peripheral::PeripheralWriter;
use crate::info::pmu::PmuWriter;
use crate::info::ras::{Ras2Writer, RasWriter};
use crate::info::timer::TimerWriter;
use crate::info::watchdog::WatchdogWriter;

#[cfg(feature = "fdt-probe")]
pub mod devicetree;
pub mod platform_override;

#[cfg(feature = "fdt-probe")]
pub use devicetree::FdtProbe;
pub use platform_override::OverrideProbe;

pub trait PlatformProbe {
    fn fill_pe(&self, table: &mut PeWriter<'_>) -> Result<(), AvsError>;
    fn fill_gic(&self, table: &mut GicWriter<'_>) -> Result<(), AvsError>;

    fn fill_timer(&self, _table: &mut TimerWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_watchdog(&self, _table: &mut WatchdogWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_pcie(&self, _table: &mut PcieWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_iovirt(&self, _table: &mut IovirtWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_peripheral(&self, _table: &mut PeripheralWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_memory(&self, _table: &mut MemoryWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_pmu(&self, _table: &mut PmuWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_ras(&self, _table: &mut RasWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_ras2(&self, _table: &mut Ras2Writer<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_cache(&self, _table: &mut CacheWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_mpam(&self, _table: &mut MpamWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_hmat(&self, _table: &mut HmatWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }

    fn fill_srat(&self, _table: &mut SratWriter<'_>) -> Result<(), AvsError> {
        Ok(())
    }
}
