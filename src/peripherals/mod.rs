//! Peripheral register helpers used by the tests
//!
//! All register traffic goes through [`crate::arch::Mmio`], so the helpers
//! run unchanged against the real frames or a host fake.

pub mod gic;
pub mod pcie;
pub mod watchdog;
