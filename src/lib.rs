//! SBSA compliance suite runtime
//!
//! Discovers the platform into info tables, sequences the test modules by
//! compliance level, fans test payloads out over the PEs and folds their
//! results into one verdict. Hardware is reached only through the traits in
//! [`arch`], so everything above them also runs on a host.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod info;
pub mod logger;
pub mod mm;
pub mod modules;
pub mod peripherals;
pub mod platform;
pub mod probe;
pub mod status;
pub mod suite;
pub mod sync;
pub mod sysreg;
pub mod test_case;
pub mod uart;

pub use arch::Hardware;
pub use config::SuiteConfig;
pub use dispatcher::{run_suite, SuiteReport};
pub use error::AvsError;
pub use status::{AvsStatus, StatusRegistry};
