//! ARM64/AArch64 architecture support
//!
//! - `defs`: register field constants
//! - `sysreg`: physical register names and their accessors
//! - `exception`, `psci`, `timer`, `machine`: bare-metal only

pub mod defs;
pub mod sysreg;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod exception;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod machine;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod psci;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod timer;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use machine::BareMetal;
