//! Architecture-specific code
//!
//! `traits` is the seam the rest of the crate programs against. The
//! register definitions in `aarch64` build everywhere; the parts that emit
//! instructions only build for the bare-metal target.

pub mod aarch64;
pub mod traits;

pub use traits::{Clock, Fault, FaultBoundary, Hardware, Mmio, PeLauncher, SysRegAccess};
