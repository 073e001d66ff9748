//! Error type shared by table creation, probing and the register decoders.

use core::fmt;

use crate::info::TableKind;
use crate::sysreg::RegId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvsError {
    /// The table arena has no room left for a table block.
    OutOfMemory { table: TableKind, bytes: u64 },
    /// A probe tried to add more entries than the platform limit.
    TableFull { table: TableKind, capacity: usize },
    /// A probe gave up, or produced content the suite cannot run with.
    Probe { table: TableKind, reason: &'static str },
    /// Current exception level is neither EL1 nor EL2.
    UnsupportedEl(u8),
    /// Translation granule field holds a reserved encoding.
    ReservedGranule(u8),
    /// TTBR1 fields requested at EL2 without HCR_EL2.E2H.
    Ttbr1Unsupported,
    TtbrUnavailable { ttbr1: bool },
    /// Register id is unknown or not accessible in that direction.
    RegisterAccess(RegId),
    /// Raw register id does not name any register.
    UnknownRegister(u32),
    InvalidPeIndex(usize),
    /// PSCI refused to power on a PE.
    LaunchFailed { index: usize, code: i32 },
    /// The PE is still on, or already powering on, from an earlier job.
    PeBusy { index: usize, code: i32 },
    /// No ECAM window covers the segment/bus of a BDF.
    NoEcam(u32),
    NoGicDistributor,
    /// Extended SPI range is not supported by the interrupt helpers.
    UnsupportedIntId(u32),
}

impl fmt::Display for AvsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { table, bytes } => {
                write!(f, "{table:?} table: arena exhausted ({bytes:#x} bytes)")
            }
            Self::TableFull { table, capacity } => {
                write!(f, "{table:?} table: more than {capacity} entries")
            }
            Self::Probe { table, reason } => write!(f, "{table:?} table: {reason}"),
            Self::UnsupportedEl(el) => write!(f, "unsupported exception level EL{el}"),
            Self::ReservedGranule(tg) => write!(f, "reserved translation granule {tg:#x}"),
            Self::Ttbr1Unsupported => f.write_str("TTBR1 not available at EL2 without E2H"),
            Self::TtbrUnavailable { ttbr1 } => write!(f, "TTBR{} not readable", u8::from(*ttbr1)),
            Self::RegisterAccess(id) => write!(f, "register {id:?} not accessible"),
            Self::UnknownRegister(raw) => write!(f, "unknown register id {raw:#x}"),
            Self::InvalidPeIndex(index) => write!(f, "invalid PE index {index}"),
            Self::LaunchFailed { index, code } => {
                write!(f, "PE {index} failed to power on (PSCI {code})")
            }
            Self::PeBusy { index, code } => write!(f, "PE {index} still on (PSCI {code})"),
            Self::NoEcam(bdf) => write!(f, "no ECAM region for BDF {bdf:#x}"),
            Self::NoGicDistributor => f.write_str("no GIC distributor described"),
            Self::UnsupportedIntId(id) => write!(f, "interrupt id {id} not supported"),
        }
    }
}
