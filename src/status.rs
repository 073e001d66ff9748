//! Status Registry
//!
//! Each PE owns one result slot. A result is a packed `u32`:
//!
//! ```text
//!  31    28 27   24 23          12 11           0
//! +--------+-------+--------------+--------------+
//! | state  | level | test number  |  sub-reason  |
//! +--------+-------+--------------+--------------+
//! ```
//!
//! Slots are written by the PE that owns them (Release) and read by the
//! primary after the join (Acquire). `check_for_error` is the only place a
//! set of per-PE results becomes one verdict.

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use log::{error, warn};

use crate::platform::MAX_PE;

const STATE_SHIFT: u32 = 28;
const LEVEL_SHIFT: u32 = 24;
const TEST_SHIFT: u32 = 12;
const NIBBLE: u32 = 0xF;
const TEST_MASK: u32 = 0xFFF;
const REASON_MASK: u32 = 0xFFF;

/// Sub-reason for an unknown or direction-invalid register id.
pub const REASON_BAD_REGISTER: u32 = 0x78;
/// Sub-reason for a PE index outside the PE table.
pub const REASON_BAD_PE_INDEX: u32 = 0xFF;
/// Sub-reason for a PE that never reported before the wake-up timeout.
pub const REASON_PE_TIMEOUT: u32 = 0xFE;
/// Sub-reason for a PE that PSCI refused to power on.
pub const REASON_PE_LAUNCH: u32 = 0xFD;

/// Value returned by accessors that fail an index check.
pub const INVALID_INDEX_SENTINEL: u32 = 0xFF_FFFF;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestState {
    Start = 0x1,
    End = 0x2,
    Pending = 0x3,
    Pass = 0x4,
    Fail = 0x8,
    Skip = 0x9,
    Error = 0xA,
}

impl TestState {
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x1 => Some(Self::Start),
            0x2 => Some(Self::End),
            0x3 => Some(Self::Pending),
            0x4 => Some(Self::Pass),
            0x8 => Some(Self::Fail),
            0x9 => Some(Self::Skip),
            0xA => Some(Self::Error),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Pass | Self::Fail | Self::Skip | Self::Error)
    }
}

/// One packed per-PE result record.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TestResult(u32);

impl TestResult {
    /// Slot that was never written.
    pub const UNSET: Self = Self(0);

    pub const fn new(state: TestState, level: u32, test: u32, reason: u32) -> Self {
        Self(
            ((state as u32) << STATE_SHIFT)
                | ((level & NIBBLE) << LEVEL_SHIFT)
                | ((test & TEST_MASK) << TEST_SHIFT)
                | (reason & REASON_MASK),
        )
    }

    pub const fn pass(level: u32, test: u32, reason: u32) -> Self {
        Self::new(TestState::Pass, level, test, reason)
    }

    pub const fn fail(level: u32, test: u32, reason: u32) -> Self {
        Self::new(TestState::Fail, level, test, reason)
    }

    pub const fn skip(level: u32, test: u32, reason: u32) -> Self {
        Self::new(TestState::Skip, level, test, reason)
    }

    pub const fn pending(level: u32, test: u32) -> Self {
        Self::new(TestState::Pending, level, test, 0)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn state(self) -> Option<TestState> {
        TestState::from_raw(self.0 >> STATE_SHIFT)
    }

    pub const fn level(self) -> u32 {
        (self.0 >> LEVEL_SHIFT) & NIBBLE
    }

    pub const fn test_num(self) -> u32 {
        (self.0 >> TEST_SHIFT) & TEST_MASK
    }

    pub const fn reason(self) -> u32 {
        self.0 & REASON_MASK
    }

    pub fn is_pending(self) -> bool {
        self.state() == Some(TestState::Pending)
    }
}

impl fmt::Debug for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResult")
            .field("state", &self.state())
            .field("level", &self.level())
            .field("test", &self.test_num())
            .field("reason", &format_args!("{:#x}", self.reason()))
            .finish()
    }
}

/// Verdict of a test, a module or the whole suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvsStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl AvsStatus {
    /// Rolls two verdicts into one. FAIL wins, then ERROR, then PASS;
    /// SKIP only survives against another SKIP.
    pub fn combine(self, other: Self) -> Self {
        use AvsStatus::*;
        match (self, other) {
            (Fail, _) | (_, Fail) => Fail,
            (Error, _) | (_, Error) => Error,
            (Pass, _) | (_, Pass) => Pass,
            (Skip, Skip) => Skip,
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Error => "ERROR",
        }
    }
}

struct PeSlot {
    status: AtomicU32,
    data_addr: AtomicU64,
    data: AtomicU64,
}

impl PeSlot {
    const fn new() -> Self {
        Self {
            status: AtomicU32::new(0),
            data_addr: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }
}

pub struct StatusRegistry {
    slots: [PeSlot; MAX_PE],
}

impl StatusRegistry {
    pub const fn new() -> Self {
        const EMPTY: PeSlot = PeSlot::new();
        Self { slots: [EMPTY; MAX_PE] }
    }

    pub const fn capacity(&self) -> usize {
        MAX_PE
    }

    pub fn set_status(&self, pe: usize, result: TestResult) {
        match self.slots.get(pe) {
            Some(slot) => slot.status.store(result.raw(), Ordering::Release),
            None => error!("status for PE index {} dropped: only {} slots", pe, MAX_PE),
        }
    }

    /// Result posted by `pe`; `UNSET` for a slot that does not exist.
    pub fn get_status(&self, pe: usize) -> TestResult {
        self.slots
            .get(pe)
            .map_or(TestResult::UNSET, |slot| TestResult::from_raw(slot.status.load(Ordering::Acquire)))
    }

    /// Publishes a value for other PEs. The data is stored before the
    /// address so a reader that sees the address sees the data.
    pub fn set_test_data(&self, pe: usize, addr: u64, data: u64) {
        if let Some(slot) = self.slots.get(pe) {
            slot.data.store(data, Ordering::Relaxed);
            slot.data_addr.store(addr, Ordering::Release);
        }
    }

    pub fn get_test_data(&self, pe: usize) -> Option<(u64, u64)> {
        self.slots.get(pe).map(|slot| {
            let addr = slot.data_addr.load(Ordering::Acquire);
            (addr, slot.data.load(Ordering::Relaxed))
        })
    }

    /// Clears every slot before a suite run.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.status.store(0, Ordering::Relaxed);
            slot.data_addr.store(0, Ordering::Relaxed);
            slot.data.store(0, Ordering::Relaxed);
        }
    }

    /// Folds the results of `participants` for `test` into one verdict.
    ///
    /// A participant whose slot is not a terminal result for this very
    /// test (unset, still pending, or left over from another test) counts
    /// as a failure, and so does an empty participant set.
    pub fn check_for_error(
        &self,
        test: u32,
        participants: impl IntoIterator<Item = usize>,
        rule: &str,
    ) -> AvsStatus {
        let mut reported = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;

        for pe in participants {
            reported += 1;
            let result = self.get_status(pe);
            let stale = result.test_num() != (test & TEST_MASK);
            match result.state() {
                Some(TestState::Pass) if !stale => {}
                Some(TestState::Skip) if !stale => skipped += 1,
                Some(TestState::Fail | TestState::Error) if !stale => {
                    failed += 1;
                    error!(
                        "{}: failed on PE {} at level {} (reason {:#x})",
                        rule,
                        pe,
                        result.level(),
                        result.reason()
                    );
                }
                _ => {
                    failed += 1;
                    warn!("{}: PE {} left no result ({:?})", rule, pe, result);
                }
            }
        }

        if reported == 0 {
            error!("{}: no PE reported a result", rule);
            AvsStatus::Fail
        } else if failed > 0 {
            AvsStatus::Fail
        } else if skipped == reported {
            AvsStatus::Skip
        } else {
            AvsStatus::Pass
        }
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
