//! Multi-PE execution
//!
//! A test payload runs on one PE or on every PE of the platform. The
//! primary launches the secondaries through the [`PeLauncher`] seam, runs
//! its own share, then joins: it polls the status registry until every
//! launched PE posted a result for this test or the wake-up timeout
//! expired.
//!
//! [`PeLauncher`]: crate::arch::PeLauncher

use log::{debug, error, warn};

use crate::arch::Hardware;
use crate::error::AvsError;
use crate::info::InfoTables;
use crate::platform::MAX_PE;
use crate::status::{AvsStatus, TestResult, TestState, REASON_PE_LAUNCH, REASON_PE_TIMEOUT};
use crate::suite::Runtime;
use crate::sysreg::{self, PeFeature, RegId, TcrFields};

/// Test body. Runs once per participating PE and reports through its
/// [`PeEnv`].
pub type Payload = fn(&PeEnv<'_>);

/// One payload invocation, handed to a PE.
#[derive(Clone, Copy)]
pub struct Job<'a> {
    pub payload: Payload,
    pub arg: u64,
    pub test_num: u32,
    /// PE index the job runs as.
    pub index: usize,
    pub runtime: &'a Runtime<'a>,
}

impl Job<'_> {
    pub fn run(&self) {
        let env = PeEnv {
            index: self.index,
            test_num: self.test_num,
            arg: self.arg,
            rt: self.runtime,
        };
        (self.payload)(&env);
    }
}

/// What a payload sees of the suite while it runs on one PE.
pub struct PeEnv<'a> {
    pub index: usize,
    pub test_num: u32,
    pub arg: u64,
    pub rt: &'a Runtime<'a>,
}

impl PeEnv<'_> {
    pub fn level(&self) -> u32 {
        self.rt.level()
    }

    pub fn tables(&self) -> &InfoTables {
        self.rt.tables
    }

    pub fn hw(&self) -> &dyn Hardware {
        self.rt.hw
    }

    pub fn num_pe(&self) -> usize {
        self.rt.tables.pe().num_pe()
    }

    /// Whether this share of the test runs on the PE that drives the suite.
    pub fn is_primary(&self) -> bool {
        self.index == self.rt.tables.pe().primary_index().unwrap_or(0)
    }

    /// Polls `ready` until it holds or the wake-up timeout passes.
    pub fn wait_for(&self, mut ready: impl FnMut() -> bool) -> bool {
        let clock = self.rt.hw;
        let timeout = clock.ticks_for_ms(u64::from(self.rt.config.wakeup_timeout_ms));
        let start = clock.counter();
        loop {
            if ready() {
                return true;
            }
            if clock.counter().wrapping_sub(start) >= timeout {
                return false;
            }
            core::hint::spin_loop();
        }
    }

    pub fn pass(&self, reason: u32) {
        self.post(TestResult::pass(self.level(), self.test_num, reason));
    }

    pub fn fail(&self, reason: u32) {
        self.post(TestResult::fail(self.level(), self.test_num, reason));
    }

    pub fn skip(&self, reason: u32) {
        self.post(TestResult::skip(self.level(), self.test_num, reason));
    }

    /// Records `result` for this PE. A FAIL or ERROR already posted for the
    /// same test stays; later verdicts cannot clear it.
    pub fn post(&self, result: TestResult) {
        let current = self.rt.registry.get_status(self.index);
        let sticky = current.test_num() == result.test_num()
            && matches!(current.state(), Some(TestState::Fail | TestState::Error));
        if sticky && !matches!(result.state(), Some(TestState::Fail | TestState::Error)) {
            return;
        }
        self.rt.registry.set_status(self.index, result);
    }

    pub fn reg_read(&self, id: RegId) -> u64 {
        self.rt.reg_read(self.index, self.test_num, id)
    }

    pub fn reg_read_raw(&self, raw: u32) -> u64 {
        self.rt.reg_read_raw(self.index, self.test_num, raw)
    }

    pub fn reg_write(&self, id: RegId, value: u64) {
        self.rt.reg_write(self.index, self.test_num, id, value)
    }

    pub fn feat_check(&self, feature: PeFeature) -> AvsStatus {
        self.rt.feat_check(feature as u32)
    }

    pub fn read_tcr(&self, ttbr1: bool) -> Result<TcrFields, AvsError> {
        sysreg::read_tcr(self.rt.hw, ttbr1)
    }

    pub fn read_ttbr(&self, ttbr1: bool) -> Result<u64, AvsError> {
        sysreg::read_ttbr(self.rt.hw, ttbr1)
    }

    pub fn pmu_gsiv(&self, index: usize) -> u32 {
        self.rt.pmu_gsiv(self.index, self.test_num, index)
    }

    pub fn gmain_gsiv(&self, index: usize) -> u32 {
        self.rt.gmain_gsiv(self.index, self.test_num, index)
    }

    /// Posts a value for the primary to pick up after the join.
    pub fn set_test_data(&self, addr: u64, data: u64) {
        self.rt.registry.set_test_data(self.index, addr, data);
    }

    pub fn test_data(&self, pe: usize) -> Option<(u64, u64)> {
        self.rt.registry.get_test_data(pe)
    }
}

/// Set of PE indices.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PeSet {
    bits: [u64; MAX_PE / 64],
}

impl PeSet {
    pub const fn new() -> Self {
        Self {
            bits: [0; MAX_PE / 64],
        }
    }

    pub fn single(index: usize) -> Self {
        let mut set = Self::new();
        set.insert(index);
        set
    }

    pub fn insert(&mut self, index: usize) {
        if index < MAX_PE {
            self.bits[index / 64] |= 1 << (index % 64);
        }
    }

    pub fn remove(&mut self, index: usize) {
        if index < MAX_PE {
            self.bits[index / 64] &= !(1 << (index % 64));
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_PE && self.bits[index / 64] & (1 << (index % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_PE).filter(move |&index| self.contains(index))
    }
}

impl Default for PeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PeSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// PEs taking part in a test on `num_pe` PEs: the caller alone for one PE,
/// otherwise the first `num_pe` described PEs plus the caller.
pub fn participants(rt: &Runtime<'_>, num_pe: usize) -> PeSet {
    let me = rt.current_pe_index();
    if num_pe <= 1 {
        return PeSet::single(me);
    }
    let mut set = PeSet::new();
    for index in 0..num_pe.min(rt.tables.pe().num_pe()) {
        set.insert(index);
    }
    set.insert(me);
    set
}

fn finished(rt: &Runtime<'_>, pe: usize, test: u32) -> bool {
    let result = rt.registry.get_status(pe);
    result.test_num() == test & 0xFFF
        && result.state().map_or(false, |state| state.is_terminal())
}

/// Runs `payload` for test `test` on `num_pe` PEs and returns the set of
/// PEs whose slots hold the outcome.
///
/// A PE that cannot be powered on, or does not report before the wake-up
/// timeout, gets a FAIL in its own slot. Neither stops the suite. A job no
/// PE took before the timeout is withdrawn, so it cannot start late.
///
/// Secondaries borrow `rt` past the join when they overrun; callers pass
/// the runtime of the suite context, never a copy local to one test.
pub fn run_test_payload(
    rt: &Runtime<'_>,
    test: u32,
    num_pe: usize,
    payload: Payload,
    arg: u64,
) -> PeSet {
    let me = rt.current_pe_index();
    let set = participants(rt, num_pe);
    let job = Job {
        payload,
        arg,
        test_num: test,
        index: me,
        runtime: rt,
    };
    if num_pe <= 1 {
        job.run();
        return set;
    }

    let mut launched = PeSet::new();
    for index in set.iter().filter(|&index| index != me) {
        let mpidr = match rt.tables.pe().mpidr(index) {
            Ok(mpidr) => mpidr,
            Err(err) => {
                error!("{}", err);
                continue;
            }
        };
        match launch(rt, mpidr, Job { index, ..job }) {
            Ok(()) => launched.insert(index),
            Err(err) => {
                error!("test {}: {}", test, err);
                rt.registry
                    .set_status(index, TestResult::fail(rt.level(), test, REASON_PE_LAUNCH));
            }
        }
    }
    debug!("test {}: launched {:?}", test, launched);

    job.run();
    join(rt, test, launched);
    set
}

fn timeout_ticks(rt: &Runtime<'_>) -> u64 {
    rt.hw.ticks_for_ms(u64::from(rt.config.wakeup_timeout_ms))
}

/// Powers on one secondary. A PE still on from the previous test is
/// retried until the wake-up timeout.
fn launch(rt: &Runtime<'_>, mpidr: u64, job: Job<'_>) -> Result<(), AvsError> {
    let clock = rt.hw;
    let timeout = timeout_ticks(rt);
    let start = clock.counter();
    let mut retries = 0u32;
    loop {
        match rt.hw.launch(mpidr, job) {
            Err(AvsError::PeBusy { .. }) if clock.counter().wrapping_sub(start) < timeout => {
                retries += 1;
                core::hint::spin_loop();
            }
            result => {
                if retries > 0 {
                    debug!("PE {} ({:#x}) launched after {} retries", job.index, mpidr, retries);
                }
                return result;
            }
        }
    }
}

/// Waits until no secondary is inside a job, at most one wake-up timeout.
/// Returns the number of PEs still busy.
pub fn drain(rt: &Runtime<'_>) -> usize {
    let clock = rt.hw;
    let timeout = timeout_ticks(rt);
    let start = clock.counter();
    loop {
        let busy = rt.hw.busy();
        if busy == 0 || clock.counter().wrapping_sub(start) >= timeout {
            return busy;
        }
        core::hint::spin_loop();
    }
}

/// Waits for every PE in `launched` to post a terminal result for `test`.
fn join(rt: &Runtime<'_>, test: u32, mut launched: PeSet) {
    let clock = rt.hw;
    let timeout = timeout_ticks(rt);
    let start = clock.counter();

    loop {
        for index in 0..MAX_PE {
            if launched.contains(index) && finished(rt, index, test) {
                launched.remove(index);
            }
        }
        if launched.is_empty() {
            return;
        }
        if clock.counter().wrapping_sub(start) >= timeout {
            break;
        }
        core::hint::spin_loop();
    }

    for index in launched.iter() {
        if rt.hw.revoke(index) {
            warn!("test {}: PE {} never took its job", test, index);
        } else {
            warn!("test {}: PE {} did not report in time", test, index);
        }
        rt.registry
            .set_status(index, TestResult::fail(rt.level(), test, REASON_PE_TIMEOUT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pe_set_ops() {
        let mut set = PeSet::new();
        set.insert(0);
        set.insert(65);
        set.insert(MAX_PE);
        assert_eq!(set.len(), 2);
        assert!(set.contains(65));
        set.remove(0);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![65]);
    }
}
