//! Test lifecycle
//!
//! ```text
//! INIT --excluded--> SKIPPED --+
//!   |                          +--> CHECK --> REPORTED
//!   +-----> RUNNING -----------+
//! ```
//!
//! INIT marks every participant PENDING and applies the skip directives.
//! RUNNING hands the payload to the coordinator. CHECK folds the per-PE
//! slots into one verdict; a slot still PENDING counts as FAIL. REPORTED
//! prints the verdict and bumps the counters.

use log::{error, info, warn};

use crate::coordinator::{self, Payload, PeSet};
use crate::status::{AvsStatus, TestResult};
use crate::suite::SuiteContext;

/// Compliance level condition of a module or test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelGate {
    Always,
    /// Runs when the target level is strictly above the value.
    Above(u32),
}

impl LevelGate {
    pub const fn admits(self, level: u32) -> bool {
        match self {
            Self::Always => true,
            Self::Above(min) => level > min,
        }
    }
}

/// PEs a test runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeScope {
    /// The calling PE only.
    Single,
    /// Every described PE.
    All,
}

pub struct TestCase {
    pub num: u32,
    pub desc: &'static str,
    pub rule: &'static str,
    pub payload: Payload,
    pub gate: LevelGate,
    pub scope: PeScope,
    /// A failure skips the rest of the module.
    pub gatekeeper: bool,
}

impl TestCase {
    pub const fn new(num: u32, desc: &'static str, rule: &'static str, payload: Payload) -> Self {
        Self {
            num,
            desc,
            rule,
            payload,
            gate: LevelGate::Always,
            scope: PeScope::Single,
            gatekeeper: false,
        }
    }

    pub const fn above(mut self, level: u32) -> Self {
        self.gate = LevelGate::Above(level);
        self
    }

    pub const fn on_all_pes(mut self) -> Self {
        self.scope = PeScope::All;
        self
    }

    pub const fn gatekeeper(mut self) -> Self {
        self.gatekeeper = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestPhase {
    Init,
    Skipped,
    Running,
    Check,
    Reported,
}

impl TestPhase {
    pub const fn can_enter(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Skipped)
                | (Self::Init, Self::Running)
                | (Self::Skipped, Self::Check)
                | (Self::Running, Self::Check)
                | (Self::Check, Self::Reported)
        )
    }
}

struct Lifecycle {
    num: u32,
    phase: TestPhase,
}

impl Lifecycle {
    fn enter(&mut self, next: TestPhase) {
        if !self.phase.can_enter(next) {
            error!("test {}: {:?} -> {:?} out of order", self.num, self.phase, next);
        }
        self.phase = next;
    }
}

/// Runs one test through its whole lifecycle and returns its verdict.
pub fn execute(ctx: &mut SuiteContext<'_>, case: &TestCase, num_pe: usize) -> AvsStatus {
    let rt = ctx.rt;
    let level = rt.level();
    let num_pe = match case.scope {
        PeScope::Single => 1,
        PeScope::All => num_pe,
    };
    let mut life = Lifecycle {
        num: case.num,
        phase: TestPhase::Init,
    };

    if case.desc.is_empty() || case.rule.is_empty() || case.num > 0xFFF {
        error!("test {}: malformed test description", case.num);
        ctx.counters.record(AvsStatus::Error);
        return AvsStatus::Error;
    }
    info!("{:5} : {}", case.num, case.desc);

    let participants: PeSet = coordinator::participants(&rt, num_pe);
    for pe in participants.iter() {
        rt.registry.set_status(pe, TestResult::pending(level, case.num));
    }

    let participants = match ctx.skip_reason(case.num) {
        Some(reason) => {
            life.enter(TestPhase::Skipped);
            info!("        test skipped: {}", reason);
            for pe in participants.iter() {
                rt.registry.set_status(pe, TestResult::skip(level, case.num, 0));
            }
            participants
        }
        None => {
            life.enter(TestPhase::Running);
            coordinator::run_test_payload(&ctx.rt, case.num, num_pe, case.payload, 0)
        }
    };

    life.enter(TestPhase::Check);
    let status = rt.registry.check_for_error(case.num, participants.iter(), case.rule);

    life.enter(TestPhase::Reported);
    ctx.counters.record(status);
    match status {
        AvsStatus::Pass | AvsStatus::Skip => info!("        {}: Result: {}", case.rule, status.label()),
        AvsStatus::Fail | AvsStatus::Error => warn!("        {}: Result: {}", case.rule, status.label()),
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order() {
        use TestPhase::*;
        assert!(Init.can_enter(Skipped));
        assert!(Init.can_enter(Running));
        assert!(Running.can_enter(Check));
        assert!(!Init.can_enter(Check));
        assert!(!Reported.can_enter(Init));
    }

    #[test]
    fn level_gate() {
        assert!(LevelGate::Always.admits(1));
        assert!(!LevelGate::Above(3).admits(3));
        assert!(LevelGate::Above(3).admits(4));
    }
}
