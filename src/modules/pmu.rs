//! PMU checks

use crate::arch::aarch64::defs::PMCR_N;
use crate::coordinator::PeEnv;
use crate::info::pmu::PmuNode;
use crate::status::AvsStatus;
use crate::sysreg::{field, PeFeature, RegId};
use crate::test_case::TestCase;

const BASE: u32 = 1300;

const MIN_PE_COUNTERS: u64 = 4;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check PMU version                   ", "PMU_PE_01", version).on_all_pes(),
    TestCase::new(BASE + 2, "Check number of PMU counters        ", "PMU_PE_02", counters).on_all_pes(),
    TestCase::new(BASE + 3, "Check memory controller PMU         ", "PMU_MEM_1", memory_pmu),
];

fn version(env: &PeEnv<'_>) {
    match env.feat_check(PeFeature::Pmu) {
        AvsStatus::Pass => env.pass(1),
        _ => env.fail(1),
    }
}

fn counters(env: &PeEnv<'_>) {
    let n = field(env.reg_read(RegId::PmcrEl0), PMCR_N);
    if n >= MIN_PE_COUNTERS {
        env.pass(1);
    } else {
        log::error!("PE {}: {} PMU counters, {} required", env.index, n, MIN_PE_COUNTERS);
        env.fail(1);
    }
}

fn memory_pmu(env: &PeEnv<'_>) {
    if env.tables().pmu().of_node(PmuNode::MemoryController).next().is_some() {
        env.pass(1);
    } else {
        log::error!("no system PMU for a memory controller");
        env.fail(1);
    }
}
