//! MPAM checks

use crate::coordinator::PeEnv;
use crate::status::AvsStatus;
use crate::sysreg::PeFeature;
use crate::test_case::TestCase;

const BASE: u32 = 1200;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check for MPAM extension            ", "S_L7MP_01", extension).on_all_pes(),
    TestCase::new(BASE + 2, "Check for MPAM MSC on memory        ", "S_L7MP_03", memory_msc),
];

fn extension(env: &PeEnv<'_>) {
    match env.feat_check(PeFeature::Mpam) {
        AvsStatus::Pass => env.pass(1),
        _ => env.fail(1),
    }
}

fn memory_msc(env: &PeEnv<'_>) {
    let mpam = env.tables().mpam();
    if mpam.msc_count() == 0 {
        log::error!("no MPAM MSC described");
        env.fail(1);
    } else if mpam.memory_mscs().next().is_none() {
        log::error!("no MPAM MSC controls memory bandwidth");
        env.fail(2);
    } else {
        env.pass(1);
    }
}
