//! RAS checks

use crate::coordinator::PeEnv;
use crate::status::AvsStatus;
use crate::sysreg::{extract_bits, PeFeature, RegId};
use crate::test_case::TestCase;

const BASE: u32 = 1400;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check RAS extension                 ", "RAS_01", extension).on_all_pes(),
    TestCase::new(BASE + 2, "Check PE RAS error node             ", "RAS_02", pe_node).on_all_pes(),
    TestCase::new(BASE + 3, "Check PE error records              ", "RAS_03", error_records).on_all_pes(),
];

fn extension(env: &PeEnv<'_>) {
    match env.feat_check(PeFeature::Ras) {
        AvsStatus::Pass => env.pass(1),
        _ => env.fail(1),
    }
}

fn pe_node(env: &PeEnv<'_>) {
    let Ok(mpidr) = env.tables().pe().mpidr(env.index) else {
        env.fail(crate::status::REASON_BAD_PE_INDEX);
        return;
    };
    if env.tables().ras().pe_node(mpidr).is_some() {
        env.pass(1);
    } else {
        log::error!("PE {}: no RAS node for MPIDR {:#x}", env.index, mpidr);
        env.fail(1);
    }
}

fn error_records(env: &PeEnv<'_>) {
    // ERRIDR_EL1.NUM
    if extract_bits(env.reg_read(RegId::ErridrEl1), 0, 15) == 0 {
        env.fail(1);
    } else {
        env.pass(1);
    }
}
