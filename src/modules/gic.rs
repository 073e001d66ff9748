//! GIC checks

use crate::coordinator::PeEnv;
use crate::peripherals::gic::GicDistributor;
use crate::test_case::TestCase;

const BASE: u32 = 100;

/// GIC maintenance interrupt, PPI 9.
const GIC_MAINTENANCE_INTID: u32 = 25;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check GIC version                   ", "B_GIC_01", version),
    TestCase::new(BASE + 2, "Check GIC Maintenance Interrupt     ", "B_PPI_01", maintenance_ppi)
        .on_all_pes()
        .above(4),
];

fn version(env: &PeEnv<'_>) {
    let gicd = match GicDistributor::from_table(env.hw(), env.tables().gic()) {
        Ok(gicd) => gicd,
        Err(err) => {
            log::error!("{}", err);
            env.fail(1);
            return;
        }
    };
    let summary = gicd.summary(env.tables().gic());
    log::debug!("GIC: {:?}", summary);
    if summary.version >= 3 {
        env.pass(1);
    } else {
        log::error!("GIC v{} found, v3 or later required", summary.version);
        env.fail(2);
    }
}

fn maintenance_ppi(env: &PeEnv<'_>) {
    let gsiv = env.gmain_gsiv(env.index);
    if gsiv == GIC_MAINTENANCE_INTID {
        env.pass(1);
    } else {
        log::error!("PE {}: maintenance interrupt {} is not PPI 9", env.index, gsiv);
        env.fail(1);
    }
}
