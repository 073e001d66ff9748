//! PE architecture checks

use crate::arch::aarch64::defs::{
    DFR0_PMSVER, MMFR0_TGRAN4, MMFR1_TWED, PFR0_SVE,
};
use crate::coordinator::PeEnv;
use crate::sysreg::{self, field, RegId};
use crate::test_case::TestCase;

const BASE: u32 = 0;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check Arch symmetry across PE       ", "B_PE_01", symmetry).on_all_pes(),
    TestCase::new(BASE + 2, "Check for EL2 implementation        ", "B_PE_03", el2_implemented).on_all_pes(),
    TestCase::new(BASE + 3, "Check for 4KB granule support       ", "B_PE_08", granule_4k).on_all_pes(),
    TestCase::new(BASE + 4, "Check PMU Overflow signal           ", "B_PE_12", pmu_overflow_ppi),
    TestCase::new(BASE + 5, "Check translation granule in use    ", "B_PE_09", granule_in_use).on_all_pes(),
    TestCase::new(BASE + 17, "Check SPE if implemented           ", "B_PE_17", spe).on_all_pes().above(5),
    TestCase::new(BASE + 36, "Check WFE Fine tune delay feature  ", "S_L7PE_09", wfe_fine_tune).on_all_pes().above(6),
];

/// Top bit marks a posted ID register, the low bits carry the test number.
const POSTED: u64 = 1 << 63;

/// Every PE posts ID_AA64PFR0_EL1; the primary compares the others
/// against its own value.
fn symmetry(env: &PeEnv<'_>) {
    let pfr0 = env.reg_read(RegId::IdAa64pfr0El1);
    let marker = POSTED | u64::from(env.test_num);
    env.set_test_data(marker, pfr0);
    if !env.is_primary() {
        env.pass(1);
        return;
    }

    let mut mismatches = 0;
    for pe in (0..env.num_pe()).filter(|&pe| pe != env.index) {
        let posted = env.wait_for(|| matches!(env.test_data(pe), Some((addr, _)) if addr == marker));
        // A silent PE gets its own timeout verdict from the join.
        if !posted {
            continue;
        }
        if let Some((_, value)) = env.test_data(pe) {
            if value != pfr0 {
                log::error!("PE {}: ID_AA64PFR0_EL1 {:#x} differs from {:#x}", pe, value, pfr0);
                mismatches += 1;
            }
        }
    }
    if mismatches == 0 {
        env.pass(1);
    } else {
        env.fail(mismatches);
    }
}

fn el2_implemented(env: &PeEnv<'_>) {
    match sysreg::is_el2_enabled(env.hw()) {
        Ok(true) => env.pass(1),
        Ok(false) => env.fail(1),
        Err(err) => {
            log::error!("{}", err);
            env.fail(2);
        }
    }
}

fn granule_4k(env: &PeEnv<'_>) {
    // TGran4 == 0xF: 4KB granule not supported
    if field(env.reg_read(RegId::IdAa64mmfr0El1), MMFR0_TGRAN4) == 0xF {
        env.fail(1);
    } else {
        env.pass(1);
    }
}

/// PMU overflow interrupt of every PE must be a PPI.
fn pmu_overflow_ppi(env: &PeEnv<'_>) {
    for index in 0..env.num_pe() {
        let gsiv = env.pmu_gsiv(index);
        if !(16..32).contains(&gsiv) {
            log::error!("PE {}: PMU overflow GSIV {} is not a PPI", index, gsiv);
            env.fail(index as u32 & 0xFFF);
            return;
        }
    }
    env.pass(1);
}

fn granule_in_use(env: &PeEnv<'_>) {
    match env.read_tcr(false) {
        Ok(tcr) if matches!(tcr.granule_shift, 12 | 14 | 16) => env.pass(1),
        Ok(tcr) => {
            log::error!("unexpected granule shift {}", tcr.granule_shift);
            env.fail(1);
        }
        Err(err) => {
            log::error!("TCR decode failed: {}", err);
            env.fail(2);
        }
    }
}

fn spe(env: &PeEnv<'_>) {
    if env.level() < 6 {
        env.skip(1);
        return;
    }
    if field(env.reg_read(RegId::IdAa64pfr0El1), PFR0_SVE) == 0 {
        env.skip(2);
        return;
    }
    // PMSVer == 0b0010: v8.3 SPE
    if field(env.reg_read(RegId::IdAa64dfr0El1), DFR0_PMSVER) == 2 {
        env.pass(1);
    } else {
        env.fail(1);
    }
}

fn wfe_fine_tune(env: &PeEnv<'_>) {
    if env.level() < 7 {
        env.skip(1);
        return;
    }
    if field(env.reg_read(RegId::IdAa64mmfr1El1), MMFR1_TWED) == 1 {
        env.pass(1);
    } else {
        env.fail(1);
    }
}
