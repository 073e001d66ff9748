mod common;

use common::{config, Arena, FakeHw};
use sbsa_acs::arch::aarch64::sysreg::PhysReg;
use sbsa_acs::coordinator::PeEnv;
use sbsa_acs::error::AvsError;
use sbsa_acs::status::{AvsStatus, StatusRegistry, TestState, REASON_BAD_REGISTER};
use sbsa_acs::suite::Runtime;
use sbsa_acs::sysreg::{self, PeFeature, RegId};

#[test]
fn mair_follows_current_el() {
    let hw = FakeHw::new();
    hw.set_phys(PhysReg::MairEl1, 0x44);
    assert_eq!(sysreg::read(&hw, RegId::MairElx), Ok(0xFF));

    hw.set_el(1);
    assert_eq!(sysreg::read(&hw, RegId::MairElx), Ok(0x44));

    hw.set_el(3);
    assert_eq!(sysreg::read(&hw, RegId::MairElx), Err(AvsError::UnsupportedEl(3)));
    assert_eq!(sysreg::read(&hw, RegId::TcrElx), Err(AvsError::UnsupportedEl(3)));
}

#[test]
fn access_direction_is_enforced() {
    let hw = FakeHw::new();
    assert_eq!(
        sysreg::write(&hw, RegId::MidrEl1, 1),
        Err(AvsError::RegisterAccess(RegId::MidrEl1))
    );
    assert_eq!(
        sysreg::read(&hw, RegId::PmovsclrEl0),
        Err(AvsError::RegisterAccess(RegId::PmovsclrEl0))
    );
    assert_eq!(sysreg::write(&hw, RegId::PmcrEl0, 0x41), Ok(()));
    assert_eq!(sysreg::read(&hw, RegId::PmcrEl0), Ok(0x41));
}

#[test]
fn el_queries() {
    let hw = FakeHw::new();
    assert_eq!(sysreg::current_el(&hw), Ok(2));
    assert_eq!(sysreg::is_el2_enabled(&hw), Ok(true));
    assert_eq!(sysreg::is_el3_enabled(&hw), Ok(true));

    hw.set_reg(RegId::IdAa64pfr0El1, 0x0011);
    assert_eq!(sysreg::is_el2_enabled(&hw), Ok(false));
    assert_eq!(sysreg::is_el3_enabled(&hw), Ok(false));
}

#[test]
fn tcr_el1_layout_for_ttbr1() {
    let hw = FakeHw::new();
    hw.set_el(1);
    // TG1 = 2 (4KB), SH1 = 3, T1SZ = 16, IPS = 5
    let tcr = (2u64 << 30) | (3 << 28) | (16 << 16) | (5 << 32) | 25;
    hw.set_phys(PhysReg::TcrEl1, tcr);

    let fields = sysreg::read_tcr(&hw, true).unwrap();
    assert_eq!(fields.tg, 2);
    assert_eq!(fields.granule_shift, 12);
    assert_eq!(fields.sh, 3);
    assert_eq!(fields.tsz, 16);
    assert_eq!(fields.ps, 5);

    let ttbr0 = sysreg::read_tcr(&hw, false).unwrap();
    assert_eq!(ttbr0.tsz, 25);
    assert_eq!(ttbr0.granule_shift, 12);
}

#[test]
fn tcr_el2_without_e2h_has_no_ttbr1() {
    let hw = FakeHw::new();
    // TG0 = 1 (64KB), PS = 2
    hw.set_phys(PhysReg::TcrEl2, (1 << 14) | (2 << 16));
    assert_eq!(sysreg::read_tcr(&hw, true), Err(AvsError::Ttbr1Unsupported));

    let fields = sysreg::read_tcr(&hw, false).unwrap();
    assert_eq!(fields.granule_shift, 16);
    assert_eq!(fields.ps, 2);

    // With E2H, EL2 uses the EL1 layout and TTBR1 exists
    hw.set_phys(PhysReg::HcrEl2, 1 << 34);
    hw.set_phys(PhysReg::TcrEl2, (3u64 << 30) | (4 << 32));
    let fields = sysreg::read_tcr(&hw, true).unwrap();
    assert_eq!(fields.granule_shift, 16);
    assert_eq!(fields.ps, 4);
}

#[test]
fn reserved_granules_are_rejected() {
    let hw = FakeHw::new();
    hw.set_phys(PhysReg::TcrEl2, 3 << 14);
    assert_eq!(sysreg::read_tcr(&hw, false), Err(AvsError::ReservedGranule(3)));

    hw.set_el(1);
    hw.set_phys(PhysReg::TcrEl1, 0);
    assert_eq!(sysreg::read_tcr(&hw, true), Err(AvsError::ReservedGranule(0)));
}

#[test]
fn ttbr_by_el() {
    let hw = FakeHw::new();
    assert_eq!(sysreg::read_ttbr(&hw, false), Ok(0x8100_0000));
    assert_eq!(sysreg::read_ttbr(&hw, true), Err(AvsError::TtbrUnavailable { ttbr1: true }));

    hw.set_el(1);
    hw.set_phys(PhysReg::Ttbr1El1, 0x4000);
    assert_eq!(sysreg::read_ttbr(&hw, true), Ok(0x4000));
}

#[test]
fn feature_checks() {
    let hw = FakeHw::new();
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Pmu), AvsStatus::Pass);
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Ras), AvsStatus::Fail);
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Mpam), AvsStatus::Fail);

    hw.set_reg(RegId::IdAa64pfr0El1, 0x1000_1111);
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Ras), AvsStatus::Pass);

    // MPAM v0.1 is only visible in the fraction field
    hw.set_reg(RegId::IdAa64pfr1El1, 1 << 16);
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Mpam), AvsStatus::Pass);

    // IMPLEMENTATION DEFINED PMU does not count
    hw.set_reg(RegId::IdAa64dfr0El1, 0xF00);
    assert_eq!(sysreg::feat_check(&hw, PeFeature::Pmu), AvsStatus::Fail);
}

#[test]
fn failed_access_records_bad_register_and_reads_zero() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x1_0000);
    let tables = arena.tables();
    let registry = StatusRegistry::new();
    let config = config(4);
    let rt = Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    };

    assert_eq!(rt.reg_read(0, 12, RegId::ErridrEl1), 0);
    let slot = registry.get_status(0);
    assert_eq!(slot.state(), Some(TestState::Fail));
    assert_eq!((slot.level(), slot.test_num(), slot.reason()), (4, 12, REASON_BAD_REGISTER));

    rt.reg_write(1, 12, RegId::SctlrEl1, 0);
    assert_eq!(registry.get_status(1).reason(), REASON_BAD_REGISTER);

    assert_eq!(rt.feat_check(PeFeature::Pmu as u32), AvsStatus::Pass);
    assert_eq!(rt.feat_check(99), AvsStatus::Fail);
}

#[test]
fn a_register_failure_survives_a_later_pass() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x1_0000);
    let tables = arena.tables();
    let registry = StatusRegistry::new();
    let config = config(4);
    let rt = Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    };
    let env = PeEnv {
        index: 0,
        test_num: 3,
        arg: 0,
        rt: &rt,
    };

    env.reg_read(RegId::LoridEl1);
    env.pass(1);
    let slot = registry.get_status(0);
    assert_eq!(slot.state(), Some(TestState::Fail));
    assert_eq!(slot.reason(), REASON_BAD_REGISTER);

    // A new test starts from a clean verdict
    let next = PeEnv { test_num: 4, ..env };
    next.pass(1);
    assert_eq!(registry.get_status(0).state(), Some(TestState::Pass));
}

#[test]
fn unknown_register_id_reads_zero_and_fails() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x1_0000);
    let tables = arena.tables();
    let registry = StatusRegistry::new();
    let config = config(4);
    let rt = Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    };
    let env = PeEnv {
        index: 2,
        test_num: 7,
        arg: 0,
        rt: &rt,
    };

    assert_eq!(env.reg_read_raw(RegId::MpidrEl1 as u32), 0x8000_0000);
    assert_eq!(registry.get_status(2).state(), None);

    assert_eq!(env.reg_read_raw(0x999), 0);
    let slot = registry.get_status(2);
    assert_eq!(slot.state(), Some(TestState::Fail));
    assert_eq!((slot.test_num(), slot.reason()), (7, REASON_BAD_REGISTER));
}
