mod common;

use common::{config, Arena, FakeHw, LaunchMode, TestProbe};
use sbsa_acs::arch::aarch64::sysreg::PhysReg;
use sbsa_acs::config::SkipList;
use sbsa_acs::error::AvsError;
use sbsa_acs::info::iovirt::IovirtNode;
use sbsa_acs::info::TableKind;
use sbsa_acs::modules::ModuleMask;
use sbsa_acs::status::{AvsStatus, StatusRegistry};
use sbsa_acs::suite::SuiteCounters;
use sbsa_acs::sysreg::RegId;
use sbsa_acs::run_suite;

const ALWAYS: ModuleMask = ModuleMask::PE
    .union(ModuleMask::MEMORY)
    .union(ModuleMask::GIC)
    .union(ModuleMask::EXERCISER);

#[test]
fn compliant_platform_at_level_two() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(2), &hw, &TestProbe::sbsa(4), &mut tables, &registry);

    assert_eq!(report.modules_run, ALWAYS);
    // PE 1-5, memory 1101-1102, GIC 101 pass; no exerciser to find
    assert_eq!(
        report.counters,
        SuiteCounters {
            total: 9,
            passed: 8,
            failed: 0
        }
    );
    assert_eq!(report.status, AvsStatus::Pass);
    assert_eq!(report.exit_code(), 0);
    assert!(!tables.is_live());
    assert_eq!(hw.launched.lock().unwrap().len(), 3 * 4);
}

#[test]
fn smmu_module_waits_for_level_four() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let probe = TestProbe {
        smmu_versions: vec![IovirtNode::SmmuV3],
        ..TestProbe::sbsa(1)
    };

    let report = run_suite(&config(3), &hw, &probe, &mut tables, &registry);
    assert!(!report.modules_run.contains(ModuleMask::SMMU));

    let report = run_suite(&config(4), &hw, &probe, &mut tables, &registry);
    assert!(report.modules_run.contains(ModuleMask::SMMU));
    assert_eq!(report.counters.total, 10);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn no_smmu_skips_the_module() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(4), &hw, &TestProbe::sbsa(1), &mut tables, &registry);
    assert!(!report.modules_run.contains(ModuleMask::SMMU));
    assert_eq!(report.counters.total, 9);
}

#[test]
fn smmu_gatekeeper_failure_is_counted() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let probe = TestProbe {
        smmu_versions: vec![IovirtNode::SmmuV3, IovirtNode::SmmuV2],
        ..TestProbe::sbsa(1)
    };

    let report = run_suite(&config(4), &hw, &probe, &mut tables, &registry);
    assert_eq!(
        report.counters,
        SuiteCounters {
            total: 10,
            passed: 8,
            failed: 1
        }
    );
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn missing_pes_stop_the_run_before_any_test() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(4), &hw, &TestProbe::sbsa(0), &mut tables, &registry);
    assert!(matches!(
        report.setup_error,
        Some(AvsError::Probe {
            table: TableKind::Pe,
            ..
        })
    ));
    assert_eq!(report.counters, SuiteCounters::default());
    assert_eq!(report.modules_run, ModuleMask::empty());
    assert_eq!(report.exit_code(), 2);
    assert!(!tables.is_live());
}

#[test]
fn a_fault_aborts_the_remaining_tests_but_still_reports() {
    let hw = FakeHw::new();
    hw.trap(PhysReg::Direct(RegId::IdAa64mmfr0El1));
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(4), &hw, &TestProbe::sbsa(2), &mut tables, &registry);
    // Tests 1 and 2 ran; test 3 reads ID_AA64MMFR0_EL1
    assert_eq!(
        report.counters,
        SuiteCounters {
            total: 2,
            passed: 2,
            failed: 0
        }
    );
    assert!(report.fault.is_some());
    assert_eq!(report.status, AvsStatus::Error);
    assert_eq!(report.exit_code(), 3);
    assert_eq!(report.modules_run, ModuleMask::PE);
    assert!(!tables.is_live());
}

#[test]
fn unresponsive_secondaries_fail_all_pe_tests() {
    let hw = FakeHw::new().with_launch_mode(LaunchMode::Dead);
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(2), &hw, &TestProbe::sbsa(2), &mut tables, &registry);
    // 1, 2, 3 and 5 run on every PE
    assert_eq!(report.counters.failed, 4);
    assert_eq!(report.counters.total, 9);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn secondaries_still_powering_down_do_not_fail() {
    let hw = FakeHw::new().with_launch_mode(LaunchMode::BusyOnce);
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(2), &hw, &TestProbe::sbsa(4), &mut tables, &registry);
    assert_eq!((report.counters.passed, report.counters.failed), (8, 0));
    assert_eq!(report.exit_code(), 0);
    // One extra CPU_ON per secondary for the ALREADY_ON answer
    assert_eq!(hw.launched.lock().unwrap().len(), 3 * 4 + 3);
}

#[test]
fn out_of_range_levels_are_clamped() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(0), &hw, &TestProbe::sbsa(1), &mut tables, &registry);
    assert_eq!(report.modules_run, ALWAYS);

    let report = run_suite(&config(12), &hw, &TestProbe::sbsa(1), &mut tables, &registry);
    assert!(report
        .modules_run
        .contains(ModuleMask::MPAM | ModuleMask::PMU | ModuleMask::RAS | ModuleMask::PCIE));
}

#[test]
fn single_module_runs_alone() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let mut config = config(2);
    config.single_module = Some(100);

    let report = run_suite(&config, &hw, &TestProbe::sbsa(1), &mut tables, &registry);
    assert_eq!(report.modules_run, ModuleMask::GIC);
    assert_eq!(report.counters.total, 1);
    assert_eq!(report.counters.passed, 1);
}

#[test]
fn module_skip_and_pcie_switch() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let mut config = config(6);
    config.skip = SkipList::from_ids(&[1100]);
    config.enable_pcie_tests = false;

    let report = run_suite(&config, &hw, &TestProbe::sbsa(1), &mut tables, &registry);
    assert!(!report.modules_run.contains(ModuleMask::MEMORY));
    assert!(!report.modules_run.contains(ModuleMask::PCIE));
    assert!(report.modules_run.contains(ModuleMask::WATCHDOG));
}
