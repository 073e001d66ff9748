mod common;

use common::{config, Arena, FakeHw, TestProbe};
use sbsa_acs::config::SkipList;
use sbsa_acs::coordinator::PeEnv;
use sbsa_acs::info::InfoTables;
use sbsa_acs::status::{AvsStatus, StatusRegistry, TestState, REASON_BAD_REGISTER};
use sbsa_acs::suite::{Runtime, SuiteContext, SuiteCounters};
use sbsa_acs::sysreg::RegId;
use sbsa_acs::test_case::{self, TestCase};

const RAN: u64 = 0x5A5A;

fn passes(env: &PeEnv<'_>) {
    env.set_test_data(RAN, env.test_num.into());
    env.pass(1);
}

fn fails(env: &PeEnv<'_>) {
    env.fail(7);
}

fn stays_silent(_env: &PeEnv<'_>) {}

fn bad_register_then_pass(env: &PeEnv<'_>) {
    env.reg_read(RegId::PmsidrEl1);
    env.pass(1);
}

fn platform(hw: &FakeHw, arena: &mut Arena, num_pe: usize) -> InfoTables {
    let mut tables = arena.tables();
    tables.create_all(&TestProbe::sbsa(num_pe), hw).unwrap();
    tables
}

fn counters(total: u32, passed: u32, failed: u32) -> SuiteCounters {
    SuiteCounters {
        total,
        passed,
        failed,
    }
}

#[test]
fn passing_and_failing_tests_are_counted() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 3);
    let registry = StatusRegistry::new();
    let config = config(4);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let ok = TestCase::new(1, "passes on all PEs", "R_OK", passes).on_all_pes();
    let bad = TestCase::new(2, "fails", "R_BAD", fails);
    assert_eq!(test_case::execute(&mut ctx, &ok, 3), AvsStatus::Pass);
    for pe in 0..3 {
        assert_eq!(registry.get_test_data(pe), Some((RAN, 1)));
    }
    assert_eq!(test_case::execute(&mut ctx, &bad, 3), AvsStatus::Fail);
    assert_eq!(registry.get_status(0).reason(), 7);
    assert_eq!(ctx.counters, counters(2, 1, 1));
    assert_eq!(ctx.counters.skipped(), 0);
}

#[test]
fn skip_list_skips_tests_and_modules() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 2);
    let registry = StatusRegistry::new();
    let mut config = config(4);
    config.skip = SkipList::from_ids(&[3, 1100]);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let listed = TestCase::new(3, "listed", "R_3", passes).on_all_pes();
    assert_eq!(test_case::execute(&mut ctx, &listed, 2), AvsStatus::Skip);
    for pe in 0..2 {
        assert_eq!(registry.get_status(pe).state(), Some(TestState::Skip));
        assert_eq!(registry.get_test_data(pe), Some((0, 0)));
    }

    let in_listed_module = TestCase::new(1101, "memory", "R_1101", passes);
    assert_eq!(test_case::execute(&mut ctx, &in_listed_module, 2), AvsStatus::Skip);

    let other = TestCase::new(4, "not listed", "R_4", passes);
    assert_eq!(test_case::execute(&mut ctx, &other, 2), AvsStatus::Pass);

    assert_eq!(ctx.counters, counters(3, 1, 0));
    assert_eq!(ctx.counters.skipped(), 2);
}

#[test]
fn single_test_selection() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 1);
    let registry = StatusRegistry::new();
    let mut config = config(4);
    config.single_test = Some(2);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let first = TestCase::new(1, "first", "R_1", fails);
    let second = TestCase::new(2, "second", "R_2", passes);
    assert_eq!(test_case::execute(&mut ctx, &first, 1), AvsStatus::Skip);
    assert_eq!(test_case::execute(&mut ctx, &second, 1), AvsStatus::Pass);
}

#[test]
fn malformed_tests_are_errors() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 1);
    let registry = StatusRegistry::new();
    let config = config(4);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let no_rule = TestCase::new(5, "no rule", "", passes);
    let too_big = TestCase::new(0x1000, "wide", "R_W", passes);
    assert_eq!(test_case::execute(&mut ctx, &no_rule, 1), AvsStatus::Error);
    assert_eq!(test_case::execute(&mut ctx, &too_big, 1), AvsStatus::Error);
    assert_eq!(registry.get_test_data(0), Some((0, 0)));
    assert_eq!(ctx.counters, counters(2, 0, 2));
}

#[test]
fn a_pe_left_pending_fails_the_test() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 2);
    let registry = StatusRegistry::new();
    let config = config(4);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let silent = TestCase::new(6, "silent", "R_6", stays_silent);
    assert_eq!(test_case::execute(&mut ctx, &silent, 2), AvsStatus::Fail);
    assert!(registry.get_status(0).is_pending());
}

#[test]
fn register_failure_outlives_the_payload_verdict() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let tables = platform(&hw, &mut arena, 2);
    let registry = StatusRegistry::new();
    let config = config(4);
    let mut ctx = SuiteContext::new(Runtime {
        config: &config,
        tables: &tables,
        registry: &registry,
        hw: &hw,
    });

    let case = TestCase::new(7, "spe id", "R_7", bad_register_then_pass).on_all_pes();
    assert_eq!(test_case::execute(&mut ctx, &case, 2), AvsStatus::Fail);
    for pe in 0..2 {
        assert_eq!(registry.get_status(pe).reason(), REASON_BAD_REGISTER);
    }
}
