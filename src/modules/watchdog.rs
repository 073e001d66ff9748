//! Generic watchdog checks

use crate::coordinator::PeEnv;
use crate::peripherals::gic::{SPI_END, SPI_START};
use crate::peripherals::watchdog::{self, Watchdog};
use crate::test_case::TestCase;

const BASE: u32 = 300;

/// WS0 timeout programmed by the offset check.
const WS0_TIMEOUT_MS: u64 = 100;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check NS Watchdog Accessibility     ", "B_WD_01", ns_accessible),
    TestCase::new(BASE + 2, "Check Watchdog WS0 timeout          ", "B_WD_02", ws0_timeout),
];

fn ns_accessible(env: &PeEnv<'_>) {
    let watchdogs = env.tables().watchdog();
    if watchdogs.non_secure().next().is_none() {
        log::error!("no non-secure watchdog described");
        env.fail(1);
        return;
    }
    for (index, wd) in watchdogs.non_secure() {
        if wd.ctrl_base == 0 || wd.refresh_base == 0 {
            log::error!("watchdog {}: frame base missing", index);
            env.fail(2);
            return;
        }
        if !(SPI_START..=SPI_END).contains(&wd.gsiv) {
            log::error!("watchdog {}: interrupt {} is not an SPI", index, wd.gsiv);
            env.fail(3);
            return;
        }
        let revision = Watchdog::new(env.hw(), wd).arch_revision();
        log::debug!("watchdog {}: architecture revision {}", index, revision);
    }
    env.pass(1);
}

/// Programs WS0 on every non-secure watchdog and reads the offset back.
fn ws0_timeout(env: &PeEnv<'_>) {
    let watchdogs = env.tables().watchdog();
    if watchdogs.non_secure().next().is_none() {
        env.skip(1);
        return;
    }
    let frequency = watchdog::counter_frequency(env.tables().timer(), env.hw());
    let ticks = watchdog::timeout_ticks(frequency, WS0_TIMEOUT_MS);
    for (index, wd) in watchdogs.non_secure() {
        let wdog = Watchdog::new(env.hw(), wd);
        let programmed = wdog.set_ws0(ticks);
        let readback = wdog.offset();
        wdog.disable();
        if !programmed || readback != ticks {
            log::error!("watchdog {}: offset {:#x}, expected {:#x}", index, readback, ticks);
            env.fail(index as u32 + 1);
            return;
        }
    }
    env.pass(1);
}
