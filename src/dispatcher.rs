//! Suite entry point
//!
//! One run is three phases:
//!
//! 1. setup: reset the status registry, build the info tables (PE and GIC
//!    failures end the run here)
//! 2. guarded: run the modules with the default exception handler armed; a
//!    fault abandons the remaining tests
//! 3. finalize: print the summary and free the tables, on every path

use log::{error, info};

use crate::arch::{Fault, Hardware};
use crate::config::SuiteConfig;
use crate::error::AvsError;
use crate::info::InfoTables;
use crate::modules::{self, ModuleMask};
use crate::probe::PlatformProbe;
use crate::status::{AvsStatus, StatusRegistry};
use crate::suite::{Runtime, SuiteContext, SuiteCounters};
use crate::{coordinator, uart};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteReport {
    pub counters: SuiteCounters,
    pub status: AvsStatus,
    pub fault: Option<Fault>,
    pub setup_error: Option<AvsError>,
    pub modules_run: ModuleMask,
}

impl SuiteReport {
    fn setup_failed(err: AvsError) -> Self {
        Self {
            counters: SuiteCounters::default(),
            status: AvsStatus::Error,
            fault: None,
            setup_error: Some(err),
            modules_run: ModuleMask::empty(),
        }
    }

    /// 0 when every test that ran passed or was skipped.
    pub fn exit_code(&self) -> i32 {
        if self.setup_error.is_some() {
            2
        } else if self.fault.is_some() {
            3
        } else if self.counters.failed > 0 || self.status.is_failure() {
            1
        } else {
            0
        }
    }
}

fn print_banner(config: &SuiteConfig) {
    info!("");
    info!(" SBSA Architecture Compliance Suite");
    info!("    Starting tests for level {:2} (Print level is {:2})", config.level, config.print_level);
    info!("");
}

fn print_summary(counters: &SuiteCounters) {
    info!("");
    info!("     -------------------------------------------------------");
    info!(
        "     Total Tests run  = {:4}  Tests Passed  = {:4}  Tests Failed = {:4}",
        counters.total, counters.passed, counters.failed
    );
    info!("     -------------------------------------------------------");
    info!("");
    info!("      *** SBSA tests complete. Reset the system. ***");
}

/// Runs the whole suite against `hw`, with topology discovered by `probe`.
///
/// `tables` is empty on return whatever happened.
pub fn run_suite<P: PlatformProbe + ?Sized>(
    config: &SuiteConfig,
    hw: &dyn Hardware,
    probe: &P,
    tables: &mut InfoTables,
    registry: &StatusRegistry,
) -> SuiteReport {
    let config = config.normalized();
    registry.reset();
    print_banner(&config);

    if let Err(err) = tables.create_all(probe, hw) {
        error!(" Info table setup failed: {}", err);
        tables.free();
        return SuiteReport::setup_failed(err);
    }

    let num_pe = tables.pe().num_pe();
    let (counters, modules_run, outcome) = {
        let mut ctx = SuiteContext::new(Runtime {
            config: &config,
            tables,
            registry,
            hw,
        });
        let outcome = hw.guarded(&mut || modules::run_modules(&mut ctx, num_pe));
        if outcome.is_err() {
            // The trampoline skipped every destructor, console guard included.
            uart::release_after_fault();
        }
        let busy = coordinator::drain(&ctx.rt);
        if busy > 0 {
            error!(" {} PE(s) still running a test payload", busy);
        }
        (ctx.counters, ctx.modules_run, outcome)
    };

    let (status, fault) = match outcome {
        Ok(status) => (status, None),
        Err(fault) => {
            error!(
                " Exception {:#x} taken: ESR {:#x} FAR {:#x} ELR {:#x}, remaining tests aborted",
                fault.vector, fault.esr, fault.far, fault.elr
            );
            (AvsStatus::Error, Some(fault))
        }
    };

    print_summary(&counters);
    tables.free();

    SuiteReport {
        counters,
        status,
        fault,
        setup_error: None,
        modules_run,
    }
}
