//! Suite context
//!
//! What used to be process-wide state is carried explicitly: the
//! configuration, the info tables, the status registry and the hardware,
//! shared read-only by every PE ([`Runtime`]), plus the counters and module
//! cursor owned by the primary PE ([`SuiteContext`]).

use log::error;

use crate::arch::Hardware;
use crate::config::SuiteConfig;
use crate::info::InfoTables;
use crate::modules::{Module, ModuleMask};
use crate::status::{
    AvsStatus, StatusRegistry, TestResult, INVALID_INDEX_SENTINEL, REASON_BAD_PE_INDEX,
    REASON_BAD_REGISTER,
};
use crate::sysreg::{self, PeFeature, RegId};

/// Shared view of one suite run. Every PE may hold one.
#[derive(Clone, Copy)]
pub struct Runtime<'a> {
    pub config: &'a SuiteConfig,
    pub tables: &'a InfoTables,
    pub registry: &'a StatusRegistry,
    pub hw: &'a dyn Hardware,
}

impl<'a> Runtime<'a> {
    pub fn level(&self) -> u32 {
        self.config.level
    }

    /// Index of the calling PE in the PE table, 0 when its MPIDR is not
    /// described.
    pub fn current_pe_index(&self) -> usize {
        sysreg::read(self.hw, RegId::MpidrEl1)
            .ok()
            .and_then(|mpidr| self.tables.pe().index_of(mpidr))
            .unwrap_or(0)
    }

    fn record_fail(&self, pe: usize, test: u32, reason: u32) {
        self.registry
            .set_status(pe, TestResult::fail(self.level(), test, reason));
    }

    /// Reads `id` on the calling PE. An inaccessible register is a FAIL
    /// (0x78) for `pe` and reads as 0.
    pub fn reg_read(&self, pe: usize, test: u32, id: RegId) -> u64 {
        sysreg::read(self.hw, id).unwrap_or_else(|err| {
            error!("PE {}: register read failed: {}", pe, err);
            self.record_fail(pe, test, REASON_BAD_REGISTER);
            0
        })
    }

    /// [`Runtime::reg_read`] by raw register id, as test payloads pass it.
    /// An id naming no register is a FAIL (0x78) for `pe` and reads as 0.
    pub fn reg_read_raw(&self, pe: usize, test: u32, raw: u32) -> u64 {
        match RegId::try_from(raw) {
            Ok(id) => self.reg_read(pe, test, id),
            Err(err) => {
                error!("PE {}: {}", pe, err);
                self.record_fail(pe, test, REASON_BAD_REGISTER);
                0
            }
        }
    }

    pub fn reg_write(&self, pe: usize, test: u32, id: RegId, value: u64) {
        if let Err(err) = sysreg::write(self.hw, id, value) {
            error!("PE {}: register write failed: {}", pe, err);
            self.record_fail(pe, test, REASON_BAD_REGISTER);
        }
    }

    /// Feature check by raw feature id, as test payloads pass it.
    pub fn feat_check(&self, raw: u32) -> AvsStatus {
        match PeFeature::try_from(raw) {
            Ok(feature) => sysreg::feat_check(self.hw, feature),
            Err(unknown) => {
                error!("feature id {} not supported", unknown);
                AvsStatus::Fail
            }
        }
    }

    /// PMU overflow GSIV of PE `index`. An invalid index is a FAIL (0xFF)
    /// for the calling PE and yields the invalid-index sentinel.
    pub fn pmu_gsiv(&self, pe: usize, test: u32, index: usize) -> u32 {
        self.tables.pe().pmu_gsiv(index).unwrap_or_else(|err| {
            error!("{}", err);
            self.record_fail(pe, test, REASON_BAD_PE_INDEX);
            INVALID_INDEX_SENTINEL
        })
    }

    pub fn gmain_gsiv(&self, pe: usize, test: u32, index: usize) -> u32 {
        self.tables.pe().gmain_gsiv(index).unwrap_or_else(|err| {
            error!("{}", err);
            self.record_fail(pe, test, REASON_BAD_PE_INDEX);
            INVALID_INDEX_SENTINEL
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuiteCounters {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

impl SuiteCounters {
    pub fn record(&mut self, status: AvsStatus) {
        self.total += 1;
        match status {
            AvsStatus::Pass => self.passed += 1,
            AvsStatus::Fail | AvsStatus::Error => self.failed += 1,
            AvsStatus::Skip => {}
        }
    }

    pub fn skipped(&self) -> u32 {
        self.total - self.passed - self.failed
    }
}

/// Primary-PE state of one run.
pub struct SuiteContext<'a> {
    pub rt: Runtime<'a>,
    pub counters: SuiteCounters,
    pub current_module: Option<Module>,
    pub modules_run: ModuleMask,
}

impl<'a> SuiteContext<'a> {
    pub fn new(rt: Runtime<'a>) -> Self {
        Self {
            rt,
            counters: SuiteCounters::default(),
            current_module: None,
            modules_run: ModuleMask::empty(),
        }
    }

    /// Why test `num` must not run, if it must not.
    pub fn skip_reason(&self, num: u32) -> Option<&'static str> {
        let config = self.rt.config;
        let base = self.current_module.map_or(num - num % 100, Module::test_base);
        if config.skip.contains(num) {
            return Some("in skip list");
        }
        if config.skip.contains(base) {
            return Some("module in skip list");
        }
        let selected = config.single_test == Some(num) || config.single_module == Some(base);
        if (config.single_test.is_some() || config.single_module.is_some()) && !selected {
            return Some("not selected");
        }
        None
    }
}
