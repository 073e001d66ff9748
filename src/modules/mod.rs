//! Test modules and their level gating
//!
//! Modules run in [`MODULE_PLAN`] order, each behind its level gate. Inside
//! a module the tests run in list order, each behind its own gate.

use bitflags::bitflags;
use log::{error, info, warn};

use crate::status::AvsStatus;
use crate::suite::SuiteContext;
use crate::test_case::{self, LevelGate, TestCase};

pub mod exerciser;
pub mod gic;
pub mod memory;
pub mod mpam;
pub mod pcie;
pub mod pe;
pub mod pmu;
pub mod ras;
pub mod smmu;
pub mod watchdog;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Module {
    Pe,
    Memory,
    Gic,
    Smmu,
    Watchdog,
    Pcie,
    Exerciser,
    Mpam,
    Pmu,
    Ras,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ModuleMask: u32 {
        const PE = 1 << 0;
        const MEMORY = 1 << 1;
        const GIC = 1 << 2;
        const SMMU = 1 << 3;
        const WATCHDOG = 1 << 4;
        const PCIE = 1 << 5;
        const EXERCISER = 1 << 6;
        const MPAM = 1 << 7;
        const PMU = 1 << 8;
        const RAS = 1 << 9;
    }
}

impl Module {
    /// First test number of the module; also its skip-list id.
    pub const fn test_base(self) -> u32 {
        match self {
            Self::Pe => 0,
            Self::Gic => 100,
            Self::Watchdog => 300,
            Self::Pcie => 400,
            Self::Smmu => 700,
            Self::Exerciser => 800,
            Self::Memory => 1100,
            Self::Mpam => 1200,
            Self::Pmu => 1300,
            Self::Ras => 1400,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Pe => "PE",
            Self::Memory => "Memory",
            Self::Gic => "GIC",
            Self::Smmu => "SMMU",
            Self::Watchdog => "Watchdog",
            Self::Pcie => "PCIe",
            Self::Exerciser => "Exerciser",
            Self::Mpam => "MPAM",
            Self::Pmu => "PMU",
            Self::Ras => "RAS",
        }
    }

    pub const fn mask(self) -> ModuleMask {
        match self {
            Self::Pe => ModuleMask::PE,
            Self::Memory => ModuleMask::MEMORY,
            Self::Gic => ModuleMask::GIC,
            Self::Smmu => ModuleMask::SMMU,
            Self::Watchdog => ModuleMask::WATCHDOG,
            Self::Pcie => ModuleMask::PCIE,
            Self::Exerciser => ModuleMask::EXERCISER,
            Self::Mpam => ModuleMask::MPAM,
            Self::Pmu => ModuleMask::PMU,
            Self::Ras => ModuleMask::RAS,
        }
    }

    pub fn tests(self) -> &'static [TestCase] {
        match self {
            Self::Pe => pe::TESTS,
            Self::Memory => memory::TESTS,
            Self::Gic => gic::TESTS,
            Self::Smmu => smmu::TESTS,
            Self::Watchdog => watchdog::TESTS,
            Self::Pcie => pcie::TESTS,
            Self::Exerciser => exerciser::TESTS,
            Self::Mpam => mpam::TESTS,
            Self::Pmu => pmu::TESTS,
            Self::Ras => ras::TESTS,
        }
    }

    /// Module a test number belongs to.
    pub fn of_test(num: u32) -> Option<Self> {
        MODULE_PLAN
            .iter()
            .map(|plan| plan.module)
            .find(|module| (module.test_base()..module.test_base() + 100).contains(&num))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ModulePlan {
    pub module: Module,
    pub gate: LevelGate,
}

pub const MODULE_PLAN: [ModulePlan; 10] = [
    ModulePlan { module: Module::Pe, gate: LevelGate::Always },
    ModulePlan { module: Module::Memory, gate: LevelGate::Always },
    ModulePlan { module: Module::Gic, gate: LevelGate::Always },
    ModulePlan { module: Module::Smmu, gate: LevelGate::Above(3) },
    ModulePlan { module: Module::Watchdog, gate: LevelGate::Above(5) },
    ModulePlan { module: Module::Pcie, gate: LevelGate::Above(5) },
    ModulePlan { module: Module::Exerciser, gate: LevelGate::Always },
    ModulePlan { module: Module::Mpam, gate: LevelGate::Above(6) },
    ModulePlan { module: Module::Pmu, gate: LevelGate::Above(6) },
    ModulePlan { module: Module::Ras, gate: LevelGate::Above(6) },
];

/// Modules whose gate admits `level`.
pub fn modules_for_level(level: u32) -> ModuleMask {
    MODULE_PLAN
        .iter()
        .filter(|plan| plan.gate.admits(level))
        .fold(ModuleMask::empty(), |mask, plan| mask | plan.module.mask())
}

/// Runs every module admitted at the configured level.
pub fn run_modules(ctx: &mut SuiteContext<'_>, num_pe: usize) -> AvsStatus {
    let level = ctx.rt.level();
    MODULE_PLAN
        .iter()
        .filter(|plan| plan.gate.admits(level))
        .fold(AvsStatus::Skip, |status, plan| {
            status.combine(execute_module(ctx, plan.module, num_pe))
        })
}

fn precondition(ctx: &SuiteContext<'_>, module: Module) -> Option<&'static str> {
    match module {
        Module::Smmu if ctx.rt.tables.iovirt().smmu_count() == 0 => {
            Some("No SMMU Controller Found")
        }
        Module::Pcie if !ctx.rt.config.enable_pcie_tests => Some("PCIe tests disabled"),
        _ => None,
    }
}

/// Runs the tests of one module, honoring module-wide skip directives.
pub fn execute_module(ctx: &mut SuiteContext<'_>, module: Module, num_pe: usize) -> AvsStatus {
    let config = ctx.rt.config;
    let base = module.test_base();

    if config.skip.contains(base) {
        info!("      USER Override - Skipping all {} tests", module.name());
        return AvsStatus::Skip;
    }
    if let Some(single) = config.single_module {
        let single_test_here = config
            .single_test
            .map_or(false, |test| Module::of_test(test) == Some(module));
        if single != base && !single_test_here {
            info!(" USER Override - Skipping all {} tests (Running only a single module)", module.name());
            return AvsStatus::Skip;
        }
    }
    if let Some(reason) = precondition(ctx, module) {
        warn!("      {}, Skipping {} tests...", reason, module.name());
        return AvsStatus::Skip;
    }

    info!("");
    info!("      *** Starting {} tests ***", module.name());
    ctx.current_module = Some(module);
    ctx.modules_run |= module.mask();

    let level = ctx.rt.level();
    let mut status = AvsStatus::Skip;
    for case in module.tests().iter().filter(|case| case.gate.admits(level)) {
        let result = test_case::execute(ctx, case, num_pe);
        status = status.combine(result);
        if case.gatekeeper && result != AvsStatus::Pass {
            error!("      {} not compliant, Skipping remaining {} tests", case.rule, module.name());
            status = AvsStatus::Skip;
            break;
        }
    }

    if status == AvsStatus::Pass {
        info!("      All {} tests passed!!", module.name());
    } else {
        info!("      One or more {} tests failed or were skipped.", module.name());
    }
    ctx.current_module = None;
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_is_monotonic() {
        for level in 1..7 {
            let lower = modules_for_level(level);
            let higher = modules_for_level(level + 1);
            assert!(higher.contains(lower), "level {} -> {}", level, level + 1);
        }
        assert!(!modules_for_level(3).contains(ModuleMask::SMMU));
        assert!(modules_for_level(4).contains(ModuleMask::SMMU));
        assert!(modules_for_level(7).contains(ModuleMask::all()));
    }

    #[test]
    fn test_numbers_belong_to_their_module() {
        for plan in MODULE_PLAN {
            for case in plan.module.tests() {
                assert_eq!(Module::of_test(case.num), Some(plan.module), "{}", case.rule);
            }
        }
    }
}
