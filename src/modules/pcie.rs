//! PCIe checks

use crate::coordinator::PeEnv;
use crate::peripherals::pcie::{
    Capability, ConfigSpace, ACS_CAPABILITY, ECAP_ACS, ECAP_ATS, ECAP_PRI,
};
use crate::peripherals::pcie::PortType;
use crate::test_case::TestCase;

const BASE: u32 = 400;

/// Source Validation, Translation Blocking, P2P Request Redirect, P2P
/// Completion Redirect, Upstream Forwarding.
const ACS_REQUIRED: u32 = 0x1F;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check ECAM Presence                 ", "PCI_IN_01", ecam_present),
    TestCase::new(BASE + 17, "Check RP ACS capabilities           ", "IE_ACS_2", root_port_acs),
    TestCase::new(BASE + 40, "Check RP ATS and PRI absence        ", "IE_SMU_1, IE_SMU_2", root_port_no_ats_pri),
];

fn ecam_present(env: &PeEnv<'_>) {
    if env.tables().pcie().is_empty() {
        log::error!("no ECAM region described");
        env.fail(1);
    } else {
        env.pass(1);
    }
}

/// Root ports that forward peer-to-peer traffic must implement the
/// ACS controls that keep it in check.
fn root_port_acs(env: &PeEnv<'_>) {
    let devices = env.tables().pcie_devices();
    if devices.is_empty() {
        env.skip(3);
        return;
    }
    if !env.tables().pcie().p2p_supported() {
        log::debug!("peer-to-peer not supported, nothing to check");
        env.skip(1);
        return;
    }

    let config = ConfigSpace::new(env.hw(), env.tables().pcie());
    let mut checked = 0u32;
    for rp in devices.of_type(PortType::RootPort) {
        checked += 1;
        let acs = match config.find_capability(rp.bdf, Capability::Extended(ECAP_ACS)) {
            Ok(Some(offset)) => offset,
            Ok(None) => {
                log::error!("{}: ACS capability missing", rp.bdf);
                env.fail(1);
                return;
            }
            Err(err) => {
                log::error!("{}: {}", rp.bdf, err);
                env.fail(2);
                return;
            }
        };
        let caps = match config.read32(rp.bdf, acs + ACS_CAPABILITY) {
            Ok(value) => value,
            Err(err) => {
                log::error!("{}: {}", rp.bdf, err);
                env.fail(2);
                return;
            }
        };
        if caps & ACS_REQUIRED != ACS_REQUIRED {
            log::error!("{}: ACS capability {:#x} incomplete", rp.bdf, caps & 0xFFFF);
            env.fail(3);
            return;
        }
    }

    if checked == 0 {
        env.skip(2);
    } else {
        env.pass(1);
    }
}

fn root_port_no_ats_pri(env: &PeEnv<'_>) {
    let config = ConfigSpace::new(env.hw(), env.tables().pcie());
    let mut checked = 0u32;
    let mut failures = 0u32;
    for rp in env.tables().pcie_devices().of_type(PortType::RootPort) {
        checked += 1;
        for cap in [ECAP_ATS, ECAP_PRI] {
            match config.find_capability(rp.bdf, Capability::Extended(cap)) {
                Ok(None) => {}
                Ok(Some(_)) => {
                    log::error!("{}: root port implements capability {:#x}", rp.bdf, cap);
                    failures += 1;
                }
                Err(err) => {
                    log::error!("{}: {}", rp.bdf, err);
                    failures += 1;
                }
            }
        }
    }

    if checked == 0 {
        env.skip(1);
    } else if failures == 0 {
        env.pass(1);
    } else {
        env.fail(failures);
    }
}
