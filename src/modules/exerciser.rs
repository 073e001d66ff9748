//! PCIe exerciser checks
//!
//! Exercisers are Arm stimulus-generation endpoints found by vendor id in
//! the enumerated device table.

use crate::coordinator::PeEnv;
use crate::peripherals::pcie::PortType;
use crate::test_case::TestCase;

const BASE: u32 = 800;

pub const EXERCISER_VENDOR_ID: u16 = 0x13B5;
pub const EXERCISER_DEVICE_ID: u16 = 0xED01;

pub const TESTS: &[TestCase] = &[TestCase::new(
    BASE + 1,
    "Check Exerciser PCIe endpoints      ",
    "PCI_EX_01",
    endpoints,
)];

fn endpoints(env: &PeEnv<'_>) {
    let exercisers = env.tables().pcie_devices().entries().iter().filter(|function| {
        function.vendor_id == EXERCISER_VENDOR_ID && function.device_id == EXERCISER_DEVICE_ID
    });

    let mut found = 0u32;
    for exerciser in exercisers {
        found += 1;
        if matches!(exerciser.port_type, PortType::Conventional | PortType::Unknown) {
            log::error!("exerciser {} has no PCI Express capability", exerciser.bdf);
            env.fail(found);
            return;
        }
    }
    if found == 0 {
        log::debug!("no exerciser found");
        env.skip(1);
    } else {
        env.pass(1);
    }
}
