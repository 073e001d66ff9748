mod common;

use common::{config, watchdog, Arena, FakeHw, TestProbe};
use sbsa_acs::error::AvsError;
use sbsa_acs::info::pcie::EcamRegion;
use sbsa_acs::info::InfoTables;
use sbsa_acs::modules::exerciser::{EXERCISER_DEVICE_ID, EXERCISER_VENDOR_ID};
use sbsa_acs::modules::ModuleMask;
use sbsa_acs::peripherals::gic::GicDistributor;
use sbsa_acs::peripherals::pcie::{
    Bdf, Capability, ConfigSpace, PortType, CAP_PCIE, ECAP_ACS, ECAP_ATS,
};
use sbsa_acs::peripherals::watchdog::{self as wdt, Watchdog};
use sbsa_acs::run_suite;
use sbsa_acs::status::StatusRegistry;

const ECAM_BASE: u64 = 0x4000_0000;

const ROOT_PORT: Bdf = Bdf::new(0, 0, 1, 0);
const LEGACY: Bdf = Bdf::new(0, 0, 2, 0);
const EXERCISER: Bdf = Bdf::new(0, 1, 0, 0);

fn config_addr(bdf: Bdf, offset: u64) -> u64 {
    ECAM_BASE
        + (u64::from(bdf.bus()) << 20)
        + (u64::from(bdf.device()) << 15)
        + (u64::from(bdf.function()) << 12)
        + offset
}

fn ecam() -> EcamRegion {
    EcamRegion {
        base: ECAM_BASE,
        segment: 0,
        start_bus: 0,
        end_bus: 1,
    }
}

/// Root port 00:01.0 with ACS, a conventional PCI device at 00:02.0 and an
/// exerciser endpoint at 01:00.0.
fn populate(hw: &FakeHw, acs: u32) {
    let cfg = |bdf, offset, value| hw.mmio_write(config_addr(bdf, offset), value);

    cfg(ROOT_PORT, 0x00, 0xABCD_1AF4);
    cfg(ROOT_PORT, 0x04, 0x0010_0000);
    cfg(ROOT_PORT, 0x08, 0x0604_0001);
    cfg(ROOT_PORT, 0x0C, 0x0001_0000);
    cfg(ROOT_PORT, 0x34, 0x40);
    cfg(ROOT_PORT, 0x40, 0x0042_0010);
    cfg(ROOT_PORT, 0x100, 0x0001_000D);
    cfg(ROOT_PORT, 0x104, acs);

    cfg(LEGACY, 0x00, 0x0001_1234);
    cfg(LEGACY, 0x04, 0);
    cfg(LEGACY, 0x0C, 0);

    cfg(EXERCISER, 0x00, (u32::from(EXERCISER_DEVICE_ID) << 16) | u32::from(EXERCISER_VENDOR_ID));
    cfg(EXERCISER, 0x04, 0x0010_0000);
    cfg(EXERCISER, 0x08, 0x0B40_0000);
    cfg(EXERCISER, 0x0C, 0);
    cfg(EXERCISER, 0x34, 0x50);
    cfg(EXERCISER, 0x50, 0x0002_0010);
}

fn pcie_platform() -> TestProbe {
    TestProbe {
        ecam: vec![ecam()],
        p2p: true,
        watchdogs: vec![watchdog(0x3000_0000, 0x3001_0000, 60)],
        ..TestProbe::sbsa(1)
    }
}

fn enumerated(hw: &FakeHw, arena: &mut Arena) -> InfoTables {
    let mut tables = arena.tables();
    tables.create_all(&pcie_platform(), hw).unwrap();
    tables
}

#[test]
fn enumeration_finds_every_function() {
    let hw = FakeHw::new();
    populate(&hw, 0x1F);
    let mut arena = Arena::new(0x10_0000);
    let tables = enumerated(&hw, &mut arena);

    let devices = tables.pcie_devices();
    assert_eq!(devices.len(), 3);
    let bdfs: Vec<_> = devices.entries().iter().map(|f| f.bdf).collect();
    assert_eq!(bdfs, vec![ROOT_PORT, LEGACY, EXERCISER]);

    let rp = &devices.entries()[0];
    assert_eq!(rp.port_type, PortType::RootPort);
    assert_eq!((rp.vendor_id, rp.device_id), (0x1AF4, 0xABCD));
    assert_eq!(rp.class_code, 0x06_0400);
    assert_eq!(devices.entries()[1].port_type, PortType::Conventional);
    assert_eq!(devices.entries()[2].port_type, PortType::Endpoint);
    assert_eq!(devices.of_type(PortType::RootPort).count(), 1);
    assert_eq!(EXERCISER.to_string(), "0000:01:00.0");
}

#[test]
fn capability_walks() {
    let hw = FakeHw::new();
    populate(&hw, 0x1F);
    let mut arena = Arena::new(0x10_0000);
    let tables = enumerated(&hw, &mut arena);
    let config = ConfigSpace::new(&hw, tables.pcie());

    assert_eq!(config.find_capability(ROOT_PORT, Capability::Pci(CAP_PCIE)), Ok(Some(0x40)));
    assert_eq!(config.find_capability(ROOT_PORT, Capability::Extended(ECAP_ACS)), Ok(Some(0x100)));
    assert_eq!(config.find_capability(ROOT_PORT, Capability::Extended(ECAP_ATS)), Ok(None));
    assert_eq!(config.find_capability(LEGACY, Capability::Pci(CAP_PCIE)), Ok(None));
    assert_eq!(config.find_capability(EXERCISER, Capability::Extended(ECAP_ACS)), Ok(None));
    assert_eq!(config.read16(ROOT_PORT, 0x42), Ok(0x0042));
    assert_eq!(config.read8(ROOT_PORT, 0x0E), Ok(0x01));

    let outside = Bdf::new(0, 2, 0, 0);
    assert_eq!(config.read32(outside, 0), Err(AvsError::NoEcam(outside.raw())));
}

#[test]
fn pcie_platform_passes_at_level_six() {
    let hw = FakeHw::new();
    populate(&hw, 0x1F);
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();

    let report = run_suite(&config(6), &hw, &pcie_platform(), &mut tables, &registry);
    assert!(report
        .modules_run
        .contains(ModuleMask::WATCHDOG | ModuleMask::PCIE | ModuleMask::EXERCISER));
    // PE 1-5 and 17 (no SVE, skipped), memory 2, GIC 2, watchdog 2, PCIe 3,
    // exerciser 1
    assert_eq!(report.counters.total, 16);
    assert_eq!(report.counters.failed, 0);
    assert_eq!(report.counters.skipped(), 1);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn incomplete_root_port_acs_fails() {
    let hw = FakeHw::new();
    populate(&hw, 0x0F);
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let mut config = config(6);
    config.single_module = Some(400);

    let report = run_suite(&config, &hw, &pcie_platform(), &mut tables, &registry);
    assert_eq!(report.modules_run, ModuleMask::PCIE);
    assert_eq!(report.counters.total, 3);
    assert_eq!(report.counters.failed, 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn root_port_with_ats_fails() {
    let hw = FakeHw::new();
    populate(&hw, 0x1F);
    // ACS -> ATS at 0x140
    hw.mmio_write(config_addr(ROOT_PORT, 0x100), 0x1401_000D);
    hw.mmio_write(config_addr(ROOT_PORT, 0x140), 0x0001_000F);
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    let registry = StatusRegistry::new();
    let mut config = config(6);
    config.single_module = Some(400);

    // ACS is still found behind the new link, so only the ATS check fails
    let report = run_suite(&config, &hw, &pcie_platform(), &mut tables, &registry);
    assert_eq!(report.counters.total, 3);
    assert_eq!(report.counters.passed, 2);
    assert_eq!(report.counters.failed, 1);
}

#[test]
fn watchdog_offset_programming() {
    let hw = FakeHw::new();
    let entry = watchdog(0x3000_0000, 0x3001_0000, 60);
    let wd = Watchdog::new(&hw, &entry);

    // Revision 0: 32-bit offset register
    hw.mmio_write(0x3000_0FCC, 0);
    assert_eq!(wd.offset_width(), 32);
    assert!(!wd.set_ws0(1 << 32));
    assert!(wd.set_ws0(0x1234));
    assert_eq!(wd.offset(), 0x1234);
    assert_eq!(wd.status() & 1, 1);

    // Revision 1: 48 bits
    hw.mmio_write(0x3000_0FCC, 1 << 16);
    assert_eq!(wd.arch_revision(), 1);
    assert!(wd.set_ws0(0x1_0000_0001));
    assert_eq!(wd.offset(), 0x1_0000_0001);

    assert!(wd.set_ws0(0));
    assert_eq!(wd.status() & 1, 0);

    wd.refresh();
    assert_eq!(hw.mmio_value(0x3001_0000), Some(0));
}

#[test]
fn gic_routing_through_the_distributor() {
    let hw = FakeHw::new();
    let gicd = GicDistributor::new(&hw, common::GICD_BASE);
    assert_eq!(gicd.arch_version(), 3);

    gicd.route_spi(40, TestProbe::mpidr(1)).unwrap();
    let irouter = common::GICD_BASE + 0x6000 + 8 * 40;
    assert_eq!(hw.mmio_value(irouter), Some(1));
    assert_eq!(hw.mmio_value(irouter + 4), Some(0));
    assert_eq!(gicd.route_spi(1020, 0), Err(AvsError::UnsupportedIntId(1020)));
}

#[test]
fn watchdog_frequency_falls_back_to_the_counter() {
    let hw = FakeHw::new();
    let mut arena = Arena::new(0x10_0000);
    let mut tables = arena.tables();
    tables.create_all(&TestProbe::sbsa(1), &hw).unwrap();

    assert_eq!(wdt::counter_frequency(tables.timer(), &hw), common::FREQUENCY);
    assert_eq!(wdt::timeout_ticks(common::FREQUENCY, 100), 100_000);
    assert_eq!(wdt::timeout_ticks(100, 1), 1);
}
