//! Memory map checks

use crate::arch::aarch64::defs::MMFR0_PARANGE;
use crate::coordinator::PeEnv;
use crate::info::memory::MemoryKind;
use crate::sysreg::{field, RegId};
use crate::test_case::TestCase;

const BASE: u32 = 1100;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check memory within PA range        ", "B_MEM_01", pa_range),
    TestCase::new(BASE + 2, "Check DRAM is Normal memory         ", "B_MEM_02", dram_is_normal),
];

/// Output address bits for each ID_AA64MMFR0_EL1.PARange encoding.
fn pa_bits(parange: u64) -> Option<u32> {
    match parange {
        0 => Some(32),
        1 => Some(36),
        2 => Some(40),
        3 => Some(42),
        4 => Some(44),
        5 => Some(48),
        6 => Some(52),
        _ => None,
    }
}

fn pa_range(env: &PeEnv<'_>) {
    let memory = env.tables().memory();
    if memory.is_empty() {
        env.skip(1);
        return;
    }
    let Some(bits) = pa_bits(field(env.reg_read(RegId::IdAa64mmfr0El1), MMFR0_PARANGE)) else {
        env.fail(1);
        return;
    };
    let limit = 1u64 << bits;
    for region in memory.entries().iter().filter(|r| r.kind == MemoryKind::Normal) {
        let end = region.phys_addr.saturating_add(region.size);
        if end > limit {
            log::error!("region {:#x}+{:#x} beyond {}-bit PA", region.phys_addr, region.size, bits);
            env.fail(2);
            return;
        }
    }
    env.pass(1);
}

fn dram_is_normal(env: &PeEnv<'_>) {
    let memory = env.tables().memory();
    let header = memory.header();
    if header.dram_size == 0 {
        env.skip(1);
        return;
    }
    let last = header.dram_base + header.dram_size - 1;
    for addr in [header.dram_base, last] {
        let (kind, _) = memory.get_info(addr);
        if kind != MemoryKind::Normal {
            log::error!("DRAM address {:#x} is described as {:?}", addr, kind);
            env.fail(1);
            return;
        }
    }
    env.pass(1);
}
