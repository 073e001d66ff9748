//! SMMU checks
//!
//! The version test is the gatekeeper: when it does not pass, the rest of
//! the module is skipped.

use crate::coordinator::PeEnv;
use crate::info::iovirt::IovirtNode;
use crate::test_case::TestCase;

const BASE: u32 = 700;

pub const TESTS: &[TestCase] = &[
    TestCase::new(BASE + 1, "Check SMMU Version                  ", "B_SMMU_01", version).gatekeeper(),
    TestCase::new(BASE + 13, "Check DMA requestors behind SMMU   ", "S_L7SM_01", dma_behind_smmu).above(6),
];

fn version(env: &PeEnv<'_>) {
    let iovirt = env.tables().iovirt();
    for index in 0..iovirt.smmu_count() {
        match iovirt.smmu_version(index) {
            Some(3) => {}
            other => {
                log::error!("SMMU {}: version {:?}, SMMUv3 required", index, other);
                env.fail(index as u32 + 1);
                return;
            }
        }
    }
    env.pass(1);
}

/// Every coherent DMA requester (root complex or named component) must
/// sit behind an SMMU.
fn dma_behind_smmu(env: &PeEnv<'_>) {
    if env.level() < 7 {
        env.skip(1);
        return;
    }
    let iovirt = env.tables().iovirt();
    let requesters = iovirt
        .nodes(IovirtNode::PciRootComplex)
        .chain(iovirt.nodes(IovirtNode::NamedComponent));
    let mut bypassing = 0u32;
    for node in requesters.filter(|node| node.dma_bypasses_smmu()) {
        log::error!("{:?} {} ({}) is not behind an SMMU", node.node, node.id, node.name());
        bypassing += 1;
    }
    if bypassing == 0 {
        env.pass(1);
    } else {
        env.fail(bypassing);
    }
}
