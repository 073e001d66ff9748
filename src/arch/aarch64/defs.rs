//! ARM64 Architecture Constants
//!
//! Named constants for the system register fields the suite decodes,
//! exception classes and PSCI function ids. Field positions are given as
//! inclusive `(start, end)` bit ranges for `sysreg::extract_bits`.

pub type Field = (u32, u32);

// ── CurrentEL ────────────────────────────────────────────────────────
pub const CURRENT_EL_SHIFT: u32 = 2;
pub const CURRENT_EL_MASK: u64 = 0x3;

// ── HCR_EL2 ──────────────────────────────────────────────────────────
pub const HCR_E2H: u64 = 1 << 34;

// ── ID_AA64PFR0_EL1 ──────────────────────────────────────────────────
pub const PFR0_EL2: Field = (8, 11);
pub const PFR0_EL3: Field = (12, 15);
pub const PFR0_RAS: Field = (28, 31);
pub const PFR0_SVE: Field = (32, 35);
pub const PFR0_MPAM: Field = (40, 43);

// ── ID_AA64PFR1_EL1 ──────────────────────────────────────────────────
pub const PFR1_MPAM_FRAC: Field = (16, 19);

// ── ID_AA64DFR0_EL1 ──────────────────────────────────────────────────
pub const DFR0_PMUVER: Field = (8, 11);
pub const DFR0_PMSVER: Field = (32, 35);
pub const PMUVER_IMP_DEF: u64 = 0xF;

// ── ID_AA64MMFR0_EL1 / MMFR1 ─────────────────────────────────────────
pub const MMFR0_PARANGE: Field = (0, 3);
pub const MMFR0_TGRAN4: Field = (28, 31);
pub const MMFR1_TWED: Field = (32, 35);

// ── PMCR_EL0 ─────────────────────────────────────────────────────────
pub const PMCR_N: Field = (11, 15);

// ── TCR_EL1 (and TCR_EL2 with E2H) ───────────────────────────────────
pub const TCR_T0SZ: Field = (0, 5);
pub const TCR_IRGN0: Field = (8, 9);
pub const TCR_ORGN0: Field = (10, 11);
pub const TCR_SH0: Field = (12, 13);
pub const TCR_TG0: Field = (14, 15);
pub const TCR_T1SZ: Field = (16, 21);
pub const TCR_IRGN1: Field = (24, 25);
pub const TCR_ORGN1: Field = (26, 27);
pub const TCR_SH1: Field = (28, 29);
pub const TCR_TG1: Field = (30, 31);
pub const TCR_IPS: Field = (32, 34);

// ── TCR_EL2 without E2H ──────────────────────────────────────────────
pub const TCR_EL2_PS: Field = (16, 18);

/// log2 of the granule for TG0 = 0, 1, 2.
pub const TG0_GRANULE_SHIFT: [u8; 3] = [12, 16, 14];
/// log2 of the granule for TG1 = 1, 2, 3. TG1 = 0 is reserved.
pub const TG1_GRANULE_SHIFT: [u8; 4] = [0, 14, 12, 16];

// ── ESR_ELx ──────────────────────────────────────────────────────────
pub const ESR_EC_SHIFT: u32 = 26;
pub const ESR_EC_MASK: u64 = 0x3F;

pub const EC_UNKNOWN: u64 = 0x00;
pub const EC_MSR_MRS: u64 = 0x18;
pub const EC_IABT_SAME: u64 = 0x21;
pub const EC_DABT_SAME: u64 = 0x25;
pub const EC_SERROR: u64 = 0x2F;

// ── MPIDR_EL1 ────────────────────────────────────────────────────────
pub const MPIDR_AFFINITY_MASK: u64 = 0xFF_00FF_FFFF;

// ── PSCI (SMC calling convention) ────────────────────────────────────
pub const PSCI_CPU_OFF: u32 = 0x8400_0002;
pub const PSCI_CPU_ON_64: u32 = 0xC400_0003;
pub const PSCI_AFFINITY_INFO_64: u32 = 0xC400_0004;
pub const PSCI_SYSTEM_OFF: u32 = 0x8400_0008;

pub const PSCI_SUCCESS: i32 = 0;
pub const PSCI_ALREADY_ON: i32 = -4;
pub const PSCI_ON_PENDING: i32 = -5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_mask_drops_mt_and_u() {
        // Aff3 = 1, U, MT, RES1 and Aff0 = 0
        let mpidr = (1 << 32) | (1 << 31) | (1 << 30) | (1 << 24);
        assert_eq!(mpidr & MPIDR_AFFINITY_MASK, 1 << 32);
        // cluster 1, core 0 is not the boot PE
        assert_ne!(0x100 & MPIDR_AFFINITY_MASK, 0);
        assert_eq!(0xC100_0000 & MPIDR_AFFINITY_MASK, 0);
    }
}
