//! Physical system registers
//!
//! [`PhysReg`] is what actually gets encoded into an `mrs`/`msr`. Most
//! registers are a [`RegId`] passed straight through; the EL-specific
//! halves of the polymorphic registers, the TTBRs and HCR_EL2 are only
//! reachable through the access layer's resolvers.
//!
//! Registers that some assemblers only accept behind a target feature
//! (RAS, SPE, LOR, SVE, VHE) are spelled with their generic `S3_...`
//! encoding.

use crate::sysreg::RegId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysReg {
    Direct(RegId),
    MairEl1,
    MairEl2,
    TcrEl1,
    TcrEl2,
    Ttbr0El1,
    Ttbr1El1,
    Ttbr0El2,
    Ttbr1El2,
    HcrEl2,
}

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod access {
    use core::arch::asm;

    use super::PhysReg;
    use crate::sysreg::RegId;

    macro_rules! mrs {
        ($reg:literal) => {{
            let value: u64;
            unsafe { asm!(concat!("mrs {}, ", $reg), out(reg) value, options(nomem, nostack)) };
            value
        }};
    }

    macro_rules! msr {
        ($reg:literal, $value:expr) => {{
            unsafe {
                asm!(concat!("msr ", $reg, ", {}"), "isb", in(reg) $value, options(nostack))
            };
        }};
    }

    /// ERXFR_EL1 of error record `n`, selected through ERRSELR_EL1.
    fn err_record_feature(n: u64) -> u64 {
        msr!("S3_0_C5_C3_1", n);
        mrs!("S3_0_C5_C4_0")
    }

    fn rdvl() -> u64 {
        let value: u64;
        // rdvl x0, #1
        unsafe { asm!(".inst 0x04bf5020", out("x0") value, options(nomem, nostack)) };
        value
    }

    pub fn read(reg: PhysReg) -> Option<u64> {
        use RegId::*;
        let value = match reg {
            PhysReg::MairEl1 => mrs!("mair_el1"),
            PhysReg::MairEl2 => mrs!("mair_el2"),
            PhysReg::TcrEl1 => mrs!("tcr_el1"),
            PhysReg::TcrEl2 => mrs!("tcr_el2"),
            PhysReg::Ttbr0El1 => mrs!("ttbr0_el1"),
            PhysReg::Ttbr1El1 => mrs!("ttbr1_el1"),
            PhysReg::Ttbr0El2 => mrs!("ttbr0_el2"),
            PhysReg::Ttbr1El2 => mrs!("S3_4_C2_C0_1"),
            PhysReg::HcrEl2 => mrs!("hcr_el2"),
            PhysReg::Direct(id) => match id {
                MpidrEl1 => mrs!("mpidr_el1"),
                IdAa64pfr0El1 => mrs!("id_aa64pfr0_el1"),
                IdAa64pfr1El1 => mrs!("id_aa64pfr1_el1"),
                IdAa64mmfr0El1 => mrs!("id_aa64mmfr0_el1"),
                IdAa64mmfr1El1 => mrs!("id_aa64mmfr1_el1"),
                IdAa64mmfr2El1 => mrs!("S3_0_C0_C7_2"),
                CtrEl0 => mrs!("ctr_el0"),
                IdAa64isar0El1 => mrs!("id_aa64isar0_el1"),
                IdAa64isar1El1 => mrs!("id_aa64isar1_el1"),
                SctlrEl3 => mrs!("sctlr_el3"),
                SctlrEl2 => mrs!("sctlr_el2"),
                SctlrEl1 => mrs!("sctlr_el1"),
                PmcrEl0 => mrs!("pmcr_el0"),
                IdAa64dfr0El1 => mrs!("id_aa64dfr0_el1"),
                IdAa64dfr1El1 => mrs!("id_aa64dfr1_el1"),
                CurrentEl => mrs!("CurrentEL"),
                MdcrEl2 => mrs!("mdcr_el2"),
                VbarEl2 => mrs!("vbar_el2"),
                CcsidrEl1 => mrs!("ccsidr_el1"),
                CsselrEl1 => mrs!("csselr_el1"),
                ClidrEl1 => mrs!("clidr_el1"),
                IdDfr0El1 => mrs!("S3_0_C0_C1_2"),
                IdIsar0El1 => mrs!("S3_0_C0_C2_0"),
                IdIsar1El1 => mrs!("S3_0_C0_C2_1"),
                IdIsar2El1 => mrs!("S3_0_C0_C2_2"),
                IdIsar3El1 => mrs!("S3_0_C0_C2_3"),
                IdIsar4El1 => mrs!("S3_0_C0_C2_4"),
                IdIsar5El1 => mrs!("S3_0_C0_C2_5"),
                IdMmfr0El1 => mrs!("S3_0_C0_C1_4"),
                IdMmfr1El1 => mrs!("S3_0_C0_C1_5"),
                IdMmfr2El1 => mrs!("S3_0_C0_C1_6"),
                IdMmfr3El1 => mrs!("S3_0_C0_C1_7"),
                IdMmfr4El1 => mrs!("S3_0_C0_C2_6"),
                IdPfr0El1 => mrs!("S3_0_C0_C1_0"),
                IdPfr1El1 => mrs!("S3_0_C0_C1_1"),
                MidrEl1 => mrs!("midr_el1"),
                Mvfr0El1 => mrs!("S3_0_C0_C3_0"),
                Mvfr1El1 => mrs!("S3_0_C0_C3_1"),
                Mvfr2El1 => mrs!("S3_0_C0_C3_2"),
                Pmceid0El0 => mrs!("pmceid0_el0"),
                Pmceid1El0 => mrs!("pmceid1_el0"),
                VmpidrEl2 => mrs!("vmpidr_el2"),
                VpidrEl2 => mrs!("vpidr_el2"),
                PmbidrEl1 => mrs!("S3_0_C9_C10_7"),
                PmsidrEl1 => mrs!("S3_0_C9_C9_7"),
                LoridEl1 => mrs!("S3_0_C10_C4_7"),
                ErridrEl1 => mrs!("S3_0_C5_C3_0"),
                Err0frEl1 => err_record_feature(0),
                Err1frEl1 => err_record_feature(1),
                Err2frEl1 => err_record_feature(2),
                Err3frEl1 => err_record_feature(3),
                EsrEl2 => mrs!("esr_el2"),
                FarEl2 => mrs!("far_el2"),
                Rdvl => rdvl(),
                IdAa64zfr0El1 => mrs!("S3_0_C0_C4_4"),
                MairElx | TcrElx | PmovssetEl0 | PmovsclrEl0 | PmintensetEl1
                | PmintenclrEl1 | PmsirrEl1 | PmscrEl2 | PmsfcrEl1 | PmbptrEl1
                | PmblimitrEl1 => return None,
            },
        };
        Some(value)
    }

    pub fn write(reg: PhysReg, value: u64) -> bool {
        use RegId::*;
        match reg {
            PhysReg::Direct(CsselrEl1) => msr!("csselr_el1", value),
            PhysReg::Direct(PmcrEl0) => msr!("pmcr_el0", value),
            PhysReg::Direct(PmovssetEl0) => msr!("pmovsset_el0", value),
            PhysReg::Direct(PmovsclrEl0) => msr!("pmovsclr_el0", value),
            PhysReg::Direct(PmintensetEl1) => msr!("pmintenset_el1", value),
            PhysReg::Direct(PmintenclrEl1) => msr!("pmintenclr_el1", value),
            PhysReg::Direct(MdcrEl2) => msr!("mdcr_el2", value),
            PhysReg::Direct(VbarEl2) => msr!("vbar_el2", value),
            PhysReg::Direct(PmsirrEl1) => msr!("S3_0_C9_C9_3", value),
            PhysReg::Direct(PmscrEl2) => msr!("S3_4_C9_C9_0", value),
            PhysReg::Direct(PmsfcrEl1) => msr!("S3_0_C9_C9_4", value),
            PhysReg::Direct(PmbptrEl1) => msr!("S3_0_C9_C10_1", value),
            PhysReg::Direct(PmblimitrEl1) => msr!("S3_0_C9_C10_0", value),
            PhysReg::MairEl1 => msr!("mair_el1", value),
            PhysReg::MairEl2 => msr!("mair_el2", value),
            PhysReg::TcrEl1 => msr!("tcr_el1", value),
            PhysReg::TcrEl2 => msr!("tcr_el2", value),
            _ => return false,
        }
        true
    }
}

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use access::{read, write};
