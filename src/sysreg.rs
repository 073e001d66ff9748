//! Register Access Layer
//!
//! Tests name registers with [`RegId`], a closed set of architectural
//! registers. Two of them, `MairElx` and `TcrElx`, have no fixed encoding:
//! they resolve to the EL1 or EL2 register from CurrentEL at the time of
//! the call. Everything else maps one to one onto a physical register.
//!
//! The functions here return `Result`; the status-recording wrappers that
//! turn an error into FAIL sub-code `0x78` live on `suite::Runtime`.

use crate::arch::aarch64::defs::*;
use crate::arch::aarch64::sysreg::PhysReg;
use crate::arch::SysRegAccess;
use crate::error::AvsError;
use crate::status::AvsStatus;

/// Named architectural registers visible to test payloads.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegId {
    MpidrEl1 = 1,
    IdAa64pfr0El1,
    IdAa64pfr1El1,
    IdAa64mmfr0El1,
    IdAa64mmfr1El1,
    IdAa64mmfr2El1,
    CtrEl0,
    IdAa64isar0El1,
    IdAa64isar1El1,
    SctlrEl3,
    SctlrEl2,
    SctlrEl1,
    PmcrEl0,
    IdAa64dfr0El1,
    IdAa64dfr1El1,
    CurrentEl,
    MdcrEl2,
    VbarEl2,
    CcsidrEl1,
    CsselrEl1,
    ClidrEl1,
    IdDfr0El1,
    IdIsar0El1,
    IdIsar1El1,
    IdIsar2El1,
    IdIsar3El1,
    IdIsar4El1,
    IdIsar5El1,
    IdMmfr0El1,
    IdMmfr1El1,
    IdMmfr2El1,
    IdMmfr3El1,
    IdMmfr4El1,
    IdPfr0El1,
    IdPfr1El1,
    MidrEl1,
    Mvfr0El1,
    Mvfr1El1,
    Mvfr2El1,
    Pmceid0El0,
    Pmceid1El0,
    VmpidrEl2,
    VpidrEl2,
    PmbidrEl1,
    PmsidrEl1,
    LoridEl1,
    ErridrEl1,
    Err0frEl1,
    Err1frEl1,
    Err2frEl1,
    Err3frEl1,
    EsrEl2,
    FarEl2,
    /// Vector length in bytes, as returned by `RDVL #1`.
    Rdvl,
    /// MAIR_EL1 or MAIR_EL2 depending on CurrentEL.
    MairElx,
    /// TCR_EL1 or TCR_EL2 depending on CurrentEL.
    TcrElx,
    IdAa64zfr0El1,
    PmovssetEl0,
    PmovsclrEl0,
    PmintensetEl1,
    PmintenclrEl1,
    PmsirrEl1,
    PmscrEl2,
    PmsfcrEl1,
    PmbptrEl1,
    PmblimitrEl1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub const fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub const fn writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl RegId {
    const ALL: [RegId; 66] = {
        use RegId::*;
        [
            MpidrEl1, IdAa64pfr0El1, IdAa64pfr1El1, IdAa64mmfr0El1, IdAa64mmfr1El1,
            IdAa64mmfr2El1, CtrEl0, IdAa64isar0El1, IdAa64isar1El1, SctlrEl3, SctlrEl2,
            SctlrEl1, PmcrEl0, IdAa64dfr0El1, IdAa64dfr1El1, CurrentEl, MdcrEl2, VbarEl2,
            CcsidrEl1, CsselrEl1, ClidrEl1, IdDfr0El1, IdIsar0El1, IdIsar1El1, IdIsar2El1,
            IdIsar3El1, IdIsar4El1, IdIsar5El1, IdMmfr0El1, IdMmfr1El1, IdMmfr2El1,
            IdMmfr3El1, IdMmfr4El1, IdPfr0El1, IdPfr1El1, MidrEl1, Mvfr0El1, Mvfr1El1,
            Mvfr2El1, Pmceid0El0, Pmceid1El0, VmpidrEl2, VpidrEl2, PmbidrEl1, PmsidrEl1,
            LoridEl1, ErridrEl1, Err0frEl1, Err1frEl1, Err2frEl1, Err3frEl1, EsrEl2, FarEl2,
            Rdvl, MairElx, TcrElx, IdAa64zfr0El1, PmovssetEl0, PmovsclrEl0, PmintensetEl1,
            PmintenclrEl1, PmsirrEl1, PmscrEl2, PmsfcrEl1, PmbptrEl1, PmblimitrEl1,
        ]
    };

    pub const fn access(self) -> Access {
        use RegId::*;
        match self {
            PmcrEl0 | MdcrEl2 | VbarEl2 | CsselrEl1 => Access::ReadWrite,
            PmovssetEl0 | PmovsclrEl0 | PmintensetEl1 | PmintenclrEl1 | PmsirrEl1
            | PmscrEl2 | PmsfcrEl1 | PmbptrEl1 | PmblimitrEl1 => Access::Write,
            _ => Access::Read,
        }
    }
}

impl TryFrom<u32> for RegId {
    type Error = AvsError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| *id as u32 == raw)
            .ok_or(AvsError::UnknownRegister(raw))
    }
}

/// Bits `start..=end` of `value`, shifted down.
pub const fn extract_bits(value: u64, start: u32, end: u32) -> u64 {
    let width = end - start + 1;
    if width >= 64 {
        value >> start
    } else {
        (value >> start) & ((1u64 << width) - 1)
    }
}

pub const fn field(value: u64, f: Field) -> u64 {
    extract_bits(value, f.0, f.1)
}

/// Current exception level, 0..=3.
pub fn current_el<H: SysRegAccess + ?Sized>(hw: &H) -> Result<u8, AvsError> {
    hw.read_sysreg(PhysReg::Direct(RegId::CurrentEl))
        .map(|v| ((v >> CURRENT_EL_SHIFT) & CURRENT_EL_MASK) as u8)
        .ok_or(AvsError::RegisterAccess(RegId::CurrentEl))
}

fn resolve<H: SysRegAccess + ?Sized>(hw: &H, id: RegId) -> Result<PhysReg, AvsError> {
    let phys = match id {
        RegId::MairElx => match current_el(hw)? {
            1 => PhysReg::MairEl1,
            2 => PhysReg::MairEl2,
            el => return Err(AvsError::UnsupportedEl(el)),
        },
        RegId::TcrElx => match current_el(hw)? {
            1 => PhysReg::TcrEl1,
            2 => PhysReg::TcrEl2,
            el => return Err(AvsError::UnsupportedEl(el)),
        },
        other => PhysReg::Direct(other),
    };
    Ok(phys)
}

pub fn read<H: SysRegAccess + ?Sized>(hw: &H, id: RegId) -> Result<u64, AvsError> {
    if !id.access().readable() {
        return Err(AvsError::RegisterAccess(id));
    }
    let phys = resolve(hw, id)?;
    hw.read_sysreg(phys).ok_or(AvsError::RegisterAccess(id))
}

pub fn write<H: SysRegAccess + ?Sized>(hw: &H, id: RegId, value: u64) -> Result<(), AvsError> {
    if !id.access().writable() {
        return Err(AvsError::RegisterAccess(id));
    }
    let phys = resolve(hw, id)?;
    if hw.write_sysreg(phys, value) {
        Ok(())
    } else {
        Err(AvsError::RegisterAccess(id))
    }
}

pub fn is_el2_enabled<H: SysRegAccess + ?Sized>(hw: &H) -> Result<bool, AvsError> {
    Ok(field(read(hw, RegId::IdAa64pfr0El1)?, PFR0_EL2) != 0)
}

pub fn is_el3_enabled<H: SysRegAccess + ?Sized>(hw: &H) -> Result<bool, AvsError> {
    Ok(field(read(hw, RegId::IdAa64pfr0El1)?, PFR0_EL3) != 0)
}

/// Translation control fields for one translation table base register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcrFields {
    /// Physical address size (IPS, or PS for EL2 without E2H).
    pub ps: u8,
    /// Raw granule field (TG0 or TG1).
    pub tg: u8,
    /// log2 of the granule size in bytes.
    pub granule_shift: u8,
    pub sh: u8,
    pub orgn: u8,
    pub irgn: u8,
    pub tsz: u8,
}

fn hcr_e2h<H: SysRegAccess + ?Sized>(hw: &H) -> bool {
    hw.read_sysreg(PhysReg::HcrEl2)
        .map_or(false, |hcr| hcr & HCR_E2H != 0)
}

/// Decodes the TCR fields that govern TTBR0 (`ttbr1 == false`) or TTBR1.
///
/// At EL1, and at EL2 with HCR_EL2.E2H set, TCR has the EL1 layout. At EL2
/// without E2H there is no TTBR1 and the physical size lives in PS.
pub fn read_tcr<H: SysRegAccess + ?Sized>(hw: &H, ttbr1: bool) -> Result<TcrFields, AvsError> {
    let el = current_el(hw)?;
    if el != 1 && el != 2 {
        return Err(AvsError::UnsupportedEl(el));
    }
    let tcr = read(hw, RegId::TcrElx)?;
    let el1_layout = el == 1 || hcr_e2h(hw);

    if el1_layout && ttbr1 {
        let tg = field(tcr, TCR_TG1) as u8;
        if tg == 0 || tg > 3 {
            return Err(AvsError::ReservedGranule(tg));
        }
        return Ok(TcrFields {
            ps: field(tcr, TCR_IPS) as u8,
            tg,
            granule_shift: TG1_GRANULE_SHIFT[tg as usize],
            sh: field(tcr, TCR_SH1) as u8,
            orgn: field(tcr, TCR_ORGN1) as u8,
            irgn: field(tcr, TCR_IRGN1) as u8,
            tsz: field(tcr, TCR_T1SZ) as u8,
        });
    }
    if ttbr1 {
        return Err(AvsError::Ttbr1Unsupported);
    }

    let ps = if el1_layout {
        field(tcr, TCR_IPS)
    } else {
        field(tcr, TCR_EL2_PS)
    } as u8;
    let tg = field(tcr, TCR_TG0) as u8;
    if tg > 2 {
        return Err(AvsError::ReservedGranule(tg));
    }
    Ok(TcrFields {
        ps,
        tg,
        granule_shift: TG0_GRANULE_SHIFT[tg as usize],
        sh: field(tcr, TCR_SH0) as u8,
        orgn: field(tcr, TCR_ORGN0) as u8,
        irgn: field(tcr, TCR_IRGN0) as u8,
        tsz: field(tcr, TCR_T0SZ) as u8,
    })
}

/// TTBR0_ELx or TTBR1_ELx at the current exception level.
pub fn read_ttbr<H: SysRegAccess + ?Sized>(hw: &H, ttbr1: bool) -> Result<u64, AvsError> {
    let phys = match (current_el(hw)?, ttbr1) {
        (1, false) => PhysReg::Ttbr0El1,
        (1, true) => PhysReg::Ttbr1El1,
        (2, false) => PhysReg::Ttbr0El2,
        (2, true) => PhysReg::Ttbr1El2,
        (el, _) => return Err(AvsError::UnsupportedEl(el)),
    };
    hw.read_sysreg(phys).ok_or(AvsError::TtbrUnavailable { ttbr1 })
}

/// Optional PE features a module depends on.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeFeature {
    Mpam = 1,
    Pmu = 2,
    Ras = 3,
}

impl TryFrom<u32> for PeFeature {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, u32> {
        match raw {
            1 => Ok(Self::Mpam),
            2 => Ok(Self::Pmu),
            3 => Ok(Self::Ras),
            other => Err(other),
        }
    }
}

/// PASS when this PE implements `feature`, FAIL otherwise.
pub fn feat_check<H: SysRegAccess + ?Sized>(hw: &H, feature: PeFeature) -> AvsStatus {
    let present = match feature {
        PeFeature::Mpam => {
            let major = read(hw, RegId::IdAa64pfr0El1).map(|v| field(v, PFR0_MPAM));
            let minor = read(hw, RegId::IdAa64pfr1El1).map(|v| field(v, PFR1_MPAM_FRAC));
            matches!(major, Ok(v) if v > 0) || matches!(minor, Ok(v) if v > 0)
        }
        PeFeature::Pmu => matches!(
            read(hw, RegId::IdAa64dfr0El1).map(|v| field(v, DFR0_PMUVER)),
            Ok(v) if v != 0 && v != PMUVER_IMP_DEF
        ),
        PeFeature::Ras => matches!(
            read(hw, RegId::IdAa64pfr0El1).map(|v| field(v, PFR0_RAS)),
            Ok(v) if v != 0
        ),
    };
    if present {
        AvsStatus::Pass
    } else {
        AvsStatus::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bits_ranges() {
        assert_eq!(extract_bits(0xABCD, 4, 7), 0xC);
        assert_eq!(extract_bits(u64::MAX, 0, 63), u64::MAX);
        assert_eq!(field(0x0000_1100, PFR0_EL2), 1);
        assert_eq!(field(0x0000_1100, PFR0_EL3), 1);
    }

    #[test]
    fn raw_ids_round_trip_and_reject_unknown() {
        for id in RegId::ALL {
            assert_eq!(RegId::try_from(id as u32), Ok(id));
        }
        assert_eq!(RegId::try_from(0), Err(AvsError::UnknownRegister(0)));
        assert_eq!(RegId::try_from(0x1000), Err(AvsError::UnknownRegister(0x1000)));
    }

    #[test]
    fn direction_table() {
        assert!(RegId::PmcrEl0.access().readable());
        assert!(RegId::PmcrEl0.access().writable());
        assert!(!RegId::PmbptrEl1.access().readable());
        assert!(!RegId::MidrEl1.access().writable());
    }
}
