//! CSR address decoding and access legality.
//!
//! > The standard RISC-V ISA sets aside a 12-bit encoding space (csr\[11:0]) for up to 4,096 CSRs.
//! > By convention, the upper 4 bits of the CSR address (csr\[11:8]) are used to encode the read
//! > and write accessibility of the CSRs according to privilege level. The top two bits
//! > (csr\[11:10]) indicate whether the register is read/write (00, 01, or 10) or read-only (11).
//! > The next two bits (csr\[9:8]) encode the lowest privilege level that can access the CSR.

use crate::config::Config;
use crate::{PrivilegeLevel, RawPrivilegeLevel};
use thiserror::Error;

/// General 12-bit value representing a CSR specifier. Note that this can hold any 12-bit value,
/// even if the value represents an unsupported or non-existent CSR.
pub type CsrSpecifier = u16;

/// Specifiers for all CSRs known to this core.
pub mod specifier {
    use super::CsrSpecifier;
    use crate::RawPrivilegeLevel;

    //
    // Machine information registers (`0xF11..=0xF15`).
    //
    /// Vendor ID.
    pub const MVENDORID: CsrSpecifier = 0xF11;
    /// Architecture ID.
    pub const MARCHID: CsrSpecifier = 0xF12;
    /// Implementation ID.
    pub const MIMPID: CsrSpecifier = 0xF13;
    /// Hardware thread ID.
    pub const MHARTID: CsrSpecifier = 0xF14;
    /// Pointer to configuration data structure.
    pub const MCONFIGPTR: CsrSpecifier = 0xF15;

    //
    // Machine trap setup (`0x300..=0x306`, `0x310`).
    //
    /// Machine status register.
    pub const MSTATUS: CsrSpecifier = 0x300;
    /// ISA and extensions.
    pub const MISA: CsrSpecifier = 0x301;
    /// Machine interrupt-enable register.
    pub const MIE: CsrSpecifier = 0x304;
    /// Machine trap-handler base address.
    pub const MTVEC: CsrSpecifier = 0x305;
    /// Machine counter enable.
    pub const MCOUNTEREN: CsrSpecifier = 0x306;
    /// Additional machine status register, RV32 only.
    pub const MSTATUSH: CsrSpecifier = 0x310;

    //
    // Machine configuration (`0x30A`, `0x31A`, `0x747`, `0x757`).
    //
    /// Machine environment configuration register.
    pub const MENVCFG: CsrSpecifier = 0x30A;
    /// Upper 32 bits of [`MENVCFG`], RV32 only.
    pub const MENVCFGH: CsrSpecifier = 0x31A;
    /// Machine security configuration register.
    pub const MSECCFG: CsrSpecifier = 0x747;
    /// Upper 32 bits of [`MSECCFG`], RV32 only.
    pub const MSECCFGH: CsrSpecifier = 0x757;

    //
    // Machine counter setup (`0x320`, `0x323..=0x33F`).
    //
    /// Machine counter-inhibit register.
    pub const MCOUNTINHIBIT: CsrSpecifier = 0x320;
    /// First machine performance-monitoring event selector.
    pub const MHPMEVENT3: CsrSpecifier = 0x323;
    /// Last machine performance-monitoring event selector.
    pub const MHPMEVENT31: CsrSpecifier = 0x33F;

    //
    // Machine trap handling (`0x340..=0x344`).
    //
    /// Scratch register for machine trap handlers.
    pub const MSCRATCH: CsrSpecifier = 0x340;
    /// Machine exception program counter.
    pub const MEPC: CsrSpecifier = 0x341;
    /// Machine trap cause.
    pub const MCAUSE: CsrSpecifier = 0x342;
    /// Machine bad address or instruction.
    pub const MTVAL: CsrSpecifier = 0x343;
    /// Machine interrupt pending.
    pub const MIP: CsrSpecifier = 0x344;

    //
    // Resumable NMI shadow registers (`0x740..=0x744`).
    //
    /// Scratch register for the resumable NMI handler.
    pub const MNSCRATCH: CsrSpecifier = 0x740;
    /// Resumable NMI program counter.
    pub const MNEPC: CsrSpecifier = 0x741;
    /// Resumable NMI cause.
    pub const MNCAUSE: CsrSpecifier = 0x742;
    /// Resumable NMI status.
    pub const MNSTATUS: CsrSpecifier = 0x744;

    //
    // Machine memory protection (`0x3A0..=0x3EF`).
    //
    /// First physical memory protection configuration register.
    pub const PMPCFG0: CsrSpecifier = 0x3A0;
    /// Last physical memory protection configuration register, RV32 only.
    pub const PMPCFG15: CsrSpecifier = 0x3AF;
    /// First physical memory protection address register.
    pub const PMPADDR0: CsrSpecifier = 0x3B0;
    /// Last physical memory protection address register.
    pub const PMPADDR63: CsrSpecifier = 0x3EF;

    //
    // Machine counters/timers (`0xB00`, `0xB02..=0xB1F`, `0xB80`, `0xB82..=0xB9F`).
    //
    /// Machine cycle counter.
    pub const MCYCLE: CsrSpecifier = 0xB00;
    /// Machine instructions-retired counter.
    pub const MINSTRET: CsrSpecifier = 0xB02;
    /// Last machine performance-monitoring counter.
    pub const MHPMCOUNTER31: CsrSpecifier = 0xB1F;
    /// Upper 32 bits of [`MCYCLE`], RV32 only.
    pub const MCYCLEH: CsrSpecifier = 0xB80;
    /// Upper 32 bits of [`MINSTRET`], RV32 only.
    pub const MINSTRETH: CsrSpecifier = 0xB82;
    /// Upper 32 bits of [`MHPMCOUNTER31`], RV32 only.
    pub const MHPMCOUNTER31H: CsrSpecifier = 0xB9F;

    //
    // Unprivileged counters/timers (`0xC00..=0xC1F`, `0xC80..=0xC9F`).
    //
    /// Cycle counter for RDCYCLE instruction.
    pub const CYCLE: CsrSpecifier = 0xC00;
    /// Timer for RDTIME instruction. Not implemented by this core.
    pub const TIME: CsrSpecifier = 0xC01;
    /// Instructions-retired counter for RDINSTRET instruction.
    pub const INSTRET: CsrSpecifier = 0xC02;
    /// Last performance-monitoring counter.
    pub const HPMCOUNTER31: CsrSpecifier = 0xC1F;
    /// Upper 32 bits of [`CYCLE`], RV32 only.
    pub const CYCLEH: CsrSpecifier = 0xC80;
    /// Upper 32 bits of [`TIME`], RV32 only. Not implemented by this core.
    pub const TIMEH: CsrSpecifier = 0xC81;
    /// Upper 32 bits of [`HPMCOUNTER31`], RV32 only.
    pub const HPMCOUNTER31H: CsrSpecifier = 0xC9F;

    //
    // Debug/trace registers (`0x7A0..=0x7A4`, `0x7A8`, `0x7AA`).
    //
    /// Debug/trace trigger register select.
    pub const TSELECT: CsrSpecifier = 0x7A0;
    /// First debug/trace trigger data register.
    pub const TDATA1: CsrSpecifier = 0x7A1;
    /// Second debug/trace trigger data register.
    pub const TDATA2: CsrSpecifier = 0x7A2;
    /// Third debug/trace trigger data register.
    pub const TDATA3: CsrSpecifier = 0x7A3;
    /// Trigger info.
    pub const TINFO: CsrSpecifier = 0x7A4;
    /// Machine-mode context register.
    pub const MCONTEXT: CsrSpecifier = 0x7A8;
    /// Supervisor-mode context register.
    pub const SCONTEXT: CsrSpecifier = 0x7AA;

    //
    // Debug mode registers (`0x7B0..=0x7B3`).
    //
    /// Debug control and status register.
    pub const DCSR: CsrSpecifier = 0x7B0;
    /// Debug program counter.
    pub const DPC: CsrSpecifier = 0x7B1;
    /// Debug scratch register 0.
    pub const DSCRATCH0: CsrSpecifier = 0x7B2;
    /// Debug scratch register 1.
    pub const DSCRATCH1: CsrSpecifier = 0x7B3;

    /// Returns `true` if `specifier` is valid, which is the case if it fits in 12 bits.
    pub fn is_valid(specifier: CsrSpecifier) -> bool {
        specifier < 1 << 12
    }

    /// Returns `true` if this CSR only supports read access.
    ///
    /// Requires [`is_valid(specifier)`](is_valid), otherwise the return value is undefined.
    pub fn is_read_only(specifier: CsrSpecifier) -> bool {
        // The top two bits of a CSR specifier indicate whether the CSR is read-only (0b11) or
        // read/write (0b00, 0b01, 0b10)
        specifier >> 10 == 0b11
    }

    /// Returns the minimum required privilege level to access this CSR.
    ///
    /// Requires [`is_valid(specifier)`](is_valid), otherwise the return value is undefined.
    ///
    /// Note that this returns a [`RawPrivilegeLevel`], meaning the minimum required privilege level
    /// may be a level this core doesn't implement. This still has a defined meaning: only higher
    /// privilege levels are allowed to access the CSR.
    pub fn required_privilege_level(specifier: CsrSpecifier) -> RawPrivilegeLevel {
        // Bits `9:8` indicate the minimum required privilege level
        RawPrivilegeLevel::from_u2(((specifier >> 8) & 0b11) as u8)
    }
}

/// A decoded, implemented CSR.
///
/// Indexed variants carry the index encoded in the low bits of the address, e.g. `Pmpaddr(5)` for
/// `pmpaddr5` or `Mhpmcounter(2)` for `minstret`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Csr {
    Mvendorid,
    Marchid,
    Mimpid,
    Mhartid,
    Mconfigptr,
    Mstatus,
    Misa,
    Mie,
    Mtvec,
    Mcounteren,
    Mstatush,
    Menvcfg,
    Menvcfgh,
    Mcountinhibit,
    /// `mhpmevent3..=mhpmevent31`.
    Mhpmevent(u8),
    Mscratch,
    Mepc,
    Mcause,
    Mtval,
    Mip,
    Mnscratch,
    Mnepc,
    Mncause,
    Mnstatus,
    /// `pmpcfg0..=pmpcfg15`, each holding four entry configurations.
    Pmpcfg(u8),
    /// `pmpaddr0..=pmpaddr63`.
    Pmpaddr(u8),
    Mseccfg,
    Mseccfgh,
    /// Low half of `mcycle`, `minstret` or `mhpmcounterN`.
    Mhpmcounter(u8),
    /// High half of `mcycle`, `minstret` or `mhpmcounterN`.
    Mhpmcounterh(u8),
    /// Read-only low half shadow (`cycle`, `instret`, `hpmcounterN`).
    Hpmcounter(u8),
    /// Read-only high half shadow (`cycleh`, `instreth`, `hpmcounterNh`).
    Hpmcounterh(u8),
    Tselect,
    Tdata1,
    Tdata2,
    Tdata3,
    Tinfo,
    Mcontext,
    Scontext,
    Dcsr,
    Dpc,
    Dscratch0,
    Dscratch1,
}

/// Condition, besides privilege and read-only-ness, under which an existing CSR may be accessed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Gate {
    /// Always accessible.
    Open,
    /// Only accessible while the core is in debug mode.
    DebugMode,
    /// Only present if the core was configured with debug triggers.
    Triggers,
}

impl Csr {
    /// Map a CSR specifier to the register it addresses, or `None` if nothing is implemented at
    /// that address.
    pub fn decode(specifier: CsrSpecifier) -> Option<Self> {
        use specifier::*;
        let low5 = (specifier & 0x1F) as u8;
        let csr = match specifier {
            MVENDORID => Self::Mvendorid,
            MARCHID => Self::Marchid,
            MIMPID => Self::Mimpid,
            MHARTID => Self::Mhartid,
            MCONFIGPTR => Self::Mconfigptr,
            MSTATUS => Self::Mstatus,
            MISA => Self::Misa,
            MIE => Self::Mie,
            MTVEC => Self::Mtvec,
            MCOUNTEREN => Self::Mcounteren,
            MSTATUSH => Self::Mstatush,
            MENVCFG => Self::Menvcfg,
            MENVCFGH => Self::Menvcfgh,
            MCOUNTINHIBIT => Self::Mcountinhibit,
            MHPMEVENT3..=MHPMEVENT31 => Self::Mhpmevent(low5),
            MSCRATCH => Self::Mscratch,
            MEPC => Self::Mepc,
            MCAUSE => Self::Mcause,
            MTVAL => Self::Mtval,
            MIP => Self::Mip,
            MNSCRATCH => Self::Mnscratch,
            MNEPC => Self::Mnepc,
            MNCAUSE => Self::Mncause,
            MNSTATUS => Self::Mnstatus,
            PMPCFG0..=PMPCFG15 => Self::Pmpcfg((specifier - PMPCFG0) as u8),
            PMPADDR0..=PMPADDR63 => Self::Pmpaddr((specifier - PMPADDR0) as u8),
            MSECCFG => Self::Mseccfg,
            MSECCFGH => Self::Mseccfgh,
            // Slot 1 holds the memory-mapped real-time counter, which has no CSR on this core.
            TIME | TIMEH => return None,
            MCYCLE | MINSTRET..=MHPMCOUNTER31 => Self::Mhpmcounter(low5),
            MCYCLEH | MINSTRETH..=MHPMCOUNTER31H => Self::Mhpmcounterh(low5),
            CYCLE | INSTRET..=HPMCOUNTER31 => Self::Hpmcounter(low5),
            CYCLEH..=HPMCOUNTER31H => Self::Hpmcounterh(low5),
            TSELECT => Self::Tselect,
            TDATA1 => Self::Tdata1,
            TDATA2 => Self::Tdata2,
            TDATA3 => Self::Tdata3,
            TINFO => Self::Tinfo,
            MCONTEXT => Self::Mcontext,
            SCONTEXT => Self::Scontext,
            DCSR => Self::Dcsr,
            DPC => Self::Dpc,
            DSCRATCH0 => Self::Dscratch0,
            DSCRATCH1 => Self::Dscratch1,
            _ => return None,
        };
        Some(csr)
    }

    /// Returns the additional access condition of this register.
    pub fn gate(self) -> Gate {
        match self {
            Self::Dcsr | Self::Dpc | Self::Dscratch0 | Self::Dscratch1 => Gate::DebugMode,
            Self::Tselect
            | Self::Tdata1
            | Self::Tdata2
            | Self::Tdata3
            | Self::Tinfo
            | Self::Mcontext
            | Self::Scontext => Gate::Triggers,
            _ => Gate::Open,
        }
    }
}

/// Description of a single CSR access attempt, as presented by the decode stage.
#[derive(Debug, Copy, Clone)]
pub struct Access {
    pub specifier: CsrSpecifier,
    /// Whether the operation modifies the register (write, set or clear).
    pub writes: bool,
    pub privilege_level: PrivilegeLevel,
    pub debug_mode: bool,
}

/// Decode `access` and check that it is legal, returning the addressed register.
///
/// This is the single place where access legality is decided. Nothing is ever committed for an
/// access that fails here.
pub fn check_access(access: &Access, config: &Config) -> Result<Csr, AccessError> {
    let specifier = access.specifier;
    if !specifier::is_valid(specifier) {
        return Err(AccessError::CsrUnsupported(specifier));
    }
    let csr = Csr::decode(specifier).ok_or(AccessError::CsrUnsupported(specifier))?;
    let required_level = specifier::required_privilege_level(specifier);
    if access.privilege_level < required_level {
        return Err(AccessError::Privileged {
            specifier,
            required_level,
            actual_level: access.privilege_level,
        });
    }
    if access.writes && specifier::is_read_only(specifier) {
        return Err(AccessError::WriteToReadOnly(specifier));
    }
    match csr.gate() {
        Gate::Open => {}
        Gate::DebugMode if !access.debug_mode => {
            return Err(AccessError::DebugModeOnly(specifier));
        }
        Gate::DebugMode => {}
        Gate::Triggers if !config.triggers_enabled() => {
            return Err(AccessError::TriggersDisabled(specifier));
        }
        Gate::Triggers => {}
    }
    Ok(csr)
}

/// Reasons why a CSR access is illegal.
///
/// All of these surface identically to the pipeline, as an illegal instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("unsupported CSR: {0:#05X}")]
    CsrUnsupported(CsrSpecifier),
    /// Attempt to access a CSR that requires a higher privilege level.
    #[error(
        "cannot access specifier {specifier:#05X} from privilege level {actual_level}, \
             since it requires privilege level {required_level}"
    )]
    Privileged {
        /// The CSR for which access was requested.
        specifier: CsrSpecifier,
        /// The minimum required privilege level to access that CSR.
        required_level: RawPrivilegeLevel,
        /// The actual privilege level from which the access was performed.
        actual_level: PrivilegeLevel,
    },
    /// Attempt to modify a read-only register.
    #[error("writing to read-only CSR {0:#05X} is invalid")]
    WriteToReadOnly(CsrSpecifier),
    #[error("CSR {0:#05X} is only accessible in debug mode")]
    DebugModeOnly(CsrSpecifier),
    #[error("CSR {0:#05X} requires debug triggers, which are not implemented")]
    TriggersDisabled(CsrSpecifier),
}
