//! Debug mode registers (`dcsr`, `dpc`, `dscratch0`, `dscratch1`).
//!
//! These are only accessible while the core is in debug mode.

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::{PrivilegeLevel, RawPrivilegeLevel};

/// Version of the external debug support implemented (`4`: RISC-V External Debug Support 0.13.2).
pub const XDEBUGVER: u8 = 4;

/// Reason for entering debug mode, as recorded in `dcsr.cause`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DebugCause {
    #[default]
    None = 0,
    /// An `ebreak` instruction was executed.
    Ebreak = 1,
    /// A trigger fired.
    Trigger = 2,
    /// The debugger requested a halt.
    HaltRequest = 3,
    /// The hart single stepped.
    Step = 4,
    /// The hart halted directly out of reset.
    ResetHaltRequest = 5,
}

impl DebugCause {
    /// Convert a 3-bit value into a [`DebugCause`]. Reserved encodings map to `None`.
    pub fn from_u3(value_u3: u8) -> Self {
        match value_u3 & 0b111 {
            1 => Self::Ebreak,
            2 => Self::Trigger,
            3 => Self::HaltRequest,
            4 => Self::Step,
            5 => Self::ResetHaltRequest,
            _ => Self::None,
        }
    }
}

/// Debug control and status register.
///
/// Software can only change `prv`, `step`, `ebreaku` and `ebreakm`. `xdebugver` is pinned, `cause`
/// is only updated by the hardware on debug entry, and every other field is hardwired to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dcsr(u32);

impl Default for Dcsr {
    fn default() -> Self {
        Self::new()
    }
}

impl Dcsr {
    pub fn new() -> Self {
        let mut dcsr = Self(0);
        dcsr.bits_mut()[idx::XDEBUGVER..(idx::XDEBUGVER + 4)].store_le(XDEBUGVER);
        dcsr.set_prv(PrivilegeLevel::Machine);
        dcsr
    }

    fn bits_mut(&mut self) -> &mut bitvec::slice::BitSlice<u32, Lsb0> {
        self.0.view_bits_mut::<Lsb0>()
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    /// Software write. Only the writable fields are taken from `value`.
    pub fn write(&mut self, value: u32) {
        let bits = value.view_bits::<Lsb0>();
        self.set_prv_raw(RawPrivilegeLevel::from_u2(bits[idx::PRV..(idx::PRV + 2)].load_le()));
        self.set_step(bits[idx::STEP]);
        self.bits_mut().set(idx::EBREAKU, bits[idx::EBREAKU]);
        self.bits_mut().set(idx::EBREAKM, bits[idx::EBREAKM]);
    }

    /// Privilege level the hart was running in when it entered debug mode, and the level it will
    /// return to on `dret`.
    pub fn prv(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_u2_warl(self.0.view_bits::<Lsb0>()[idx::PRV..(idx::PRV + 2)].load_le())
    }

    pub fn set_prv(&mut self, value: PrivilegeLevel) {
        self.bits_mut()[idx::PRV..(idx::PRV + 2)].store_le(value.to_u2());
    }

    /// The prv field is **WARL**, with the same legal values as `mstatus.MPP`.
    pub fn set_prv_raw(&mut self, value: RawPrivilegeLevel) {
        self.set_prv(PrivilegeLevel::try_from(value).unwrap_or(PrivilegeLevel::Machine));
    }

    pub fn cause(&self) -> DebugCause {
        DebugCause::from_u3(self.0.view_bits::<Lsb0>()[idx::CAUSE..(idx::CAUSE + 3)].load_le())
    }

    pub fn set_cause(&mut self, cause: DebugCause) {
        self.bits_mut()[idx::CAUSE..(idx::CAUSE + 3)].store_le(cause as u8);
    }

    /// Single step: execute one instruction, then re-enter debug mode.
    pub fn step(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::STEP]
    }

    pub fn set_step(&mut self, value: bool) {
        self.bits_mut().set(idx::STEP, value);
    }

    /// `ebreak` in M-mode enters debug mode instead of trapping.
    pub fn ebreakm(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::EBREAKM]
    }

    /// `ebreak` in U-mode enters debug mode instead of trapping.
    pub fn ebreaku(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::EBREAKU]
    }
}

/// Bit indices into dcsr.
mod idx {
    pub const PRV: usize = 0;
    pub const STEP: usize = 2;
    pub const CAUSE: usize = 6;
    pub const EBREAKU: usize = 12;
    pub const EBREAKM: usize = 15;
    pub const XDEBUGVER: usize = 28;
}

/// All debug mode registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugRegisters {
    pub dcsr: Dcsr,
    dpc: u32,
    pub dscratch0: u32,
    pub dscratch1: u32,
}

impl DebugRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_dpc(&self) -> u32 {
        self.dpc
    }

    /// dpc holds halfword-aligned addresses; bit 0 is hardwired to zero.
    pub fn write_dpc(&mut self, value: u32) {
        self.dpc = value & !0b1;
    }
}
