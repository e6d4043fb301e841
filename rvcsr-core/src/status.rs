use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::{PrivilegeLevel, RawPrivilegeLevel};

/// Status register, used for both `mstatus` and its resumable NMI shadow `mnstatus`.
///
/// > The mstatus register is an MXLEN-bit read/write register [...]. The mstatus register keeps
/// > track of and controls the hart’s current operating state.
///
/// Only the fields meaningful on a Machine/User core without floating point or virtual memory are
/// implemented: MIE, MPIE, MPP, MPRV and TW. All other bits read as zero and ignore writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status(u32);

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// Mask of all fields that hold state.
    pub const WRITABLE_MASK: u32 = (1 << idx::MIE)
        | (1 << idx::MPIE)
        | (0b11 << idx::MPP)
        | (1 << idx::MPRV)
        | (1 << idx::TW);

    /// Reset value: interrupts disabled, MPP = Machine.
    pub fn new() -> Self {
        let mut status = Self(0);
        status.set_mpp(PrivilegeLevel::Machine);
        status
    }

    /// Returns the raw register value.
    pub fn read(&self) -> u32 {
        self.0
    }

    /// Update all fields from `value`, ignoring bits that are not implemented.
    ///
    /// MPP is **WARL**: any encoding other than User or Machine is stored as Machine.
    pub fn write(&mut self, value: u32) {
        let bits = value.view_bits::<Lsb0>();
        self.set_mie(bits[idx::MIE]);
        self.set_mpie(bits[idx::MPIE]);
        self.set_mpp_raw(RawPrivilegeLevel::from_u2(
            bits[idx::MPP..(idx::MPP + 2)].load_le(),
        ));
        self.set_mprv(bits[idx::MPRV]);
        self.set_tw(bits[idx::TW]);
    }

    /// Returns `true` if the MIE (M-mode Interrupt Enable) bit is set.
    pub fn mie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MIE]
    }

    /// Sets the MIE (M-mode Interrupt Enable) bit to `value`.
    pub fn set_mie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MIE, value);
    }

    /// Returns `true` if the MPIE (M-mode Previous Interrupt Enable) bit is set.
    pub fn mpie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MPIE]
    }

    /// Sets the MPIE (M-mode Previous Interrupt Enable) bit to `value`.
    pub fn set_mpie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MPIE, value);
    }

    /// Returns the privilege level encoded by the MPP (M-mode Previous Privilege level) field.
    pub fn mpp(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_u2_warl(self.0.view_bits::<Lsb0>()[idx::MPP..(idx::MPP + 2)].load_le())
    }

    /// Sets the MPP (M-mode Previous Privilege level) field to `value`.
    pub fn set_mpp(&mut self, value: PrivilegeLevel) {
        self.0.view_bits_mut::<Lsb0>()[idx::MPP..(idx::MPP + 2)].store_le(value.to_u2());
    }

    /// Sets the MPP field from a raw encoding, coercing unimplemented levels to Machine.
    pub fn set_mpp_raw(&mut self, value: RawPrivilegeLevel) {
        self.set_mpp(PrivilegeLevel::try_from(value).unwrap_or(PrivilegeLevel::Machine));
    }

    /// Returns `true` if the MPRV (Modify PRiVilege) bit is set.
    pub fn mprv(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::MPRV]
    }

    /// Sets the MPRV (Modify PRiVilege) bit to `value`.
    pub fn set_mprv(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::MPRV, value);
    }

    /// Returns `true` if the TW (Timeout Wait) bit is set.
    pub fn tw(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::TW]
    }

    /// Sets the TW (Timeout Wait) bit to `value`.
    pub fn set_tw(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::TW, value)
    }
}

/// Bit indices into the status register.
mod idx {
    pub const MIE: usize = 3;
    pub const MPIE: usize = 7;
    pub const MPP: usize = 11;
    pub const MPRV: usize = 17;
    pub const TW: usize = 21;
}
