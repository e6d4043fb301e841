//! Control and Status Register unit of a small RV32 core with Machine and User privilege levels.
//!
//! The unit is modelled as a synchronous component: every cycle the pipeline presents a set of
//! [`CycleInputs`](unit::CycleInputs), the unit combinationally derives its
//! [`CycleOutputs`](unit::CycleOutputs), and at the clock edge the pending state becomes the
//! current state. See [`CsrUnit`](unit::CsrUnit).

#[macro_use]
extern crate static_assertions;

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

pub mod config;
pub mod controller;
pub mod counters;
pub mod csr;
pub mod debug;
pub mod interrupts;
pub mod pmp;
pub mod status;
pub mod trap;
pub mod trigger;
pub mod unit;

pub use config::Config;
pub use controller::{ControlEvent, PcSource};
pub use unit::{CsrOp, CsrUnit, CycleInputs, CycleOutputs};

/// List of all possible 2-bit privilege level encodings for RISC-V.
///
/// Same as [`PrivilegeLevel`] except that it can represent the encodings this core does not
/// implement. A required privilege level encoded in a CSR address or a value written into an
/// `xPP` field may be any of these.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum RawPrivilegeLevel {
    User = 0,
    /// Not implemented by this core.
    Supervisor = 1,
    /// Privilege level `0b10` is reserved in the base ISA.
    Reserved = 2,
    Machine = 3,
}

impl RawPrivilegeLevel {
    /// Convert a 2-bit value into a [`RawPrivilegeLevel`].
    /// Only the two least significant bits of `value_u2` are considered.
    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 & 0b11 {
            0 => Self::User,
            1 => Self::Supervisor,
            2 => Self::Reserved,
            _ => Self::Machine,
        }
    }

    pub fn is_implemented(self) -> bool {
        matches!(self, Self::User | Self::Machine)
    }
}

impl fmt::Display for RawPrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            RawPrivilegeLevel::User => "U",
            RawPrivilegeLevel::Supervisor => "S",
            RawPrivilegeLevel::Reserved => "2",
            RawPrivilegeLevel::Machine => "M",
        })
    }
}

/// Privilege levels implemented by this core.
///
/// > The machine level has the highest privileges and is the only mandatory privilege level for a
/// > RISC-V hardware platform. Code run in machine-mode (M-mode) is usually inherently trusted, as
/// > it has low-level access to the machine implementation.
///
/// Supervisor mode is not supported, so every `xPP` field can only ever hold one of these two
/// levels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub enum PrivilegeLevel {
    /// User/application (abbreviated `U`) is the lowest privilege level.
    User = 0,
    /// Machine (abbreviated `M`) is the highest privilege level, and the reset level.
    #[default]
    Machine = 3,
}

impl PrivilegeLevel {
    /// Decode a WARL `xPP`-style field: any encoding other than User is coerced to Machine.
    pub fn from_u2_warl(value_u2: u8) -> Self {
        PrivilegeLevel::try_from(RawPrivilegeLevel::from_u2(value_u2)).unwrap_or(Self::Machine)
    }

    /// The 2-bit encoding of this privilege level.
    pub fn to_u2(self) -> u8 {
        self as u8
    }
}

impl PartialEq<PrivilegeLevel> for RawPrivilegeLevel {
    fn eq(&self, other: &PrivilegeLevel) -> bool {
        *self as usize == *other as usize
    }
}

impl PartialEq<RawPrivilegeLevel> for PrivilegeLevel {
    fn eq(&self, other: &RawPrivilegeLevel) -> bool {
        *self as usize == *other as usize
    }
}

impl PartialOrd<PrivilegeLevel> for RawPrivilegeLevel {
    fn partial_cmp(&self, other: &PrivilegeLevel) -> Option<Ordering> {
        (*self as usize).partial_cmp(&(*other as usize))
    }
}

impl PartialOrd<RawPrivilegeLevel> for PrivilegeLevel {
    fn partial_cmp(&self, other: &RawPrivilegeLevel) -> Option<Ordering> {
        (*self as usize).partial_cmp(&(*other as usize))
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            PrivilegeLevel::User => "U",
            PrivilegeLevel::Machine => "M",
        })
    }
}

impl From<PrivilegeLevel> for RawPrivilegeLevel {
    fn from(value: PrivilegeLevel) -> Self {
        match value {
            PrivilegeLevel::User => Self::User,
            PrivilegeLevel::Machine => Self::Machine,
        }
    }
}

impl TryFrom<RawPrivilegeLevel> for PrivilegeLevel {
    type Error = ReservedPrivilegeLevelError;
    fn try_from(value: RawPrivilegeLevel) -> Result<Self, Self::Error> {
        match value {
            RawPrivilegeLevel::User => Ok(Self::User),
            RawPrivilegeLevel::Machine => Ok(Self::Machine),
            RawPrivilegeLevel::Supervisor | RawPrivilegeLevel::Reserved => {
                Err(ReservedPrivilegeLevelError(value))
            }
        }
    }
}

#[derive(Error, Debug)]
#[error("privilege level {0} is not implemented")]
pub struct ReservedPrivilegeLevelError(RawPrivilegeLevel);
