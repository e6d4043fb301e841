//! Debug trigger module: a bank of instruction address match triggers.
//!
//! Only the `mcontrol` trigger type with an execute match is supported. A trigger fires when the
//! address of the instruction being fetched equals its `tdata2` and its execute bit is set; the
//! action is always to enter debug mode.

use bitvec::{field::BitField, order::Lsb0, view::BitView};
use log::debug;

/// `tdata1.type` of an address/data match trigger.
const TYPE_MCONTROL: u8 = 2;
/// `tdata1.action`: enter debug mode.
const ACTION_DEBUG_MODE: u8 = 1;

/// Bit indices into `tdata1` when holding an `mcontrol` trigger.
mod idx {
    pub const EXECUTE: usize = 2;
    pub const U: usize = 3;
    pub const M: usize = 6;
    pub const ACTION: usize = 12;
    pub const DMODE: usize = 27;
    pub const TYPE: usize = 28;
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    /// The execute bit of `tdata1`.
    pub enabled: bool,
    /// `tdata2`: the instruction address to match.
    pub address: u32,
}

impl Trigger {
    pub fn matches(&self, pc: u32) -> bool {
        self.enabled && self.address == pc
    }

    /// The `tdata1` view of this trigger. Everything except the execute bit is constant.
    pub fn read_tdata1(&self) -> u32 {
        let mut value = 0u32;
        let bits = value.view_bits_mut::<Lsb0>();
        bits[idx::TYPE..(idx::TYPE + 4)].store_le(TYPE_MCONTROL);
        bits.set(idx::DMODE, true);
        bits[idx::ACTION..(idx::ACTION + 4)].store_le(ACTION_DEBUG_MODE);
        bits.set(idx::M, true);
        bits.set(idx::U, true);
        bits.set(idx::EXECUTE, self.enabled);
        value
    }
}

/// Trigger select register and the trigger bank behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triggers {
    tselect: u8,
    triggers: Vec<Trigger>,
}

impl Triggers {
    pub fn new(count: u8) -> Self {
        Self {
            tselect: 0,
            triggers: vec![Trigger::default(); count as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Trigger> {
        self.triggers.get(i)
    }

    pub fn read_tselect(&self) -> u32 {
        self.tselect as u32
    }

    /// The tselect register is **WARL**: values past the last trigger select the last trigger.
    pub fn write_tselect(&mut self, value: u32) {
        let last = self.triggers.len().saturating_sub(1) as u32;
        self.tselect = value.min(last) as u8;
    }

    fn selected(&self) -> Option<&Trigger> {
        self.triggers.get(self.tselect as usize)
    }

    fn selected_mut(&mut self) -> Option<&mut Trigger> {
        self.triggers.get_mut(self.tselect as usize)
    }

    pub fn read_tdata1(&self) -> u32 {
        self.selected().map_or(0, Trigger::read_tdata1)
    }

    pub fn read_tdata2(&self) -> u32 {
        self.selected().map_or(0, |trigger| trigger.address)
    }

    /// Only `dmode` triggers are implemented, so writes from outside debug mode are ignored.
    pub fn write_tdata1(&mut self, value: u32, debug_mode: bool) {
        if !debug_mode {
            debug!("Ignoring tdata1 write of {value:#010x} outside debug mode");
            return;
        }
        if let Some(trigger) = self.selected_mut() {
            trigger.enabled = value.view_bits::<Lsb0>()[idx::EXECUTE];
        }
    }

    /// See [`write_tdata1`](Self::write_tdata1).
    pub fn write_tdata2(&mut self, value: u32, debug_mode: bool) {
        if !debug_mode {
            debug!("Ignoring tdata2 write of {value:#010x} outside debug mode");
            return;
        }
        if let Some(trigger) = self.selected_mut() {
            trigger.address = value;
        }
    }

    /// The trigger types supported by every trigger: only `mcontrol`.
    pub fn read_tinfo(&self) -> u32 {
        1 << TYPE_MCONTROL
    }

    /// Returns `true` if any trigger matches the instruction fetched from `pc`.
    pub fn matches(&self, pc: u32) -> bool {
        self.triggers.iter().any(|trigger| trigger.matches(pc))
    }
}
