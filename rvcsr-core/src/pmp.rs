//! Physical memory protection registers.
//!
//! This module only stores the configuration: the permission checks that consume it live outside
//! the CSR unit. The external checker reads [`Pmp::entries`] and [`Pmp::mseccfg`] and evaluates the
//! entries in ascending index order.

use bitvec::{field::BitField, order::Lsb0, view::BitView};
use log::warn;

/// Address-matching mode of a PMP entry (`A` field).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PmpMode {
    /// Null region (disabled).
    #[default]
    Off = 0,
    /// Top of range: the region spans from the previous entry's address up to this entry's.
    Tor = 1,
    /// Naturally aligned four-byte region.
    Na4 = 2,
    /// Naturally aligned power-of-two region, at least eight bytes.
    Napot = 3,
}

impl PmpMode {
    /// Convert a 2-bit value into a [`PmpMode`].
    /// Only the two least significant bits of `value_u2` are considered.
    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 & 0b11 {
            0 => Self::Off,
            1 => Self::Tor,
            2 => Self::Na4,
            _ => Self::Napot,
        }
    }
}

/// Configuration of a single PMP entry: one byte of a `pmpcfgN` register.
///
/// > | 7 | 6:5 | 4:3 | 2 | 1 | 0 |
/// > | L | 0   | A   | X | W | R |
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PmpCfg {
    pub read: bool,
    pub write: bool,
    pub exec: bool,
    pub mode: PmpMode,
    pub lock: bool,
}

impl PmpCfg {
    pub fn to_u8(self) -> u8 {
        let mut byte = 0u8;
        let bits = byte.view_bits_mut::<Lsb0>();
        bits.set(cfg_idx::R, self.read);
        bits.set(cfg_idx::W, self.write);
        bits.set(cfg_idx::X, self.exec);
        bits[cfg_idx::A..(cfg_idx::A + 2)].store_le(self.mode as u8);
        bits.set(cfg_idx::L, self.lock);
        byte
    }

    /// Decode a configuration byte as written by software, making it legal.
    ///
    /// - NA4 cannot be represented when the granularity is coarser than four bytes, so it selects
    ///   Off instead.
    /// - W=1 with R=0 is reserved, so W is only kept if R is also set.
    pub fn from_written_u8(value: u8, granularity: u8) -> Self {
        let bits = value.view_bits::<Lsb0>();
        let read = bits[cfg_idx::R];
        let mode = match PmpMode::from_u2(bits[cfg_idx::A..(cfg_idx::A + 2)].load_le()) {
            PmpMode::Na4 if granularity > 0 => PmpMode::Off,
            mode => mode,
        };
        Self {
            read,
            write: bits[cfg_idx::W] && read,
            exec: bits[cfg_idx::X],
            mode,
            lock: bits[cfg_idx::L],
        }
    }
}

/// Bit indices into a PMP configuration byte.
mod cfg_idx {
    pub const R: usize = 0;
    pub const W: usize = 1;
    pub const X: usize = 2;
    pub const A: usize = 3;
    pub const L: usize = 7;
}

/// A single PMP entry: its configuration and its (stored) address register.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PmpEntry {
    pub cfg: PmpCfg,
    /// `pmpaddr` as stored: bits below the granularity that are synthesized on read are zero.
    addr: u32,
}

/// Machine security configuration register (`mseccfg`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Mseccfg {
    /// Machine Mode Lockdown. Sticky: can only be set.
    pub mml: bool,
    /// Machine Mode Whitelist Policy. Sticky: can only be set.
    pub mmwp: bool,
    /// Rule Locking Bypass.
    pub rlb: bool,
}

impl Mseccfg {
    const MML: usize = 0;
    const MMWP: usize = 1;
    const RLB: usize = 2;

    pub fn read(&self) -> u32 {
        let mut value = 0u32;
        let bits = value.view_bits_mut::<Lsb0>();
        bits.set(Self::MML, self.mml);
        bits.set(Self::MMWP, self.mmwp);
        bits.set(Self::RLB, self.rlb);
        value
    }
}

/// Returns `true` if entry `i` is effectively locked: its L bit is set and rule locking is not
/// bypassed.
pub fn is_locked(entries: &[PmpEntry], mseccfg: &Mseccfg, i: usize) -> bool {
    entries[i].cfg.lock && !mseccfg.rlb
}

/// Returns `true` if software may write the configuration of entry `i`.
pub fn cfg_write_enabled(entries: &[PmpEntry], mseccfg: &Mseccfg, i: usize) -> bool {
    !is_locked(entries, mseccfg, i)
}

/// Returns `true` if software may write the address of entry `i`.
///
/// Besides the entry itself being unlocked, a locked TOR entry `i + 1` also protects the address of
/// entry `i`, since that address is its lower bound.
pub fn addr_write_enabled(entries: &[PmpEntry], mseccfg: &Mseccfg, i: usize) -> bool {
    if is_locked(entries, mseccfg, i) {
        return false;
    }
    match entries.get(i + 1) {
        Some(next) => !(is_locked(entries, mseccfg, i + 1) && next.cfg.mode == PmpMode::Tor),
        None => true,
    }
}

/// All PMP state: the implemented entries and `mseccfg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pmp {
    entries: Vec<PmpEntry>,
    mseccfg: Mseccfg,
    granularity: u8,
}

impl Pmp {
    pub fn new(entries: u8, granularity: u8) -> Self {
        Self {
            entries: vec![PmpEntry::default(); entries as usize],
            mseccfg: Mseccfg::default(),
            granularity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mseccfg(&self) -> Mseccfg {
        self.mseccfg
    }

    /// Iterate over `(cfg, pmpaddr)` for all implemented entries, in ascending index order.
    ///
    /// The address is the value software would read back from `pmpaddrN`, i.e. bits 33:2 of the
    /// physical address with granularity masking applied.
    pub fn entries(&self) -> impl Iterator<Item = (PmpCfg, u32)> + '_ {
        (0..self.entries.len()).map(|i| (self.entries[i].cfg, self.read_addr(i as u8)))
    }

    /// `(cfg, pmpaddr)` of entry `i`, or `None` if it is not implemented.
    pub fn entry(&self, i: usize) -> Option<(PmpCfg, u32)> {
        let cfg = self.entries.get(i)?.cfg;
        Some((cfg, self.read_addr(i as u8)))
    }

    /// Read `pmpcfgN`, which packs the configuration of entries `4N..4N+4`.
    pub fn read_cfg(&self, n: u8) -> u32 {
        (0..4).fold(0, |value, byte| {
            let i = n as usize * 4 + byte;
            let cfg = self.entries.get(i).map_or(0, |entry| entry.cfg.to_u8());
            value | (cfg as u32) << (8 * byte)
        })
    }

    /// Write `pmpcfgN`. Each of the four packed entries is updated only if it is not locked.
    pub fn write_cfg(&mut self, n: u8, value: u32) {
        for byte in 0..4 {
            let i = n as usize * 4 + byte;
            if i >= self.entries.len() {
                break;
            }
            let new_cfg = PmpCfg::from_written_u8((value >> (8 * byte)) as u8, self.granularity);
            if cfg_write_enabled(&self.entries, &self.mseccfg, i) {
                self.entries[i].cfg = new_cfg;
            } else if new_cfg != self.entries[i].cfg {
                warn!("Ignoring write to configuration of locked PMP entry {i}");
            }
        }
    }

    /// Read `pmpaddrN`, applying the granularity masking for the entry's current mode.
    pub fn read_addr(&self, n: u8) -> u32 {
        let Some(entry) = self.entries.get(n as usize) else {
            return 0;
        };
        let g = self.granularity as u32;
        match (g, entry.cfg.mode) {
            (0, _) => entry.addr,
            (_, PmpMode::Off | PmpMode::Tor) => entry.addr & !low_bits(g),
            (1, _) => entry.addr,
            (_, PmpMode::Na4 | PmpMode::Napot) => entry.addr | low_bits(g - 1),
        }
    }

    /// Write `pmpaddrN`, unless the entry or its TOR successor is locked.
    pub fn write_addr(&mut self, n: u8, value: u32) {
        let i = n as usize;
        if i >= self.entries.len() {
            return;
        }
        if !addr_write_enabled(&self.entries, &self.mseccfg, i) {
            warn!("Ignoring write to address of locked PMP entry {i}");
            return;
        }
        // With G >= 2, bits G-2:0 are not stored: they read as ones in NAPOT mode and zeroes
        // otherwise.
        let g = self.granularity as u32;
        self.entries[i].addr = if g >= 2 { value & !low_bits(g - 1) } else { value };
    }

    pub fn read_mseccfg(&self) -> u32 {
        self.mseccfg.read()
    }

    /// Write `mseccfg`. MML and MMWP are sticky, and RLB cannot be set while any entry is locked.
    pub fn write_mseccfg(&mut self, value: u32) {
        let bits = value.view_bits::<Lsb0>();
        let any_locked =
            (0..self.entries.len()).any(|i| is_locked(&self.entries, &self.mseccfg, i));
        self.mseccfg = Mseccfg {
            mml: self.mseccfg.mml || bits[Mseccfg::MML],
            mmwp: self.mseccfg.mmwp || bits[Mseccfg::MMWP],
            rlb: !any_locked && bits[Mseccfg::RLB],
        };
    }

    /// Snapshot of everything the external checker needs.
    pub fn outputs(&self) -> PmpOutputs {
        PmpOutputs {
            entries: self.entries().collect(),
            mseccfg: self.mseccfg,
        }
    }
}

/// PMP configuration as exported to the permission checker, one `(cfg, pmpaddr)` pair per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PmpOutputs {
    pub entries: Vec<(PmpCfg, u32)>,
    pub mseccfg: Mseccfg,
}

/// Mask with the `n` least significant bits set.
fn low_bits(n: u32) -> u32 {
    1u32.checked_shl(n).map_or(u32::MAX, |bit| bit - 1)
}
