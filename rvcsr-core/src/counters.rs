use bitvec::{order::Lsb0, view::BitView};

/// Number of counter slots addressable in the CSR space.
pub const COUNTER_SLOTS: usize = 32;

const CYCLE: usize = 0;
const INSTRET: usize = 2;
const FIRST_HPM: usize = 3;

/// Single-cycle event pulses from the pipeline, one per countable event.
///
/// The event-to-counter wiring is fixed:
///
/// | Counter | Event                                   |
/// | ------- | --------------------------------------- |
/// | 0       | cycles (always counts)                  |
/// | 2       | instructions retired                    |
/// | 3       | cycles waiting on the data side         |
/// | 4       | cycles waiting on instruction fetch     |
/// | 5       | loads                                   |
/// | 6       | stores                                  |
/// | 7       | unconditional jumps                     |
/// | 8       | conditional branches                    |
/// | 9       | taken conditional branches              |
/// | 10      | compressed instructions retired         |
/// | 11      | cycles waiting for an interrupt (WFI)   |
/// | 12      | cycles waiting on the divider           |
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PerformanceEvents {
    pub instr_ret: bool,
    pub data_wait: bool,
    pub instr_wait: bool,
    pub load: bool,
    pub store: bool,
    pub jump: bool,
    pub branch: bool,
    pub branch_taken: bool,
    pub compressed_ret: bool,
    pub wfi_wait: bool,
    pub div_wait: bool,
}

impl PerformanceEvents {
    /// Bit `n` is set if counter `n`'s event fires this cycle.
    pub fn mask(&self) -> u32 {
        let mut mask = 0u32;
        let bits = mask.view_bits_mut::<Lsb0>();
        bits.set(CYCLE, true);
        bits.set(INSTRET, self.instr_ret);
        let hpm = [
            self.data_wait,
            self.instr_wait,
            self.load,
            self.store,
            self.jump,
            self.branch,
            self.branch_taken,
            self.compressed_ret,
            self.wfi_wait,
            self.div_wait,
        ];
        for (offset, fired) in hpm.into_iter().enumerate() {
            bits.set(FIRST_HPM + offset, fired);
        }
        mask
    }
}

const_assert_eq!(crate::config::MAX_HPM_COUNTERS as usize, 10);

/// Performance monitor: `mcycle`, `minstret`, the event counters and `mcountinhibit`.
///
/// > RISC-V ISAs provide a set of up to 32×64-bit performance counters and timers that are
/// > accessible via unprivileged XLEN read-only CSR registers 0xC00–0xC1F (with the upper 32
/// > bits accessed via CSR registers 0xC80–0xC9F on RV32).
///
/// Slot 1 (`time`) is never implemented here, nor are the counters beyond the configured number of
/// event counters: those read as zero and ignore writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counters {
    counters: [u64; COUNTER_SLOTS],
    mcountinhibit: u32,
    /// Bit `n` is set if counter `n` exists.
    implemented: u32,
}

impl Counters {
    pub fn new(hpm_counters: u8) -> Self {
        let hpm_mask = ((1u64 << hpm_counters) - 1) as u32;
        Self {
            counters: [0; COUNTER_SLOTS],
            mcountinhibit: 0,
            implemented: (1 << CYCLE) | (1 << INSTRET) | hpm_mask << FIRST_HPM,
        }
    }

    /// Returns `true` if counter `n` exists.
    pub fn is_implemented(&self, n: u8) -> bool {
        (n as usize) < COUNTER_SLOTS && self.implemented.view_bits::<Lsb0>()[n as usize]
    }

    /// Returns the full 64-bit value of counter `n`, or `0` for unimplemented counters.
    pub fn counter(&self, n: u8) -> u64 {
        if self.is_implemented(n) {
            self.counters[n as usize]
        } else {
            0
        }
    }

    pub fn read_low(&self, n: u8) -> u32 {
        self.counter(n) as u32
    }

    pub fn read_high(&self, n: u8) -> u32 {
        (self.counter(n) >> 32) as u32
    }

    /// Overwrite the low half of counter `n`. Returns `true` if the counter exists.
    pub fn write_low(&mut self, n: u8, value: u32) -> bool {
        if !self.is_implemented(n) {
            return false;
        }
        let counter = &mut self.counters[n as usize];
        *counter = *counter & 0xFFFF_FFFF_0000_0000 | value as u64;
        true
    }

    /// Overwrite the high half of counter `n`. Returns `true` if the counter exists.
    pub fn write_high(&mut self, n: u8, value: u32) -> bool {
        if !self.is_implemented(n) {
            return false;
        }
        let counter = &mut self.counters[n as usize];
        *counter = *counter & 0x0000_0000_FFFF_FFFF | (value as u64) << 32;
        true
    }

    /// Event selector `mhpmeventN`. The wiring is fixed, so this is a one-hot constant.
    pub fn read_event(&self, n: u8) -> u32 {
        if n as usize >= FIRST_HPM && self.is_implemented(n) {
            1 << n
        } else {
            0
        }
    }

    pub fn read_mcountinhibit(&self) -> u32 {
        self.mcountinhibit
    }

    /// The mcountinhibit register is **WARL**: bit 1 and the bits of unimplemented counters are
    /// read-only zero.
    pub fn write_mcountinhibit(&mut self, value: u32) {
        self.mcountinhibit = value & self.implemented;
    }

    /// The counters that should be incremented for `events`, given the current inhibit bits.
    pub fn increment_mask(&self, events: &PerformanceEvents) -> u32 {
        events.mask() & self.implemented & !self.mcountinhibit
    }

    /// Increment every counter selected by `mask` by one, wrapping at 64 bits.
    pub fn advance(&mut self, mask: u32) {
        for n in mask.view_bits::<Lsb0>().iter_ones() {
            self.counters[n] = self.counters[n].wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implemented_counters() {
        let counters = Counters::new(2);
        assert!(counters.is_implemented(0));
        assert!(!counters.is_implemented(1));
        assert!(counters.is_implemented(2));
        assert!(counters.is_implemented(4));
        assert!(!counters.is_implemented(5));
        assert!(!counters.is_implemented(40));
        assert_eq!(1 << 4, counters.read_event(4));
        assert_eq!(0, counters.read_event(5));
        assert_eq!(0, counters.read_event(2));
    }

    #[test]
    fn test_event_mask() {
        let events = PerformanceEvents {
            instr_ret: true,
            store: true,
            div_wait: true,
            ..PerformanceEvents::default()
        };
        assert_eq!((1 << 0) | (1 << 2) | (1 << 6) | (1 << 12), events.mask());
    }

    #[test]
    fn test_inhibit() {
        let mut counters = Counters::new(10);
        counters.write_mcountinhibit(0xFFFF_FFFF);
        assert_eq!(0x0000_1FFD, counters.read_mcountinhibit());
        let events = PerformanceEvents {
            instr_ret: true,
            ..PerformanceEvents::default()
        };
        assert_eq!(0, counters.increment_mask(&events));
        counters.write_mcountinhibit(0b001);
        assert_eq!(1 << 2, counters.increment_mask(&events));
    }

    #[test]
    fn test_carry_into_high_half() {
        let mut counters = Counters::new(0);
        assert!(counters.write_low(0, 0xFFFF_FFFF));
        counters.advance(1);
        assert_eq!(0, counters.read_low(0));
        assert_eq!(1, counters.read_high(0));
        assert!(counters.write_high(2, 0xDEAD_BEEF));
        assert_eq!(0xDEAD_BEEF_0000_0000, counters.counter(2));
        assert!(!counters.write_low(3, 5));
        assert_eq!(0, counters.read_low(3));
    }
}
