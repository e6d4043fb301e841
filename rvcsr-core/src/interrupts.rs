use bitvec::{array::BitArray, field::BitField, order::Lsb0};

const MACHINE_SOFTWARE_INTERRUPT: usize = 3;
const MACHINE_TIMER_INTERRUPT: usize = 7;
const MACHINE_EXTERNAL_INTERRUPT: usize = 11;
/// Bit index of the first of the 16 fast local interrupts.
const FAST_INTERRUPT_BASE: usize = 16;

#[allow(clippy::identity_op)]
const VALID_INTERRUPTS_MASK: u32 = 0
    | (1 << MACHINE_SOFTWARE_INTERRUPT)
    | (1 << MACHINE_TIMER_INTERRUPT)
    | (1 << MACHINE_EXTERNAL_INTERRUPT)
    | (0xFFFF << FAST_INTERRUPT_BASE);

/// Raw interrupt request lines, as driven by the interrupt controllers outside the core.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct InterruptLines {
    pub software: bool,
    pub timer: bool,
    pub external: bool,
    /// One bit per fast local interrupt line.
    pub fast: u16,
}

impl InterruptLines {
    /// The `mip` view of the request lines.
    pub fn pending(&self) -> u32 {
        let mut mip: BitArray<[u32; 1], Lsb0> = BitArray::ZERO;
        mip.set(MACHINE_SOFTWARE_INTERRUPT, self.software);
        mip.set(MACHINE_TIMER_INTERRUPT, self.timer);
        mip.set(MACHINE_EXTERNAL_INTERRUPT, self.external);
        mip[FAST_INTERRUPT_BASE..].store_le(self.fast);
        mip.load_le()
    }
}

/// Machine interrupt-enable register (`mie`).
///
/// The matching `mip` register holds no state on this core: it mirrors the [`InterruptLines`]
/// every cycle, and writes to it are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interrupts {
    mie: BitArray<[u32; 1], Lsb0>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_mie(&self) -> u32 {
        self.mie.load_le()
    }

    /// The mie register is **WARL**: only bits of implemented interrupts are kept.
    pub fn write_mie(&mut self, value: u32) {
        self.mie.store_le(value & VALID_INTERRUPTS_MASK);
    }

    /// Interrupts that are both pending and enabled, in `mip` layout.
    ///
    /// Note this does not take `mstatus.MIE` into account; the pipeline decides whether a
    /// qualified interrupt is actually taken.
    pub fn qualified(&self, lines: &InterruptLines) -> u32 {
        lines.pending() & self.read_mie()
    }
}
