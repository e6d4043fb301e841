//! Trap bookkeeping registers: the ordinary trap record, its resumable NMI shadow and `mtvec`.

use bitvec::{field::BitField, order::Lsb0, view::BitView};

/// Trap record holding a cause and an exception program counter.
///
/// Two independent instances exist: `mcause`/`mepc` and the resumable NMI shadow
/// `mncause`/`mnepc`. Both share the single `mtval` register kept by [`Trap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrapRecord {
    pub cause: Cause,
    epc: u32,
}

impl TrapRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_epc(&self) -> u32 {
        self.epc
    }

    /// The EPC is always word-aligned; the two least significant bits are hardwired to zero.
    pub fn write_epc(&mut self, value: u32) {
        self.epc = value & !0b11;
    }
}

/// All trap handling registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trap {
    pub mscratch: u32,
    pub mtval: u32,
    pub mtvec: Tvec,
    /// `mcause` and `mepc`.
    pub machine: TrapRecord,
    /// `mncause` and `mnepc`.
    pub nmi: TrapRecord,
    pub mnscratch: u32,
}

impl Trap {
    pub fn new(mtvec_reset: u32) -> Self {
        Self {
            mtvec: Tvec::new(mtvec_reset),
            ..Self::default()
        }
    }
}

/// Trap cause, 7 bits wide: an interrupt flag and a 6-bit exception code.
///
/// Architecturally the interrupt flag is visible as bit 31 of `mcause`, and the exception code in
/// bits 5:0. All other bits read as zero.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Cause(u8);

impl Cause {
    const INTERRUPT: usize = 6;

    /// Create a cause from the interrupt flag and an exception code. Only the 6 least significant
    /// bits of `code` are kept.
    pub fn new(interrupt: bool, code: u8) -> Self {
        let mut cause = Self(code & 0x3F);
        cause.0.view_bits_mut::<Lsb0>().set(Self::INTERRUPT, interrupt);
        cause
    }

    /// Create a cause from its 7-bit packed form (interrupt flag in bit 6).
    pub fn from_u7(value_u7: u8) -> Self {
        Self(value_u7 & 0x7F)
    }

    pub fn is_interrupt(&self) -> bool {
        self.0.view_bits::<Lsb0>()[Self::INTERRUPT]
    }

    pub fn code(&self) -> u8 {
        self.0.view_bits::<Lsb0>()[..Self::INTERRUPT].load_le()
    }

    /// The 32-bit CSR view of this cause.
    pub fn read(&self) -> u32 {
        (self.is_interrupt() as u32) << 31 | self.code() as u32
    }

    /// Update from the 32-bit CSR view: bit 31 and bits 5:0 are kept.
    pub fn write(&mut self, value: u32) {
        *self = Self::new(value >> 31 != 0, (value & 0x3F) as u8);
    }
}

/// Machine trap vector base address register (`mtvec`).
///
/// > The mtvec register is an MXLEN-bit WARL read/write register that holds trap vector
/// > configuration, consisting of a vector base address (BASE) and a vector mode (MODE).
///
/// This core only supports vectored mode, with a BASE aligned to 256 bytes. Writes are made legal
/// by clearing the low BASE bits and forcing MODE to Vectored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tvec(u32);

impl Default for Tvec {
    fn default() -> Self {
        Self::new(0x0000_0001)
    }
}

impl Tvec {
    const BASE_MASK: u32 = !0xFF;
    const MODE_VECTORED: u32 = 0b01;

    /// Create the register with an explicit reset value, which is taken as-is.
    pub fn new(reset_value: u32) -> Self {
        Self(reset_value)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32) {
        self.0 = value & Self::BASE_MASK | Self::MODE_VECTORED;
    }

    /// Returns the vector base address (BASE field).
    pub fn base(&self) -> u32 {
        self.0 & !0b11
    }

    /// Returns `true` if MODE is Vectored.
    pub fn is_vectored(&self) -> bool {
        self.0 & 0b11 == Self::MODE_VECTORED
    }
}
