//! The CSR unit as seen by the pipeline: one set of inputs per cycle, combinational outputs, and a
//! single commit at the clock edge.

use log::{trace, warn};

use crate::config::{Config, ConfigError};
use crate::controller::ControlEvent;
use crate::counters::{Counters, PerformanceEvents};
use crate::csr::{check_access, Access, AccessError, Csr, CsrSpecifier};
use crate::debug::{DebugCause, DebugRegisters};
use crate::interrupts::{InterruptLines, Interrupts};
use crate::pmp::{Pmp, PmpOutputs};
use crate::status::Status;
use crate::trap::Trap;
use crate::trigger::Triggers;
use crate::PrivilegeLevel;

/// Value of `misa`: RV32 with the C, I, M and U extensions.
#[allow(clippy::identity_op)]
pub const MISA: u32 = 0
    | (1 << 30) // MXL = 32
    | (1 << 2) // C
    | (1 << 8) // I
    | (1 << 12) // M
    | (1 << 20); // U

const_assert_eq!(MISA, 0x4010_1104);

/// Operation requested by a CSR instruction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CsrOp {
    #[default]
    Read,
    Write,
    Set,
    Clear,
}

impl CsrOp {
    /// Decode the 2-bit operation code driven by the decoder.
    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 & 0b11 {
            0 => Self::Read,
            1 => Self::Write,
            2 => Self::Set,
            _ => Self::Clear,
        }
    }

    /// Returns `true` if this operation modifies the addressed register.
    pub fn writes(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Compute the value that would be written, given the register's `current` value and the
    /// instruction's operand `data`. For [`CsrOp::Read`] the operand is passed through, but never
    /// committed.
    pub fn apply(self, current: u32, data: u32) -> u32 {
        match self {
            Self::Read | Self::Write => data,
            Self::Set => current | data,
            Self::Clear => current & !data,
        }
    }
}

/// Everything the pipeline drives into the CSR unit during one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleInputs {
    /// Program counter of the instruction in the fetch stage.
    pub pc_if: u32,
    /// Program counter of the instruction in the decode stage.
    pub pc_id: u32,
    /// A CSR instruction is being executed this cycle.
    pub csr_access: bool,
    pub csr_addr: CsrSpecifier,
    pub csr_wdata: u32,
    pub csr_op: CsrOp,
    /// Write enable pulse. Without it a writing operation is only checked for legality.
    pub csr_write_enable: bool,
    /// Exception entry or return, if any.
    pub control: Option<ControlEvent>,
    /// Trap value saved on trap entry.
    pub mtval: u32,
    pub debug_mode: bool,
    /// Reason recorded in `dcsr.cause` on debug entry.
    pub debug_cause: DebugCause,
    /// The core is handling a resumable NMI.
    pub nmi_mode: bool,
    pub irq_software: bool,
    pub irq_timer: bool,
    pub irq_external: bool,
    pub irq_fast: u16,
    pub events: PerformanceEvents,
    /// Load `mtvec` from the boot address.
    pub mtvec_init: Option<u32>,
}

impl CycleInputs {
    pub fn interrupt_lines(&self) -> InterruptLines {
        InterruptLines {
            software: self.irq_software,
            timer: self.irq_timer,
            external: self.irq_external,
            fast: self.irq_fast,
        }
    }

    fn access(&self, privilege_level: PrivilegeLevel) -> Access {
        Access {
            specifier: self.csr_addr,
            writes: self.csr_op.writes(),
            privilege_level,
            debug_mode: self.debug_mode,
        }
    }
}

/// Everything the CSR unit drives back into the pipeline during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutputs {
    /// Value of the addressed CSR, or zero if the access is illegal.
    pub rdata: u32,
    /// The CSR access performed this cycle is illegal.
    pub illegal: bool,
    /// Privilege level for instruction fetch and execution.
    pub priv_mode_id: PrivilegeLevel,
    /// Effective privilege level for loads and stores, taking `mstatus.MPRV` into account.
    pub priv_mode_lsu: PrivilegeLevel,
    /// Pending and enabled interrupts, in `mip` layout.
    pub irqs: u32,
    pub irq_pending: bool,
    pub mstatus_mie: bool,
    pub mstatus_tw: bool,
    pub mepc: u32,
    pub mnepc: u32,
    pub depc: u32,
    pub mtvec: u32,
    pub debug_single_step: bool,
    pub debug_ebreakm: bool,
    pub debug_ebreaku: bool,
    /// A trigger matches the instruction in the fetch stage.
    pub trigger_match: bool,
    pub pmp: PmpOutputs,
}

/// All state held by the CSR unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CsrState {
    pub privilege: PrivilegeLevel,
    pub mstatus: Status,
    pub mnstatus: Status,
    pub trap: Trap,
    pub interrupts: Interrupts,
    pub counters: Counters,
    pub pmp: Pmp,
    pub debug: DebugRegisters,
    pub triggers: Triggers,
}

impl CsrState {
    pub fn new(config: &Config) -> Self {
        Self {
            privilege: PrivilegeLevel::Machine,
            mstatus: Status::new(),
            mnstatus: Status::new(),
            trap: Trap::new(config.mtvec_reset),
            interrupts: Interrupts::new(),
            counters: Counters::new(config.hpm_counters),
            pmp: Pmp::new(config.pmp_entries, config.pmp_granularity),
            debug: DebugRegisters::new(),
            triggers: Triggers::new(config.trigger_count),
        }
    }

    /// Side-effect free read of a decoded register.
    fn read(&self, csr: Csr, config: &Config, inputs: &CycleInputs) -> u32 {
        match csr {
            Csr::Mvendorid => config.vendor_id,
            Csr::Marchid => config.arch_id,
            Csr::Mimpid => config.impl_id,
            Csr::Mhartid => config.hart_id,
            Csr::Misa => MISA,
            Csr::Mstatus => self.mstatus.read(),
            Csr::Mie => self.interrupts.read_mie(),
            Csr::Mtvec => self.trap.mtvec.read(),
            Csr::Mcountinhibit => self.counters.read_mcountinhibit(),
            Csr::Mhpmevent(n) => self.counters.read_event(n),
            Csr::Mscratch => self.trap.mscratch,
            Csr::Mepc => self.trap.machine.read_epc(),
            Csr::Mcause => self.trap.machine.cause.read(),
            Csr::Mtval => self.trap.mtval,
            Csr::Mip => inputs.interrupt_lines().pending(),
            Csr::Mnscratch => self.trap.mnscratch,
            Csr::Mnepc => self.trap.nmi.read_epc(),
            Csr::Mncause => self.trap.nmi.cause.read(),
            Csr::Mnstatus => self.mnstatus.read(),
            Csr::Pmpcfg(n) => self.pmp.read_cfg(n),
            Csr::Pmpaddr(n) => self.pmp.read_addr(n),
            Csr::Mseccfg => self.pmp.read_mseccfg(),
            Csr::Mhpmcounter(n) | Csr::Hpmcounter(n) => self.counters.read_low(n),
            Csr::Mhpmcounterh(n) | Csr::Hpmcounterh(n) => self.counters.read_high(n),
            Csr::Tselect => self.triggers.read_tselect(),
            Csr::Tdata1 => self.triggers.read_tdata1(),
            Csr::Tdata2 => self.triggers.read_tdata2(),
            Csr::Tinfo => self.triggers.read_tinfo(),
            Csr::Dcsr => self.debug.dcsr.read(),
            Csr::Dpc => self.debug.read_dpc(),
            Csr::Dscratch0 => self.debug.dscratch0,
            Csr::Dscratch1 => self.debug.dscratch1,
            Csr::Mconfigptr
            | Csr::Mcounteren
            | Csr::Mstatush
            | Csr::Menvcfg
            | Csr::Menvcfgh
            | Csr::Mseccfgh
            | Csr::Tdata3
            | Csr::Mcontext
            | Csr::Scontext => 0,
        }
    }

    /// Write `value` into a decoded register whose access has already been checked.
    ///
    /// Returns the mask of counters that were written, whose increment must be suppressed.
    fn write(&mut self, csr: Csr, value: u32, debug_mode: bool) -> u32 {
        let mut written_counters = 0;
        match csr {
            Csr::Mstatus => self.mstatus.write(value),
            Csr::Mie => self.interrupts.write_mie(value),
            Csr::Mtvec => self.trap.mtvec.write(value),
            Csr::Mcountinhibit => self.counters.write_mcountinhibit(value),
            Csr::Mscratch => self.trap.mscratch = value,
            Csr::Mepc => self.trap.machine.write_epc(value),
            Csr::Mcause => self.trap.machine.cause.write(value),
            Csr::Mtval => self.trap.mtval = value,
            Csr::Mnscratch => self.trap.mnscratch = value,
            Csr::Mnepc => self.trap.nmi.write_epc(value),
            Csr::Mncause => self.trap.nmi.cause.write(value),
            Csr::Mnstatus => self.mnstatus.write(value),
            Csr::Pmpcfg(n) => self.pmp.write_cfg(n, value),
            Csr::Pmpaddr(n) => self.pmp.write_addr(n, value),
            Csr::Mseccfg => self.pmp.write_mseccfg(value),
            Csr::Mhpmcounter(n) => {
                if self.counters.write_low(n, value) {
                    written_counters |= 1 << n;
                }
            }
            Csr::Mhpmcounterh(n) => {
                if self.counters.write_high(n, value) {
                    written_counters |= 1 << n;
                }
            }
            Csr::Tselect => self.triggers.write_tselect(value),
            Csr::Tdata1 => self.triggers.write_tdata1(value, debug_mode),
            Csr::Tdata2 => self.triggers.write_tdata2(value, debug_mode),
            Csr::Dcsr => self.debug.dcsr.write(value),
            Csr::Dpc => self.debug.write_dpc(value),
            Csr::Dscratch0 => self.debug.dscratch0 = value,
            Csr::Dscratch1 => self.debug.dscratch1 = value,
            // Constant, read-only or hardwired registers.
            Csr::Mvendorid
            | Csr::Marchid
            | Csr::Mimpid
            | Csr::Mhartid
            | Csr::Mconfigptr
            | Csr::Misa
            | Csr::Mcounteren
            | Csr::Mstatush
            | Csr::Menvcfg
            | Csr::Menvcfgh
            | Csr::Mhpmevent(_)
            | Csr::Mip
            | Csr::Mseccfgh
            | Csr::Hpmcounter(_)
            | Csr::Hpmcounterh(_)
            | Csr::Tdata3
            | Csr::Tinfo
            | Csr::Mcontext
            | Csr::Scontext => {}
        }
        written_counters
    }
}

/// Control and Status Register unit of a single hart.
///
/// Call [`evaluate`](Self::evaluate) to observe the outputs for a set of inputs without changing
/// anything, and [`clock`](Self::clock) to also commit the resulting state at the clock edge.
#[derive(Debug, Clone)]
pub struct CsrUnit {
    config: Config,
    state: CsrState,
}

impl CsrUnit {
    /// Create a unit in its reset state.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = CsrState::new(&config);
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Force all registers to their reset values.
    pub fn reset(&mut self) {
        trace!("Resetting CSR unit");
        self.state = CsrState::new(&self.config);
    }

    /// Decode and check the CSR access described by `inputs` against the current state.
    pub fn check(&self, inputs: &CycleInputs) -> Result<Csr, AccessError> {
        check_access(&inputs.access(self.state.privilege), &self.config)
    }

    /// Compute this cycle's outputs. Nothing is modified.
    pub fn evaluate(&self, inputs: &CycleInputs) -> CycleOutputs {
        let state = &self.state;
        let (rdata, illegal) = match self.check(inputs) {
            Ok(csr) => (state.read(csr, &self.config, inputs), false),
            Err(_) => (0, inputs.csr_access),
        };
        let priv_mode_lsu = if state.mstatus.mprv() {
            state.mstatus.mpp()
        } else {
            state.privilege
        };
        let irqs = state.interrupts.qualified(&inputs.interrupt_lines());
        CycleOutputs {
            rdata,
            illegal,
            priv_mode_id: state.privilege,
            priv_mode_lsu,
            irqs,
            irq_pending: irqs != 0,
            mstatus_mie: state.mstatus.mie(),
            mstatus_tw: state.mstatus.tw(),
            mepc: state.trap.machine.read_epc(),
            mnepc: state.trap.nmi.read_epc(),
            depc: state.debug.read_dpc(),
            mtvec: state.trap.mtvec.read(),
            debug_single_step: state.debug.dcsr.step(),
            debug_ebreakm: state.debug.dcsr.ebreakm(),
            debug_ebreaku: state.debug.dcsr.ebreaku(),
            trigger_match: state.triggers.matches(inputs.pc_if),
            pmp: state.pmp.outputs(),
        }
    }

    /// Compute this cycle's outputs, then advance to the next cycle.
    ///
    /// The next state is built in order: the CSR write (if legal and enabled), the control event,
    /// counter increments, and finally `mtvec` initialisation. Later steps override earlier ones.
    pub fn clock(&mut self, inputs: &CycleInputs) -> CycleOutputs {
        let outputs = self.evaluate(inputs);
        let current = &self.state;
        let mut next = current.clone();
        let write_value = inputs.csr_op.apply(outputs.rdata, inputs.csr_wdata);

        let mut written_counters = 0;
        if inputs.csr_access && inputs.csr_write_enable && inputs.csr_op.writes() {
            match self.check(inputs) {
                Ok(csr) => {
                    trace!(
                        "Writing {write_value:#010x} to {csr:?} ({:?} {:#010x})",
                        inputs.csr_op,
                        inputs.csr_wdata
                    );
                    written_counters = next.write(csr, write_value, inputs.debug_mode);
                }
                Err(err) => warn!("Discarding illegal CSR write: {err}"),
            }
        }

        if let Some(event) = &inputs.control {
            event.apply(current, &mut next, inputs, write_value);
        }

        let increment = current.counters.increment_mask(&inputs.events) & !written_counters;
        next.counters.advance(increment);

        if let Some(boot_addr) = inputs.mtvec_init {
            trace!("Initialising mtvec from boot address {boot_addr:#010x}");
            next.trap.mtvec.write(boot_addr);
        }

        if next.privilege != current.privilege {
            trace!("Privilege level {} -> {}", current.privilege, next.privilege);
        }
        self.state = next;
        outputs
    }

    /// Current privilege level.
    pub fn privilege(&self) -> PrivilegeLevel {
        self.state.privilege
    }

    pub fn mstatus(&self) -> &Status {
        &self.state.mstatus
    }

    pub fn mnstatus(&self) -> &Status {
        &self.state.mnstatus
    }

    pub fn trap(&self) -> &Trap {
        &self.state.trap
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.state.interrupts
    }

    pub fn counters(&self) -> &Counters {
        &self.state.counters
    }

    /// Committed PMP configuration, for the external permission checker.
    pub fn pmp(&self) -> &Pmp {
        &self.state.pmp
    }

    pub fn debug(&self) -> &DebugRegisters {
        &self.state.debug
    }

    pub fn triggers(&self) -> &Triggers {
        &self.state.triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PcSource;
    use crate::csr::specifier;
    use crate::trap::Cause;

    fn unit() -> CsrUnit {
        CsrUnit::new(Config::default()).unwrap()
    }

    fn access(csr_addr: CsrSpecifier, csr_op: CsrOp, csr_wdata: u32) -> CycleInputs {
        CycleInputs {
            csr_access: true,
            csr_addr,
            csr_op,
            csr_wdata,
            csr_write_enable: csr_op.writes(),
            ..CycleInputs::default()
        }
    }

    fn read(unit: &CsrUnit, csr_addr: CsrSpecifier) -> u32 {
        let outputs = unit.evaluate(&access(csr_addr, CsrOp::Read, 0));
        assert!(!outputs.illegal, "read of {csr_addr:#05x} is illegal");
        outputs.rdata
    }

    fn control(event: ControlEvent) -> CycleInputs {
        CycleInputs {
            control: Some(event),
            ..CycleInputs::default()
        }
    }

    /// Drop to user mode through MRET.
    fn enter_user_mode(unit: &mut CsrUnit) {
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, 0));
        unit.clock(&control(ControlEvent::Mret));
        assert_eq!(PrivilegeLevel::User, unit.privilege());
    }

    #[test]
    fn test_invalid_config() {
        let config = Config {
            trigger_count: 17,
            ..Config::default()
        };
        assert_eq!(
            Some(ConfigError::TooManyTriggers(17)),
            CsrUnit::new(config).err()
        );
    }

    #[test]
    fn test_op_decoding() {
        assert_eq!(CsrOp::Read, CsrOp::from_u2(0));
        assert_eq!(CsrOp::Write, CsrOp::from_u2(1));
        assert_eq!(CsrOp::Set, CsrOp::from_u2(2));
        assert_eq!(CsrOp::Clear, CsrOp::from_u2(3));
        assert!(!CsrOp::Read.writes());
        assert_eq!(0xAB, CsrOp::Read.apply(0xFF, 0xAB));
    }

    #[test]
    fn test_reset_values() {
        let mut unit = unit();
        assert_eq!(PrivilegeLevel::Machine, unit.privilege());
        assert_eq!(1, read(&unit, specifier::MTVEC));
        assert_eq!(0x1800, read(&unit, specifier::MSTATUS));
        assert_eq!(0x1800, read(&unit, specifier::MNSTATUS));
        assert_eq!(0x4000_0003, unit.debug().dcsr.read());
        assert_eq!(MISA, read(&unit, specifier::MISA));

        unit.clock(&access(specifier::MSCRATCH, CsrOp::Write, 0x55));
        unit.reset();
        assert_eq!(0, read(&unit, specifier::MSCRATCH));
        assert_eq!(0, unit.counters().counter(0));
    }

    #[test]
    fn test_constant_registers() {
        let config = Config {
            hart_id: 3,
            vendor_id: 0x602,
            ..Config::default()
        };
        let unit = CsrUnit::new(config).unwrap();
        assert_eq!(3, read(&unit, specifier::MHARTID));
        assert_eq!(0x602, read(&unit, specifier::MVENDORID));
        for addr in [
            specifier::MCONFIGPTR,
            specifier::MSTATUSH,
            specifier::MCOUNTEREN,
            specifier::MENVCFG,
            specifier::MENVCFGH,
            specifier::MSECCFGH,
            specifier::TDATA3,
            specifier::MCONTEXT,
            specifier::SCONTEXT,
        ] {
            assert_eq!(0, read(&unit, addr));
        }
    }

    #[test]
    fn test_boot_scenario() {
        let mut unit = unit();

        // MPP = 0b01 is not implemented and reads back as Machine.
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, 0b01 << 11));
        assert_eq!(0b11 << 11, read(&unit, specifier::MSTATUS));

        enter_user_mode(&mut unit);

        let trap = CycleInputs {
            pc_if: 0x8000_0104,
            control: Some(ControlEvent::SaveCause {
                pc_source: PcSource::Fetch,
                cause: Cause::new(false, 2),
                enter_debug: false,
            }),
            ..CycleInputs::default()
        };
        unit.clock(&trap);
        assert_eq!(PrivilegeLevel::Machine, unit.privilege());
        assert_eq!(PrivilegeLevel::User, unit.mnstatus().mpp());
        assert_eq!(0x8000_0104, read(&unit, specifier::MNEPC));
        assert_eq!(2, read(&unit, specifier::MNCAUSE));

        let mnret = CycleInputs {
            nmi_mode: true,
            ..control(ControlEvent::Mnret)
        };
        unit.clock(&mnret);
        assert_eq!(PrivilegeLevel::User, unit.privilege());
        assert_eq!(0x8000_0104, unit.trap().machine.read_epc());
        assert_eq!(Cause::new(false, 2), unit.trap().machine.cause);
    }

    #[test]
    fn test_nested_nmi_return_restores_original_trap() {
        let mut unit = unit();
        let trap = CycleInputs {
            pc_id: 0x0000_2000,
            control: Some(ControlEvent::SaveCause {
                pc_source: PcSource::Decode,
                cause: Cause::new(false, 11),
                enter_debug: false,
            }),
            ..CycleInputs::default()
        };
        unit.clock(&trap);
        // The NMI handler reuses mepc and mcause for its own context.
        unit.clock(&access(specifier::MEPC, CsrOp::Write, 0x0000_3000));
        unit.clock(&access(specifier::MCAUSE, CsrOp::Write, 0x8000_0007));

        unit.clock(&CycleInputs {
            nmi_mode: true,
            ..control(ControlEvent::Mnret)
        });
        assert_eq!(0x0000_2000, read(&unit, specifier::MEPC));
        assert_eq!(11, read(&unit, specifier::MCAUSE));
    }

    #[test]
    fn test_set_clear_algebra() {
        let mut unit = unit();
        unit.clock(&access(specifier::MSCRATCH, CsrOp::Write, 0x0000_F0F0));
        let outputs = unit.clock(&access(specifier::MSCRATCH, CsrOp::Set, 0x0000_0F00));
        assert_eq!(0x0000_F0F0, outputs.rdata);
        assert_eq!(0x0000_FFF0, read(&unit, specifier::MSCRATCH));
        unit.clock(&access(specifier::MSCRATCH, CsrOp::Clear, 0x0000_00F0));
        assert_eq!(0x0000_FF00, read(&unit, specifier::MSCRATCH));

        // SET and CLEAR with zero never modify anything.
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, 0xFFFF_FFFF));
        let before = read(&unit, specifier::MSTATUS);
        unit.clock(&access(specifier::MSTATUS, CsrOp::Set, 0));
        unit.clock(&access(specifier::MSTATUS, CsrOp::Clear, 0));
        assert_eq!(before, read(&unit, specifier::MSTATUS));
    }

    #[test]
    fn test_write_without_enable_is_not_committed() {
        let mut unit = unit();
        let inputs = CycleInputs {
            csr_write_enable: false,
            ..access(specifier::MSCRATCH, CsrOp::Write, 0x1234)
        };
        let outputs = unit.clock(&inputs);
        assert!(!outputs.illegal);
        assert_eq!(0, read(&unit, specifier::MSCRATCH));
    }

    #[test]
    fn test_illegal_access_never_mutates() {
        let mut unit = unit();
        enter_user_mode(&mut unit);

        let before = unit.trap().clone();
        let outputs = unit.clock(&access(specifier::MSCRATCH, CsrOp::Write, 0x1234));
        assert!(outputs.illegal);
        assert_eq!(0, outputs.rdata);
        assert_eq!(&before, unit.trap());

        // User mode may read the counter shadows, but never write them.
        assert!(!unit.evaluate(&access(specifier::CYCLE, CsrOp::Read, 0)).illegal);
        assert!(unit.evaluate(&access(specifier::CYCLE, CsrOp::Set, 1)).illegal);

        // No access, no illegal flag.
        let idle = CycleInputs {
            csr_access: false,
            ..access(specifier::MSCRATCH, CsrOp::Write, 0)
        };
        assert!(!unit.evaluate(&idle).illegal);
    }

    #[test]
    fn test_debug_registers_are_gated() {
        let mut unit = unit();
        let outputs = unit.clock(&access(specifier::DSCRATCH0, CsrOp::Write, 7));
        assert!(outputs.illegal);
        assert_eq!(0, unit.debug().dscratch0);

        let in_debug = CycleInputs {
            debug_mode: true,
            ..access(specifier::DCSR, CsrOp::Write, (1 << 15) | (1 << 2))
        };
        let outputs = unit.clock(&in_debug);
        assert!(!outputs.illegal);
        let outputs = unit.evaluate(&CycleInputs::default());
        assert!(outputs.debug_single_step);
        assert!(outputs.debug_ebreakm);
        assert!(!outputs.debug_ebreaku);
    }

    #[test]
    fn test_debug_entry_and_return() {
        let mut unit = unit();
        enter_user_mode(&mut unit);
        let mepc = unit.trap().machine.read_epc();
        unit.clock(&CycleInputs {
            pc_id: 0x0000_0400,
            debug_cause: DebugCause::Ebreak,
            control: Some(ControlEvent::SaveCause {
                pc_source: PcSource::Decode,
                cause: Cause::new(false, 3),
                enter_debug: true,
            }),
            ..CycleInputs::default()
        });
        assert_eq!(PrivilegeLevel::Machine, unit.privilege());
        let outputs = unit.evaluate(&CycleInputs::default());
        assert_eq!(0x0000_0400, outputs.depc);
        assert_eq!(mepc, outputs.mepc);
        assert_eq!(DebugCause::Ebreak, unit.debug().dcsr.cause());

        unit.clock(&CycleInputs {
            debug_mode: true,
            ..control(ControlEvent::Dret)
        });
        assert_eq!(PrivilegeLevel::User, unit.privilege());
    }

    #[test]
    fn test_control_event_overrides_write() {
        let mut unit = unit();
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, (0b11 << 11) | (1 << 7)));
        // The fields MRET assigns win over the same-cycle write, which clears MPIE.
        unit.clock(&CycleInputs {
            control: Some(ControlEvent::Mret),
            ..access(specifier::MSTATUS, CsrOp::Write, (0b11 << 11) | (1 << 21))
        });
        assert_eq!(PrivilegeLevel::Machine, unit.privilege());
        assert_eq!(PrivilegeLevel::User, unit.mstatus().mpp());
        assert!(unit.mstatus().mie());
        assert!(unit.mstatus().mpie());
        // Fields MRET leaves alone keep the written value.
        assert!(unit.mstatus().tw());
    }

    #[test]
    fn test_trap_saves_write_value_to_mnscratch() {
        let mut unit = unit();
        unit.clock(&access(specifier::MSCRATCH, CsrOp::Write, 0x10));
        unit.clock(&CycleInputs {
            control: Some(ControlEvent::SaveCause {
                pc_source: PcSource::Fetch,
                cause: Cause::new(true, 7),
                enter_debug: false,
            }),
            mtval: 0x77,
            ..access(specifier::MSCRATCH, CsrOp::Set, 0x01)
        });
        assert_eq!(0x11, read(&unit, specifier::MSCRATCH));
        assert_eq!(0x11, read(&unit, specifier::MNSCRATCH));
        assert_eq!(0x77, read(&unit, specifier::MTVAL));
        assert_eq!(0x8000_0007, read(&unit, specifier::MNCAUSE));
    }

    #[test]
    fn test_counters() {
        let mut unit = unit();
        let retire = CycleInputs {
            events: PerformanceEvents {
                instr_ret: true,
                load: true,
                ..PerformanceEvents::default()
            },
            ..CycleInputs::default()
        };
        unit.clock(&retire);
        unit.clock(&retire);
        assert_eq!(2, read(&unit, specifier::MCYCLE));
        assert_eq!(2, read(&unit, specifier::MINSTRET));
        assert_eq!(2, read(&unit, specifier::MHPMCOUNTER31 - 31 + 5));
        assert_eq!(1 << 5, read(&unit, specifier::MHPMEVENT3 + 2));

        // Inhibit minstret.
        unit.clock(&access(specifier::MCOUNTINHIBIT, CsrOp::Write, 1 << 2));
        unit.clock(&retire);
        assert_eq!(2, unit.counters().counter(2));
        assert_eq!(4, unit.counters().counter(0));

        // A write overrides the same-cycle increment.
        unit.clock(&access(specifier::MCYCLE, CsrOp::Write, 100));
        assert_eq!(100, unit.counters().counter(0));
        unit.clock(&access(specifier::MCYCLEH, CsrOp::Write, 1));
        assert_eq!(0x1_0000_0064, unit.counters().counter(0));
        unit.clock(&CycleInputs::default());
        assert_eq!(0x1_0000_0065, unit.counters().counter(0));
        assert_eq!(1, read(&unit, specifier::CYCLEH));
    }

    #[test]
    fn test_unimplemented_counters() {
        let config = Config {
            hpm_counters: 1,
            ..Config::default()
        };
        let mut unit = CsrUnit::new(config).unwrap();
        unit.clock(&access(specifier::MINSTRET + 2, CsrOp::Write, 9));
        assert_eq!(0, read(&unit, specifier::MINSTRET + 2));
        assert_eq!(0, read(&unit, specifier::MHPMEVENT3 + 1));
        unit.clock(&access(specifier::MCOUNTINHIBIT, CsrOp::Write, 0xFFFF_FFFF));
        assert_eq!(0b1101, read(&unit, specifier::MCOUNTINHIBIT));
        assert!(unit.evaluate(&access(specifier::TIME, CsrOp::Read, 0)).illegal);
    }

    #[test]
    fn test_interrupt_outputs() {
        let mut unit = unit();
        let lines = CycleInputs {
            irq_timer: true,
            irq_fast: 0x0001,
            ..CycleInputs::default()
        };
        let outputs = unit.evaluate(&lines);
        assert_eq!(0, outputs.irqs);
        assert!(!outputs.irq_pending);

        unit.clock(&access(specifier::MIE, CsrOp::Write, 1 << 7));
        let outputs = unit.evaluate(&lines);
        assert_eq!(1 << 7, outputs.irqs);
        assert!(outputs.irq_pending);

        let mip = CycleInputs {
            irq_timer: true,
            irq_fast: 0x0001,
            ..access(specifier::MIP, CsrOp::Read, 0)
        };
        assert_eq!((1 << 7) | (1 << 16), unit.evaluate(&mip).rdata);
        // mip ignores writes.
        unit.clock(&access(specifier::MIP, CsrOp::Write, 0xFFFF_FFFF));
        assert_eq!(0, read(&unit, specifier::MIP));
    }

    #[test]
    fn test_lsu_privilege() {
        let mut unit = unit();
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, 1 << 17));
        let outputs = unit.evaluate(&CycleInputs::default());
        assert_eq!(PrivilegeLevel::Machine, outputs.priv_mode_id);
        assert_eq!(PrivilegeLevel::User, outputs.priv_mode_lsu);
        assert!(!outputs.mstatus_tw);
    }

    #[test]
    fn test_mnret_to_user_drops_lsu_override() {
        let mut unit = unit();
        enter_user_mode(&mut unit);
        unit.clock(&CycleInputs {
            pc_if: 0x0000_0200,
            control: Some(ControlEvent::SaveCause {
                pc_source: PcSource::Fetch,
                cause: Cause::new(false, 8),
                enter_debug: false,
            }),
            ..CycleInputs::default()
        });
        assert_eq!(PrivilegeLevel::User, unit.mnstatus().mpp());

        // The handler sets MPRV with MPP = Machine, then returns to user mode.
        unit.clock(&access(specifier::MSTATUS, CsrOp::Write, (1 << 17) | (0b11 << 11)));
        unit.clock(&control(ControlEvent::Mnret));

        let outputs = unit.evaluate(&CycleInputs::default());
        assert_eq!(PrivilegeLevel::User, outputs.priv_mode_id);
        assert_eq!(outputs.priv_mode_id, outputs.priv_mode_lsu);
        assert!(!unit.mstatus().mprv());
    }

    #[test]
    fn test_mtvec_init() {
        let mut unit = unit();
        unit.clock(&CycleInputs {
            mtvec_init: Some(0x8000_00C0),
            ..access(specifier::MTVEC, CsrOp::Write, 0x1000_0000)
        });
        assert_eq!(0x8000_0001, unit.evaluate(&CycleInputs::default()).mtvec);
        unit.clock(&access(specifier::MTVEC, CsrOp::Write, 0x2000_0042));
        assert_eq!(0x2000_0001, read(&unit, specifier::MTVEC));
    }

    #[test]
    fn test_pmp_through_csrs() {
        let mut unit = unit();
        unit.clock(&access(specifier::PMPADDR0, CsrOp::Write, 0x2000_0000));
        // Entry 0: R + X, NAPOT, locked.
        unit.clock(&access(specifier::PMPCFG0, CsrOp::Write, 0x9D));
        unit.clock(&access(specifier::PMPCFG0, CsrOp::Clear, 0xFF));
        unit.clock(&access(specifier::PMPADDR0, CsrOp::Write, 0));
        assert_eq!(0x9D, read(&unit, specifier::PMPCFG0));
        assert_eq!(0x2000_0000, read(&unit, specifier::PMPADDR0));

        // RLB cannot be set with a locked entry, MML sticks.
        unit.clock(&access(specifier::MSECCFG, CsrOp::Write, 0b101));
        assert_eq!(0b001, read(&unit, specifier::MSECCFG));
        unit.clock(&access(specifier::MSECCFG, CsrOp::Write, 0));
        assert_eq!(0b001, read(&unit, specifier::MSECCFG));

        let outputs = unit.evaluate(&CycleInputs::default());
        assert_eq!(16, outputs.pmp.entries.len());
        assert!(outputs.pmp.entries[0].0.lock);
        assert_eq!(Some(outputs.pmp.entries[0]), unit.pmp().entry(0));
        assert_eq!(None, unit.pmp().entry(16));
        assert!(outputs.pmp.mseccfg.mml);
        assert_eq!(unit.pmp().outputs(), outputs.pmp);

        // Entries past the configured count read zero.
        assert_eq!(0, read(&unit, specifier::PMPCFG0 + 4));
        assert_eq!(0, read(&unit, specifier::PMPADDR0 + 16));
    }

    #[test]
    fn test_triggers() {
        let mut unit = unit();
        let in_debug = |addr, wdata| CycleInputs {
            debug_mode: true,
            ..access(addr, CsrOp::Write, wdata)
        };
        unit.clock(&in_debug(specifier::TDATA2, 0x8000_0020));
        unit.clock(&in_debug(specifier::TDATA1, 1 << 2));
        let fetch = CycleInputs {
            pc_if: 0x8000_0020,
            ..CycleInputs::default()
        };
        assert!(unit.evaluate(&fetch).trigger_match);
        assert_eq!(0x2800_104C, read(&unit, specifier::TDATA1));

        // Outside debug mode the write is legal but has no effect.
        let outputs = unit.clock(&access(specifier::TDATA1, CsrOp::Write, 0));
        assert!(!outputs.illegal);
        assert!(unit.evaluate(&fetch).trigger_match);

        let config = Config {
            trigger_count: 0,
            ..Config::default()
        };
        let unit = CsrUnit::new(config).unwrap();
        assert!(unit.evaluate(&access(specifier::TSELECT, CsrOp::Read, 0)).illegal);
        assert!(!unit.evaluate(&fetch).trigger_match);
    }
}
