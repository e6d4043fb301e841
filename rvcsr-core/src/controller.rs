//! Privilege and exception/debug controller.
//!
//! The controller owns all privilege level transitions. On every clock edge at most one
//! [`ControlEvent`] is applied, after the same-cycle CSR write, so the fields it assigns take
//! precedence over software.

use log::debug;

use crate::trap::Cause;
use crate::unit::{CsrState, CycleInputs};
use crate::PrivilegeLevel;

/// Pipeline stage whose program counter is captured on trap entry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PcSource {
    /// The instruction fetch stage (e.g. instruction access faults).
    #[default]
    Fetch,
    /// The instruction decode stage (e.g. illegal instructions, `ecall`, `ebreak`).
    Decode,
}

/// Exception entry or return, as signalled by the pipeline's controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Enter a trap handler, or debug mode if `enter_debug` is set.
    SaveCause {
        pc_source: PcSource,
        cause: Cause,
        enter_debug: bool,
    },
    /// Return from a machine mode trap handler.
    Mret,
    /// Return from the resumable NMI handler.
    Mnret,
    /// Return from debug mode.
    Dret,
}

impl ControlEvent {
    /// Apply this event to `next`, the state that will be committed at the clock edge.
    ///
    /// Every value the event depends on is taken from `current`, the state before the edge.
    /// `write_value` is the value computed by this cycle's CSR operation.
    pub(crate) fn apply(
        &self,
        current: &CsrState,
        next: &mut CsrState,
        inputs: &CycleInputs,
        write_value: u32,
    ) {
        match *self {
            ControlEvent::SaveCause {
                pc_source,
                cause,
                enter_debug,
            } => {
                let pc = match pc_source {
                    PcSource::Fetch => inputs.pc_if,
                    PcSource::Decode => inputs.pc_id,
                };
                if enter_debug {
                    debug!(
                        "Entering debug mode from {} at {pc:#010x}, cause {:?}",
                        current.privilege, inputs.debug_cause
                    );
                    next.privilege = PrivilegeLevel::Machine;
                    next.debug.dcsr.set_prv(current.privilege);
                    next.debug.dcsr.set_cause(inputs.debug_cause);
                    next.debug.write_dpc(pc);
                } else if inputs.debug_mode {
                    debug!("Trap at {pc:#010x} taken in debug mode; no state is saved");
                } else {
                    debug!(
                        "Trap from {} at {pc:#010x}, cause {:#010x}",
                        current.privilege,
                        cause.read()
                    );
                    next.privilege = PrivilegeLevel::Machine;
                    next.trap.mtval = inputs.mtval;
                    next.mnstatus.set_mie(false);
                    next.mnstatus.set_mpie(current.mstatus.mie());
                    next.mnstatus.set_mpp(current.privilege);
                    next.trap.nmi.write_epc(pc);
                    next.trap.nmi.cause = cause;
                    next.trap.mnscratch = write_value;
                }
            }
            ControlEvent::Dret => {
                debug!("Returning from debug mode to {}", current.debug.dcsr.prv());
                next.privilege = current.debug.dcsr.prv();
            }
            ControlEvent::Mret => {
                let mstatus = &current.mstatus;
                debug!("MRET to {} at {:#010x}", mstatus.mpp(), current.trap.machine.read_epc());
                next.privilege = mstatus.mpp();
                next.mstatus.set_mie(mstatus.mpie());
                if mstatus.mpp() != PrivilegeLevel::Machine {
                    next.mstatus.set_mprv(false);
                }
                if inputs.nmi_mode {
                    next.mstatus.set_mpie(current.mnstatus.mpie());
                    next.mstatus.set_mpp(current.mnstatus.mpp());
                    next.trap.machine = current.trap.machine.clone();
                } else {
                    next.mstatus.set_mpie(true);
                    next.mstatus.set_mpp(PrivilegeLevel::User);
                }
            }
            ControlEvent::Mnret => {
                let mnstatus = &current.mnstatus;
                debug!("MNRET to {} at {:#010x}", mnstatus.mpp(), current.trap.nmi.read_epc());
                next.privilege = mnstatus.mpp();
                next.mnstatus.set_mie(mnstatus.mpie());
                if mnstatus.mpp() != PrivilegeLevel::Machine {
                    next.mstatus.set_mprv(false);
                }
                if inputs.nmi_mode {
                    next.mstatus.set_mpie(mnstatus.mpie());
                    next.mstatus.set_mpp(mnstatus.mpp());
                    next.trap.machine.write_epc(current.trap.nmi.read_epc());
                    next.trap.machine.cause = current.trap.nmi.cause;
                } else {
                    next.mnstatus.set_mpie(true);
                    next.mnstatus.set_mpp(PrivilegeLevel::User);
                }
            }
        }
    }
}
