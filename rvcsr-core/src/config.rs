//! Build-time parameters of the CSR unit.

use thiserror::Error;

/// Maximum number of PMP entries addressable through `pmpaddr0..=pmpaddr63`.
pub const MAX_PMP_ENTRIES: u8 = 64;

/// Maximum number of event counters (`mhpmcounter3` onwards) that have an event wired to them.
pub const MAX_HPM_COUNTERS: u8 = 10;

/// Maximum number of debug triggers.
pub const MAX_TRIGGERS: u8 = 16;

/// Parameters fixed for the lifetime of a [`CsrUnit`](crate::CsrUnit).
///
/// These correspond to the elaboration-time parameters of the core: they determine which CSRs
/// exist and how wide some of their fields are, but can never be changed by software.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of the read-only `mhartid` register.
    pub hart_id: u32,
    /// Value of the read-only `mvendorid` register.
    pub vendor_id: u32,
    /// Value of the read-only `marchid` register.
    pub arch_id: u32,
    /// Value of the read-only `mimpid` register.
    pub impl_id: u32,
    /// Number of implemented PMP entries (`0..=64`).
    pub pmp_entries: u8,
    /// PMP granularity `G`: the smallest region that can be protected is `2^(G+2)` bytes.
    pub pmp_granularity: u8,
    /// Number of implemented event counters, starting at `mhpmcounter3` (`0..=10`).
    pub hpm_counters: u8,
    /// Number of debug triggers. `0` disables the trigger CSRs altogether.
    pub trigger_count: u8,
    /// Reset value of `mtvec`.
    pub mtvec_reset: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hart_id: 0,
            vendor_id: 0,
            arch_id: 0,
            impl_id: 0,
            pmp_entries: 16,
            pmp_granularity: 0,
            hpm_counters: MAX_HPM_COUNTERS,
            trigger_count: 1,
            mtvec_reset: 0x0000_0001,
        }
    }
}

impl Config {
    /// Check that all parameters are within the ranges supported by the implementation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pmp_entries > MAX_PMP_ENTRIES {
            return Err(ConfigError::TooManyPmpEntries(self.pmp_entries));
        }
        // pmpaddr holds bits 33:2 of an address, so G can be at most 30.
        if self.pmp_granularity > 30 {
            return Err(ConfigError::PmpGranularity(self.pmp_granularity));
        }
        if self.hpm_counters > MAX_HPM_COUNTERS {
            return Err(ConfigError::TooManyHpmCounters(self.hpm_counters));
        }
        if self.trigger_count > MAX_TRIGGERS {
            return Err(ConfigError::TooManyTriggers(self.trigger_count));
        }
        Ok(())
    }

    /// Returns `true` if the debug trigger CSRs are present.
    pub fn triggers_enabled(&self) -> bool {
        self.trigger_count > 0
    }
}

/// Errors that can occur when validating a [`Config`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} PMP entries requested, at most {} are supported", MAX_PMP_ENTRIES)]
    TooManyPmpEntries(u8),
    #[error("PMP granularity {0} is out of range (0..=30)")]
    PmpGranularity(u8),
    #[error("{0} event counters requested, at most {} events are wired", MAX_HPM_COUNTERS)]
    TooManyHpmCounters(u8),
    #[error("{0} debug triggers requested, at most {} are supported", MAX_TRIGGERS)]
    TooManyTriggers(u8),
}
