//! Setup data for one CGRA instance
//!
//! The caller keeps one [`SetupData`] per accelerator and passes it to every
//! setup and state change call. It must always reflect what was last sent:
//! resets re-send some of these values without the caller asking.

use crate::composition::{Composition, ContextTable};
use crate::error::{CgraError, Result};
use crate::params::ParameterArrayRef;
use cgra_chip::axi::MAX_TRANSACTION_LENGTH;

/// The multirate counter is 1 biased for the host and 0 biased inside the CGRA.
pub const MULTIRATE_COUNTER_BIAS: u32 = 1;

/// Accelerator-wide configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupData {
    /// Log data base address
    pub log_lower_addr: u32,
    /// Log data upper bound (wraps to the base past this)
    pub log_upper_addr: u32,
    /// Log address increment per CGRA cycle
    pub log_inc_addr: u32,
    /// OCM data base address
    pub ocm_lower_addr: u32,
    /// OCM data upper bound
    pub ocm_upper_addr: u32,
    /// OCM address increment per CGRA cycle
    pub ocm_inc_addr: u32,
    /// Clock cycles of one complete CGRA cycle (sensor, execute, log/OCM send)
    pub cycle_clock_count: u32,
    /// CGRA runs per host run (1 biased, 0 when not running multirate)
    pub multirate_counter_reset_val: u32,
    /// Host results awaited before each CGRA run (0 unless supporting the host)
    pub expected_host_results: u32,
    /// Longest AXI burst issued, in transfers
    pub max_transaction_length: usize,
    /// Initial run-time parameter values
    pub initial_parameters: Vec<u32>,
    /// Which initial parameters to send
    pub initial_dirty: Option<Vec<bool>>,
}

impl Default for SetupData {
    fn default() -> Self {
        Self {
            log_lower_addr: 8192,
            log_upper_addr: 16384,
            log_inc_addr: 256,
            ocm_lower_addr: 32768,
            ocm_upper_addr: 65536,
            ocm_inc_addr: 256,
            cycle_clock_count: 50_000,
            multirate_counter_reset_val: 0,
            expected_host_results: 0,
            max_transaction_length: MAX_TRANSACTION_LENGTH,
            initial_parameters: vec![1, 2, 3, 4, 5, 6, 7, 8],
            initial_dirty: Some(vec![true, true, false, true, true, false, true, true]),
        }
    }
}

impl SetupData {
    /// Set the longest AXI burst.
    #[must_use]
    pub fn with_max_transaction_length(mut self, length: usize) -> Self {
        self.max_transaction_length = length;
        self
    }

    /// Set the clock cycles per CGRA cycle.
    #[must_use]
    pub fn with_cycle_clock_count(mut self, clocks: u32) -> Self {
        self.cycle_clock_count = clocks;
        self
    }

    /// Set the log window.
    #[must_use]
    pub fn with_log_window(mut self, lower: u32, upper: u32, inc: u32) -> Self {
        self.log_lower_addr = lower;
        self.log_upper_addr = upper;
        self.log_inc_addr = inc;
        self
    }

    /// Set the OCM window.
    #[must_use]
    pub fn with_ocm_window(mut self, lower: u32, upper: u32, inc: u32) -> Self {
        self.ocm_lower_addr = lower;
        self.ocm_upper_addr = upper;
        self.ocm_inc_addr = inc;
        self
    }

    /// Replace the initial run-time parameters.
    #[must_use]
    pub fn with_initial_parameters(mut self, values: Vec<u32>, dirty: Option<Vec<bool>>) -> Self {
        self.initial_parameters = values;
        self.initial_dirty = dirty;
        self
    }

    /// The initial run-time parameters as a borrowed view.
    pub fn initial_run_time_parameters(&self) -> ParameterArrayRef<'_> {
        match &self.initial_dirty {
            Some(dirty) => ParameterArrayRef::new(&self.initial_parameters, dirty),
            None => ParameterArrayRef::without_flags(&self.initial_parameters),
        }
    }

    /// Multirate counter reset value as the CGRA counts it.
    pub const fn multirate_counter_internal(&self) -> u32 {
        self.multirate_counter_reset_val
            .saturating_sub(MULTIRATE_COUNTER_BIAS)
    }

    /// Check the snapshot against itself and the composition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first inconsistency found.
    pub fn validate(&self, composition: &Composition) -> Result<()> {
        if !(1..=MAX_TRANSACTION_LENGTH).contains(&self.max_transaction_length) {
            return Err(CgraError::invalid_config(format!(
                "max transaction length {} outside 1..={MAX_TRANSACTION_LENGTH}",
                self.max_transaction_length
            )));
        }
        if self.log_lower_addr > self.log_upper_addr {
            return Err(CgraError::invalid_config(format!(
                "log window {:#x}..{:#x} is inverted",
                self.log_lower_addr, self.log_upper_addr
            )));
        }
        if self.ocm_lower_addr > self.ocm_upper_addr {
            return Err(CgraError::invalid_config(format!(
                "OCM window {:#x}..{:#x} is inverted",
                self.ocm_lower_addr, self.ocm_upper_addr
            )));
        }

        let words = composition.parameter_layout.words;
        if words == 0 || self.initial_parameters.len() % words != 0 {
            return Err(CgraError::invalid_config(format!(
                "{} initial parameter words are not whole {words}-word parameters",
                self.initial_parameters.len()
            )));
        }
        let count = self.initial_parameters.len() / words;
        if count > composition.run_time_parameter_count() {
            return Err(CgraError::invalid_config(format!(
                "{count} initial parameters, composition has {}",
                composition.run_time_parameter_count()
            )));
        }
        match &self.initial_dirty {
            None => {
                return Err(CgraError::invalid_config(
                    "initial run-time parameters need dirty flags",
                ));
            }
            Some(dirty) if dirty.len() != count => {
                return Err(CgraError::invalid_config(format!(
                    "{} dirty flags for {count} initial parameters",
                    dirty.len()
                )));
            }
            Some(_) => {}
        }
        let longest = composition
            .pe_contexts
            .iter()
            .chain(&composition.pe_log_contexts)
            .chain(composition.other_contexts().map(|(_, context)| context))
            .chain(std::iter::once(&composition.idc))
            .map(ContextTable::words_per_entry)
            .fold(words, usize::max);
        if longest > self.max_transaction_length {
            return Err(CgraError::invalid_config(format!(
                "{longest}-word entries do not fit a {}-transfer burst",
                self.max_transaction_length
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_for_static_4pe() {
        SetupData::default()
            .validate(&Composition::static_4pe())
            .unwrap();
    }

    #[test]
    fn zero_burst_rejected() {
        let data = SetupData::default().with_max_transaction_length(0);
        assert!(data.validate(&Composition::static_4pe()).is_err());
    }

    #[test]
    fn oversized_burst_rejected() {
        let data = SetupData::default().with_max_transaction_length(257);
        assert!(data.validate(&Composition::static_4pe()).is_err());
    }

    #[test]
    fn inverted_window_rejected() {
        let data = SetupData::default().with_log_window(100, 50, 4);
        let err = data.validate(&Composition::static_4pe()).unwrap_err();
        assert!(err.to_string().contains("log window"));
    }

    #[test]
    fn dirty_count_mismatch_rejected() {
        let data = SetupData::default().with_initial_parameters(vec![1, 2], Some(vec![true]));
        assert!(data.validate(&Composition::static_4pe()).is_err());
    }

    #[test]
    fn too_many_initial_parameters_rejected() {
        let data = SetupData::default().with_initial_parameters(vec![0; 9], None);
        assert!(data.validate(&Composition::static_4pe()).is_err());
    }

    #[test]
    fn missing_initial_flags_rejected() {
        let data = SetupData::default().with_initial_parameters(vec![1, 2], None);
        let err = data.validate(&Composition::static_4pe()).unwrap_err();
        assert!(err.to_string().contains("need dirty flags"));
    }

    #[test]
    fn multirate_is_unbiased() {
        let mut data = SetupData::default();
        assert_eq!(data.multirate_counter_internal(), 0);
        data.multirate_counter_reset_val = 1;
        assert_eq!(data.multirate_counter_internal(), 0);
        data.multirate_counter_reset_val = 4;
        assert_eq!(data.multirate_counter_internal(), 3);
    }
}
