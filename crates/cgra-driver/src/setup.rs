//! CGRA setup and reset sequencing
//!
//! `setup` runs the full initialization in four phases, strictly in order:
//!
//! ```text
//! 1. single registers   cycle clocks, expected host results, OCM window, log window
//! 2. contexts           PEs, PE logs, CCU, C-box, OCM in/out, global log, actor, sensor
//! 3. constants          constant look-up table
//! 4. parameters         ID context, initial run-time parameters, static parameters
//! ```
//!
//! `reset` repeats phases 1 and the parameter part of 4: counters and
//! addresses revert on stop, programmed contexts do not.
//!
//! Nothing is retried. A bus error aborts the remaining sequence.

use crate::bus::BusWriter;
use crate::coalesce::{send_range, RangeCoalescer};
use crate::composition::{Composition, ContextTable};
use crate::config::SetupData;
use crate::error::Result;
use crate::params::ParameterArrayRef;
use crate::stream::send_stream;
use cgra_chip::regs::PE_LOG_ID_OFFSET;
use cgra_chip::{BusAddress, OtherResource, SingleRegister, TargetClass};
use tracing::{debug, info, warn};

/// Drives setup, reset and parameter updates of one CGRA instance.
#[derive(Debug)]
pub struct SetupOrchestrator<'a, B: BusWriter> {
    bus: B,
    composition: &'a Composition,
    coalescer: RangeCoalescer,
}

impl<'a, B: BusWriter> SetupOrchestrator<'a, B> {
    /// Create an orchestrator writing to `bus` for `composition`.
    pub fn new(bus: B, composition: &'a Composition) -> Self {
        let coalescer =
            RangeCoalescer::new(composition.max_dirty_footprint(), composition.parameter_layout);
        Self {
            bus,
            composition,
            coalescer,
        }
    }

    /// The bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The bus, mutably.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// The composition being configured.
    pub fn composition(&self) -> &'a Composition {
        self.composition
    }

    /// Check the composition and `config` without sending anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first inconsistency found.
    pub fn validate(&self, config: &SetupData) -> Result<()> {
        self.composition.validate()?;
        config.validate(self.composition)?;
        if !self.composition.lookup_is_monotonic() {
            warn!("run-time parameter lookup is not monotonic, ranges go out in table order");
        }
        Ok(())
    }

    /// Run the complete setup. Does not change the run state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` before any transaction if `config` or the
    /// composition is inconsistent, or the first bus error.
    pub fn setup(&mut self, config: &SetupData) -> Result<()> {
        self.validate(config)?;
        info!("CGRA setup via {} bus", self.bus.bus_type());

        self.init_single_transfers(config)?;
        self.init_contexts(config)?;
        self.init_consts(config)?;
        self.init_parameters(config)?;

        info!("CGRA setup complete");
        Ok(())
    }

    /// Re-send single registers and parameters, leaving contexts alone.
    ///
    /// After a reset the next run behaves as if `setup` had just completed.
    ///
    /// # Errors
    ///
    /// Same as [`setup`](Self::setup).
    pub fn reset(&mut self, config: &SetupData) -> Result<()> {
        self.reset_with(config, &config.initial_run_time_parameters())
    }

    /// Reset using `parameters` instead of the initial run-time set.
    ///
    /// # Errors
    ///
    /// Same as [`setup`](Self::setup).
    pub fn reset_with(&mut self, config: &SetupData, parameters: &ParameterArrayRef<'_>) -> Result<()> {
        self.validate(config)?;
        info!("CGRA reset");

        self.init_single_transfers(config)?;
        self.reset_parameters(config, parameters)
    }

    /// Send the dirty run-time parameters.
    ///
    /// Returns the number of ID ranges sent.
    ///
    /// # Errors
    ///
    /// Returns the first bus error.
    ///
    /// # Panics
    ///
    /// Panics if `parameters` has no dirty flags or is malformed.
    pub fn set_run_time_parameters(
        &mut self,
        parameters: &ParameterArrayRef<'_>,
        max_burst_words: usize,
    ) -> Result<usize> {
        self.coalescer.send_dirty(
            &mut self.bus,
            parameters,
            &self.composition.run_time_parameter_map,
            max_burst_words,
        )
    }

    /// Send all host results, ignoring dirty flags.
    ///
    /// Returns the number of words sent.
    ///
    /// # Errors
    ///
    /// Returns the first bus error.
    pub fn set_host_results(
        &mut self,
        parameters: &ParameterArrayRef<'_>,
        max_burst_words: usize,
    ) -> Result<usize> {
        send_range(
            &mut self.bus,
            parameters.parameters(),
            &self.composition.host_result_range,
            self.composition.parameter_layout,
            max_burst_words,
        )
    }

    /// Change the CGRA cycle length and the integration step size.
    ///
    /// # Errors
    ///
    /// Returns the first bus error.
    pub fn set_cycle_parameters(&mut self, config: &SetupData, integration_step_size: &[u32]) -> Result<()> {
        self.write_single_register(SingleRegister::IntervalLength, config.cycle_clock_count)?;
        send_range(
            &mut self.bus,
            integration_step_size,
            &self.composition.integration_step_size_range,
            self.composition.parameter_layout,
            config.max_transaction_length,
        )?;
        Ok(())
    }

    /// Send the multirate counter reset value from `config`.
    ///
    /// # Errors
    ///
    /// Returns the bus error.
    pub fn set_multirate_counter_reset_value(&mut self, config: &SetupData) -> Result<()> {
        self.write_single_register(
            SingleRegister::MultirateCounterReset,
            config.multirate_counter_internal(),
        )
    }

    /// Send constant look-up table data.
    ///
    /// Returns the number of bursts issued.
    ///
    /// # Errors
    ///
    /// Returns the first bus error.
    pub fn set_const_lut_data(&mut self, constants: &[u32], max_burst_words: usize) -> Result<usize> {
        let addr = BusAddress::encode(TargetClass::Other, OtherResource::ConstBuffer.id(), 0);
        send_stream(&mut self.bus, constants, 1, addr, max_burst_words)
    }

    /// Stop sending log data.
    ///
    /// # Panics
    ///
    /// Always: log control is not implemented.
    pub fn disable_log(&mut self) {
        unimplemented!("disabling the CGRA log is not implemented");
    }

    /// Resume sending log data.
    ///
    /// # Panics
    ///
    /// Always: log control is not implemented.
    pub fn enable_log(&mut self) {
        unimplemented!("enabling the CGRA log is not implemented");
    }

    /// Write one single register.
    ///
    /// # Errors
    ///
    /// Returns the bus error.
    pub fn write_single_register(&mut self, register: SingleRegister, value: u32) -> Result<()> {
        let addr = BusAddress::encode(TargetClass::SingleRegister, register.id(), 0);
        debug!("{register:?} = {value:#x}");
        self.bus.write(addr, &[value], 1)
    }

    fn init_single_transfers(&mut self, config: &SetupData) -> Result<()> {
        info!("Sending single registers");
        let registers = [
            (SingleRegister::IntervalLength, config.cycle_clock_count),
            (SingleRegister::ExpectedParameterCount, config.expected_host_results),
            (SingleRegister::OcmDest, config.ocm_lower_addr),
            (SingleRegister::OcmDestBound, config.ocm_upper_addr),
            (SingleRegister::OcmDestInc, config.ocm_inc_addr),
            (SingleRegister::LogDest, config.log_lower_addr),
            (SingleRegister::LogDestBound, config.log_upper_addr),
            (SingleRegister::LogDestInc, config.log_inc_addr),
        ];
        for (register, value) in registers {
            self.write_single_register(register, value)?;
        }
        Ok(())
    }

    fn init_contexts(&mut self, config: &SetupData) -> Result<()> {
        info!("Sending contexts");
        let max = config.max_transaction_length;
        let composition = self.composition;

        for (pe, context) in (0u32..).zip(&composition.pe_contexts) {
            self.send_context(TargetClass::ProcessingElement, pe, context, max)?;
        }
        for (pe, context) in (0u32..).zip(&composition.pe_log_contexts) {
            self.send_context(TargetClass::ProcessingElement, pe + PE_LOG_ID_OFFSET, context, max)?;
        }
        for (resource, context) in composition.other_contexts() {
            self.send_context(TargetClass::Other, resource.id(), context, max)?;
        }
        Ok(())
    }

    fn init_consts(&mut self, config: &SetupData) -> Result<()> {
        info!("Sending {} constants", self.composition.constants.len());
        let constants = &self.composition.constants;
        let addr = BusAddress::encode(TargetClass::Other, OtherResource::ConstBuffer.id(), 0);
        send_stream(&mut self.bus, constants, 1, addr, config.max_transaction_length)?;
        Ok(())
    }

    fn init_parameters(&mut self, config: &SetupData) -> Result<()> {
        info!("Sending ID context and parameters");
        let composition = self.composition;
        self.send_context(
            TargetClass::Other,
            OtherResource::Idc.id(),
            &composition.idc,
            config.max_transaction_length,
        )?;
        self.reset_parameters(config, &config.initial_run_time_parameters())
    }

    fn reset_parameters(&mut self, config: &SetupData, parameters: &ParameterArrayRef<'_>) -> Result<()> {
        let max = config.max_transaction_length;
        self.set_run_time_parameters(parameters, max)?;
        send_range(
            &mut self.bus,
            &self.composition.static_parameters,
            &self.composition.static_parameter_range,
            self.composition.parameter_layout,
            max,
        )?;
        Ok(())
    }

    fn send_context(
        &mut self,
        class: TargetClass,
        id: u32,
        context: &ContextTable,
        max_burst_words: usize,
    ) -> Result<()> {
        let addr = BusAddress::encode(class, id, 0);
        send_stream(&mut self.bus, context.entries(), context.words_per_entry(), addr, max_burst_words)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{RecordingBus, Transaction};

    fn classes(transactions: &[Transaction]) -> Vec<TargetClass> {
        transactions.iter().map(Transaction::target_class).collect()
    }

    #[test]
    fn setup_phases_in_order() {
        let composition = Composition::static_4pe();
        let config = SetupData::default();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.setup(&config).unwrap();

        let t = orch.bus().transactions();
        // 8 single registers
        assert!(classes(&t[..8]).iter().all(|c| *c == TargetClass::SingleRegister));
        assert_eq!(t[0].address.target_id(), SingleRegister::IntervalLength.id());
        assert_eq!(t[0].data, vec![50_000]);
        // 8 PE contexts + 7 other contexts, one burst each
        assert!(classes(&t[8..16]).iter().all(|c| *c == TargetClass::ProcessingElement));
        assert_eq!(t[12].address.target_id(), PE_LOG_ID_OFFSET);
        assert!(classes(&t[16..23]).iter().all(|c| *c == TargetClass::Other));
        // constants, then IDC
        assert_eq!(t[23].address.target_id(), OtherResource::ConstBuffer.id());
        assert_eq!(t[23].data.len(), 16);
        assert_eq!(t[24].address.target_id(), OtherResource::Idc.id());
        // dirty {0,1,3,4,6,7} of IDs 4.. → [4,6) [7,9) [10,12), then static [0,4)
        let params: Vec<_> = t[25..].iter().map(|t| (t.address.target_id(), t.data.clone())).collect();
        assert_eq!(
            params,
            vec![(4, vec![1, 2]), (7, vec![4, 5]), (10, vec![7, 8]), (0, vec![0; 4])]
        );
    }

    #[test]
    fn setup_never_touches_state_register() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.setup(&SetupData::default()).unwrap();

        let state_addr = BusAddress::encode(TargetClass::SingleRegister, SingleRegister::StateChange.id(), 0);
        assert!(orch.bus().transactions().iter().all(|t| t.address != state_addr));
    }

    #[test]
    fn reset_skips_contexts_and_constants() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.reset(&SetupData::default()).unwrap();

        let t = orch.bus().transactions();
        assert_eq!(t.len(), 8 + 3 + 1);
        assert!(t.iter().all(|t| matches!(
            t.target_class(),
            TargetClass::SingleRegister | TargetClass::Parameter
        )));
    }

    #[test]
    fn invalid_config_sends_nothing() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        let config = SetupData::default().with_max_transaction_length(0);
        assert!(orch.setup(&config).is_err());
        assert!(orch.bus().is_empty());
    }

    #[test]
    fn small_bursts_split_contexts() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.setup(&SetupData::default().with_max_transaction_length(64)).unwrap();

        let pe0: Vec<_> = orch
            .bus()
            .transactions()
            .iter()
            .filter(|t| t.target_class() == TargetClass::ProcessingElement && t.address.target_id() == 0)
            .collect();
        assert_eq!(pe0.len(), 4);
        assert!(pe0.iter().all(|t| t.len() == 64));
    }

    #[test]
    fn bus_error_aborts_setup() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new().fail_after(10), &composition);
        assert!(orch.setup(&SetupData::default()).is_err());
        assert_eq!(orch.bus().len(), 10);
    }

    #[test]
    fn host_results_sent_in_full() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        let values = [9, 8, 7, 6];
        let dirty = [false, true, false, false];
        let words = orch
            .set_host_results(&ParameterArrayRef::new(&values, &dirty), 256)
            .unwrap();

        assert_eq!(words, 4);
        let t = &orch.bus().transactions()[0];
        assert_eq!(t.address.target_id(), 12);
        assert_eq!(t.data, vec![9, 8, 7, 6]);
    }

    #[test]
    fn cycle_parameters() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        let config = SetupData::default().with_cycle_clock_count(1234);
        orch.set_cycle_parameters(&config, &[42]).unwrap();

        let t = orch.bus().transactions();
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].address.target_id(), SingleRegister::IntervalLength.id());
        assert_eq!(t[0].data, vec![1234]);
        assert_eq!(t[1].target_class(), TargetClass::Parameter);
        assert_eq!(t[1].address.target_id(), 4);
        assert_eq!(t[1].data, vec![42]);
    }

    #[test]
    fn multirate_value_is_unbiased_on_the_wire() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        let mut config = SetupData::default();
        config.multirate_counter_reset_val = 5;
        orch.set_multirate_counter_reset_value(&config).unwrap();
        assert_eq!(orch.bus().transactions()[0].data, vec![4]);
    }

    #[test]
    fn const_lut_data() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        let bursts = orch.set_const_lut_data(&[1; 10], 4).unwrap();
        assert_eq!(bursts, 3);
        assert_eq!(orch.bus().word_count(), 10);
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn enable_log_fails_loudly() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.enable_log();
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn disable_log_fails_loudly() {
        let composition = Composition::static_4pe();
        let mut orch = SetupOrchestrator::new(RecordingBus::new(), &composition);
        orch.disable_log();
    }
}
