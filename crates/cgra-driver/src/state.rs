//! CGRA run state control
//!
//! State changes are single fire-and-forget writes to the state change
//! register; acknowledgement is the interrupt layer's business. A stop also
//! resets the volatile configuration (single registers and parameters).
//!
//! ```text
//!            Run                 Pause               Stop
//! any ──► Running / RunningHybrid ──► Paused ──► Stopped + reset
//! ```

use crate::bus::BusWriter;
use crate::composition::Composition;
use crate::config::SetupData;
use crate::error::Result;
use crate::params::ParameterArrayRef;
use crate::setup::SetupOrchestrator;
use cgra_chip::{encode_state, RunState, SingleRegister};
use tracing::info;

/// Command from the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start running the schedule
    Run,
    /// Halt without touching counters, parameters or addresses
    Pause,
    /// Halt and reset counters, parameters and addresses
    Stop,
}

/// How a run cooperates with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    /// The CGRA computes control cycles on its own and writes parameters
    /// whenever possible.
    Run,
    /// The CGRA waits for `expected_host_results` host results each cycle.
    Support,
    /// The CGRA runs `multirate_counter_reset_val` times per host run and
    /// never waits for host results.
    Multirate,
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Support => write!(f, "support"),
            Self::Multirate => write!(f, "multirate"),
        }
    }
}

/// Run state machine of one CGRA instance.
#[derive(Debug)]
pub struct StateController<'a, B: BusWriter> {
    orchestrator: SetupOrchestrator<'a, B>,
    state: RunState,
}

impl<'a, B: BusWriter> StateController<'a, B> {
    /// Wrap an orchestrator. The CGRA is assumed stopped.
    pub fn new(orchestrator: SetupOrchestrator<'a, B>) -> Self {
        Self {
            orchestrator,
            state: RunState::Stopped,
        }
    }

    /// Controller for `composition` writing to `bus`.
    pub fn with_bus(bus: B, composition: &'a Composition) -> Self {
        Self::new(SetupOrchestrator::new(bus, composition))
    }

    /// Last state commanded.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// The orchestrator, for setup and parameter updates.
    pub fn orchestrator(&self) -> &SetupOrchestrator<'a, B> {
        &self.orchestrator
    }

    /// The orchestrator, mutably.
    pub fn orchestrator_mut(&mut self) -> &mut SetupOrchestrator<'a, B> {
        &mut self.orchestrator
    }

    /// Give the orchestrator back.
    pub fn into_orchestrator(self) -> SetupOrchestrator<'a, B> {
        self.orchestrator
    }

    /// Apply `command`.
    ///
    /// # Errors
    ///
    /// Returns the first bus error, or a config error from the stop reset.
    pub fn change_state(&mut self, config: &SetupData, command: Command) -> Result<()> {
        match command {
            Command::Run => self.run(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(config),
        }
    }

    /// Start running; hybrid compositions run hybrid.
    ///
    /// # Errors
    ///
    /// Returns the bus error.
    pub fn run(&mut self) -> Result<()> {
        let state = if self.orchestrator.composition().parameter_layout.hybrid {
            RunState::RunningHybrid
        } else {
            RunState::Running
        };
        self.send_state(state)
    }

    /// Pause. Counters and addresses stay exactly as they are.
    ///
    /// # Errors
    ///
    /// Returns the bus error.
    pub fn pause(&mut self) -> Result<()> {
        self.send_state(RunState::Paused)
    }

    /// Stop, then reset with the initial run-time parameters of `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` before any transaction, leaving the state
    /// unchanged, if `config` is inconsistent; otherwise the first bus error.
    pub fn stop(&mut self, config: &SetupData) -> Result<()> {
        self.orchestrator.validate(config)?;
        self.send_state(RunState::Stopped)?;
        self.orchestrator.reset(config)
    }

    /// Stop, then reset with `parameters` as the run-time parameters.
    ///
    /// # Errors
    ///
    /// Same as [`stop`](Self::stop).
    pub fn stop_with_parameters(
        &mut self,
        config: &SetupData,
        parameters: &ParameterArrayRef<'_>,
    ) -> Result<()> {
        self.orchestrator.validate(config)?;
        self.send_state(RunState::Stopped)?;
        self.orchestrator.reset_with(config, parameters)
    }

    /// Start running with an explicit run type.
    ///
    /// Sends the expected host result count and the multirate counter reset
    /// value before the state change.
    ///
    /// # Errors
    ///
    /// Returns the first bus error.
    ///
    /// # Panics
    ///
    /// Panics before sending anything if `expected_host_results` is non-zero
    /// for a run type other than `Support`, or `multirate_counter_reset_val`
    /// is non-zero for a run type other than `Multirate`.
    pub fn change_state_run(&mut self, config: &SetupData, run_type: RunType) -> Result<()> {
        assert!(
            config.expected_host_results == 0 || run_type == RunType::Support,
            "expected_host_results must be 0 for run type {run_type}"
        );
        assert!(
            config.multirate_counter_reset_val == 0 || run_type == RunType::Multirate,
            "multirate_counter_reset_val must be 0 for run type {run_type}"
        );

        self.orchestrator
            .write_single_register(SingleRegister::ExpectedParameterCount, config.expected_host_results)?;
        self.orchestrator.set_multirate_counter_reset_value(config)?;

        let state = match run_type {
            RunType::Support => RunState::RunningHybrid,
            RunType::Run | RunType::Multirate => RunState::Running,
        };
        self.send_state(state)
    }

    fn send_state(&mut self, state: RunState) -> Result<()> {
        info!("CGRA state {:?} -> {state:?}", self.state);
        self.orchestrator
            .write_single_register(SingleRegister::StateChange, encode_state(state, 0))?;
        self.state = state;
        Ok(())
    }
}
