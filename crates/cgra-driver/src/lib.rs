//! Host-side configuration driver for the UltraSynth CGRA.
//!
//! Turns configuration intents (set the accelerator up, change its run
//! state, push new parameter values) into a correctly ordered, correctly
//! bounded sequence of AXI write transactions.
//!
//! # Layering
//!
//! ```text
//! StateController      run / pause / stop, stop resets
//!   SetupOrchestrator  four-phase setup, reset, parameter updates
//!     RangeCoalescer   dirty parameters → fewest contiguous ID ranges
//!       send_stream    one transfer → boundary- and length-legal bursts
//!         BusWriter    one burst on the bus (RecordingBus, MmioBus)
//! ```
//!
//! # Quick start
//!
//! ```
//! use cgra_driver::{Command, Composition, RecordingBus, SetupData, StateController};
//!
//! # fn main() -> cgra_driver::Result<()> {
//! let composition = Composition::static_4pe();
//! let config = SetupData::default();
//!
//! let mut cgra = StateController::with_bus(RecordingBus::new(), &composition);
//! cgra.orchestrator_mut().setup(&config)?;
//! cgra.change_state(&config, Command::Run)?;
//! cgra.change_state(&config, Command::Stop)?;
//!
//! for t in cgra.orchestrator().bus().transactions() {
//!     println!("{t}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Contract violations
//!
//! Malformed lengths, missing dirty flags and conflicting run parameters
//! are caller bugs and panic. Only bus failures and inconsistent setup data
//! surface as [`CgraError`].

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod bus;
pub mod coalesce;
mod composition;
mod config;
mod error;
mod params;
pub mod setup;
pub mod state;
pub mod stream;

pub use backends::{MmioBus, RecordingBus, Transaction};
pub use bus::{BusType, BusWriter};
pub use coalesce::{send_range, RangeCoalescer};
pub use composition::{Composition, ContextTable, ParameterLayout};
pub use config::{SetupData, MULTIRATE_COUNTER_BIAS};
pub use error::{CgraError, Result};
pub use params::ParameterArrayRef;
pub use setup::SetupOrchestrator;
pub use state::{Command, RunType, StateController};
pub use stream::{send_stream, Burst, BurstPlan};

/// Silicon model (re-exported from cgra-chip).
pub use cgra_chip as chip;
pub use cgra_chip::{BusAddress, IdRange, RunState, TargetClass};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BusAddress, BusWriter, CgraError, Command, Composition, IdRange, ParameterArrayRef,
        RecordingBus, Result, RunState, RunType, SetupData, SetupOrchestrator, StateController,
    };
}
