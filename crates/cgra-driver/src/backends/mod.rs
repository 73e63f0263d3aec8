//! Bus backend implementations
//!
//! Two backends available:
//! - **Recording**: keeps every transaction in memory (dry run, tests, CLI)
//! - **Mmio**: memory-mapped device window (UIO node, `/dev/mem` slice, file)

pub mod mmio;
pub mod recording;

pub use mmio::MmioBus;
pub use recording::{RecordingBus, Transaction};
