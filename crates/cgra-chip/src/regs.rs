//! Register and resource IDs of the CGRA configuration port.
//!
//! These are the values that go into the target ID field of a
//! [`BusAddress`](crate::BusAddress) for the `SingleRegister` and `Other`
//! target classes, plus the run states written to the state change register.
//!
//! ```text
//! SingleRegister  0 StateChange   1 LogDest   2 LogDestBound   3 LogDestInc
//!                 4 OcmDest       5 OcmDestBound  6 OcmDestInc
//!                 7 IntervalLength  8 ExpectedParameterCount
//!                 9 MultirateCounterReset
//! Other           0 Ccu  1 CBox  2 CBoxEval0  3 Idc  4 Sensor  5 Actor
//!                 6 GlobalLog  7 Ocm  8 OcmOutput  9 ConstBuffer
//! ```

// ── Processing elements ──────────────────────────────────────────────────────

/// Target ID offset from a PE to its log context.
pub const PE_LOG_ID_OFFSET: u32 = 4;

// ── Single registers ─────────────────────────────────────────────────────────

/// Single configuration registers. Order matters, do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SingleRegister {
    /// Run state change (payload built with [`encode_state`](crate::encode_state)).
    StateChange = 0,
    /// Log destination base address.
    LogDest = 1,
    /// Log destination upper bound (wraps to base past this).
    LogDestBound = 2,
    /// Log destination increment per CGRA cycle.
    LogDestInc = 3,
    /// OCM destination base address.
    OcmDest = 4,
    /// OCM destination upper bound.
    OcmDestBound = 5,
    /// OCM destination increment per CGRA cycle.
    OcmDestInc = 6,
    /// Clock cycles of one complete CGRA cycle.
    IntervalLength = 7,
    /// Host results expected before the CGRA continues.
    ExpectedParameterCount = 8,
    /// Reset value of the multirate counter (0 biased).
    MultirateCounterReset = 9,
}

impl SingleRegister {
    /// Target ID on the bus.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }
}

// ── Other resources ──────────────────────────────────────────────────────────

/// Non-PE resources holding contexts or tables. Order matters, do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OtherResource {
    /// Central control unit context.
    Ccu = 0,
    /// Condition box context.
    CBox = 1,
    /// Condition box evaluation block 0 context.
    CBoxEval0 = 2,
    /// ID context (bus address → PE / register file mapping).
    Idc = 3,
    /// Sensor context.
    Sensor = 4,
    /// Actor context.
    Actor = 5,
    /// Global log context.
    GlobalLog = 6,
    /// OCM input context.
    Ocm = 7,
    /// OCM output context.
    OcmOutput = 8,
    /// Constant look-up table.
    ConstBuffer = 9,
}

impl OtherResource {
    /// Target ID on the bus.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }
}

// ── Run states ───────────────────────────────────────────────────────────────

/// Run state as encoded in the state change register. Order matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RunState {
    /// Not running; counters, parameters and addresses untouched.
    Paused = 0,
    /// Running the schedule on its own.
    Running = 1,
    /// Not running; volatile state is reset.
    Stopped = 2,
    /// Running and cooperating with the host on each control cycle.
    RunningHybrid = 3,
}
