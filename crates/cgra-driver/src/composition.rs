//! Static per-composition tables
//!
//! Everything the scheduler generates for one CGRA composition: contexts,
//! the ID context, the constant look-up table and the parameter ID maps.
//! The composition root owns a [`Composition`]; drivers only borrow it.

use crate::error::{CgraError, Result};
use cgra_chip::addr::TARGET_ID_WIDTH;
use cgra_chip::regs::PE_LOG_ID_OFFSET;
use cgra_chip::{BusAddress, IdRange, OtherResource, TargetClass};

/// Entries of one context (or table) plus how many transfers each takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTable {
    entries: Vec<u32>,
    words_per_entry: usize,
}

impl ContextTable {
    /// Wrap context words.
    ///
    /// # Panics
    ///
    /// Panics if `entries` is not a whole number of `words_per_entry`-word entries.
    pub fn new(entries: Vec<u32>, words_per_entry: usize) -> Self {
        assert!(
            words_per_entry > 0 && entries.len() % words_per_entry == 0,
            "context of {} words is not a multiple of {words_per_entry} words per entry",
            entries.len()
        );
        Self {
            entries,
            words_per_entry,
        }
    }

    /// Context of `entry_count` all-zero entries.
    pub fn zeroed(entry_count: usize, words_per_entry: usize) -> Self {
        Self::new(vec![0; entry_count * words_per_entry], words_per_entry)
    }

    /// Context words.
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Transfers per entry.
    pub const fn words_per_entry(&self) -> usize {
        self.words_per_entry
    }

    /// Number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len() / self.words_per_entry
    }
}

/// How parameters are laid out on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterLayout {
    /// Width of one parameter in 32-bit words
    pub words: usize,
    /// CGRA and host compute in parallel; also selects the parameter offset
    pub hybrid: bool,
}

impl ParameterLayout {
    /// Bus address of the first ID of `range`.
    pub fn address(&self, range: &IdRange) -> BusAddress {
        BusAddress::encode(TargetClass::Parameter, range.lower(), u32::from(self.hybrid))
    }
}

/// All static data of one composition.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Context of each processing element, indexed by PE ID
    pub pe_contexts: Vec<ContextTable>,
    /// Log context of each processing element, indexed by PE ID
    pub pe_log_contexts: Vec<ContextTable>,
    /// Central control unit context
    pub ccu: ContextTable,
    /// Condition box context
    pub cbox: ContextTable,
    /// Sensor context
    pub sensor: ContextTable,
    /// Actor context
    pub actor: ContextTable,
    /// OCM input context
    pub ocm_in: ContextTable,
    /// OCM output context
    pub ocm_out: ContextTable,
    /// Global log context
    pub global_log: ContextTable,
    /// ID context: bus address to PE / register file mapping
    pub idc: ContextTable,
    /// Constant look-up table, one word per entry
    pub constants: Vec<u32>,
    /// Logical run-time parameter index → internal ID range
    pub run_time_parameter_map: Vec<IdRange>,
    /// Values of the static parameters
    pub static_parameters: Vec<u32>,
    /// Internal IDs of the static parameters
    pub static_parameter_range: IdRange,
    /// Internal IDs of the integration step size
    pub integration_step_size_range: IdRange,
    /// Internal IDs of the host results
    pub host_result_range: IdRange,
    /// Parameter width and hybrid mode
    pub parameter_layout: ParameterLayout,
}

impl Composition {
    /// The 4-PE example composition.
    ///
    /// ```text
    /// PEs            4 (+ 4 log contexts), 256 entries, 1 transfer each
    /// others         CCU, C-box, sensor, actor, OCM in/out, global log, IDC
    /// constants      16 words
    /// static params  IDs [0, 4)
    /// run-time       8 params → IDs [4, 12), integration step size at 4
    /// host results   IDs [12, 16)
    /// ```
    pub fn static_4pe() -> Self {
        const CONTEXT_SIZE: usize = 256;
        let context = || ContextTable::zeroed(CONTEXT_SIZE, 1);

        let mut constants = vec![0; 16];
        constants[0] = 16;
        constants[1] = 15;

        Self {
            pe_contexts: (0..4).map(|_| context()).collect(),
            pe_log_contexts: (0..4).map(|_| context()).collect(),
            ccu: context(),
            cbox: context(),
            sensor: context(),
            actor: context(),
            ocm_in: context(),
            ocm_out: context(),
            global_log: context(),
            idc: context(),
            constants,
            run_time_parameter_map: (4..12).map(IdRange::single).collect(),
            static_parameters: vec![0; 4],
            static_parameter_range: IdRange::new(0, 4),
            integration_step_size_range: IdRange::single(4),
            host_result_range: IdRange::new(12, 16),
            parameter_layout: ParameterLayout {
                words: 1,
                hybrid: false,
            },
        }
    }

    /// Non-PE contexts in transmission order.
    ///
    /// The ID context is not included; it goes out with the parameters.
    pub fn other_contexts(&self) -> [(OtherResource, &ContextTable); 7] {
        [
            (OtherResource::Ccu, &self.ccu),
            (OtherResource::CBox, &self.cbox),
            (OtherResource::Ocm, &self.ocm_in),
            (OtherResource::OcmOutput, &self.ocm_out),
            (OtherResource::GlobalLog, &self.global_log),
            (OtherResource::Actor, &self.actor),
            (OtherResource::Sensor, &self.sensor),
        ]
    }

    /// Number of run-time parameters.
    pub fn run_time_parameter_count(&self) -> usize {
        self.run_time_parameter_map.len()
    }

    /// Most internal IDs a run-time parameter update can touch.
    pub fn max_dirty_footprint(&self) -> usize {
        self.run_time_parameter_map.iter().map(IdRange::len).sum()
    }

    /// Whether the run-time lookup table is ascending and non-overlapping.
    ///
    /// Coalescing emits ranges in lookup order, so only a monotonic table
    /// yields ranges in ascending ID order.
    pub fn lookup_is_monotonic(&self) -> bool {
        self.run_time_parameter_map
            .windows(2)
            .all(|pair| pair[0].upper() <= pair[1].lower())
    }

    /// Check the tables against each other and the address layout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let id_limit = 1u32 << TARGET_ID_WIDTH;

        if self.pe_contexts.len() != self.pe_log_contexts.len() {
            return Err(CgraError::invalid_config(format!(
                "{} PE contexts but {} PE log contexts",
                self.pe_contexts.len(),
                self.pe_log_contexts.len()
            )));
        }
        if self.pe_contexts.len() > PE_LOG_ID_OFFSET as usize {
            return Err(CgraError::invalid_config(format!(
                "{} PEs collide with log context IDs starting at {PE_LOG_ID_OFFSET}",
                self.pe_contexts.len()
            )));
        }
        if self.parameter_layout.words == 0 {
            return Err(CgraError::invalid_config("parameter width is 0 words"));
        }

        let expected = self.static_parameter_range.len() * self.parameter_layout.words;
        if self.static_parameters.len() != expected {
            return Err(CgraError::invalid_config(format!(
                "{} static parameter words, range {} needs {expected}",
                self.static_parameters.len(),
                self.static_parameter_range
            )));
        }

        let fixed = [
            self.static_parameter_range,
            self.integration_step_size_range,
            self.host_result_range,
        ];
        for range in self.run_time_parameter_map.iter().chain(fixed.iter()) {
            if range.upper() > id_limit {
                return Err(CgraError::invalid_config(format!(
                    "parameter IDs {range} do not fit the {TARGET_ID_WIDTH}-bit target ID field"
                )));
            }
        }

        Ok(())
    }
}
