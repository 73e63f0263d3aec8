//! Bus-write abstraction
//!
//! Everything above this trait decides *what* to send and in which pieces;
//! implementations only issue one bounded transaction per call.

use crate::error::Result;
use cgra_chip::BusAddress;
use std::fmt::Debug;

/// One AXI write transaction to the CGRA configuration port.
pub trait BusWriter: Debug {
    /// Issue exactly one burst of `data.len()` words starting at `address`.
    ///
    /// The burst carries whole entries of `words_per_entry` words. Each entry
    /// occupies one 4-byte offset step; all words of an entry target that
    /// step. Callers guarantee the burst is legal: at most the configured
    /// maximum transaction length and not crossing a 4 KB boundary.
    ///
    /// # Errors
    ///
    /// Returns error if the transport cannot issue the transaction.
    fn write(&mut self, address: BusAddress, data: &[u32], words_per_entry: usize) -> Result<()>;

    /// Backend type for debugging
    fn bus_type(&self) -> BusType;
}

impl<B: BusWriter + ?Sized> BusWriter for &mut B {
    fn write(&mut self, address: BusAddress, data: &[u32], words_per_entry: usize) -> Result<()> {
        (**self).write(address, data, words_per_entry)
    }

    fn bus_type(&self) -> BusType {
        (**self).bus_type()
    }
}

impl<B: BusWriter + ?Sized> BusWriter for Box<B> {
    fn write(&mut self, address: BusAddress, data: &[u32], words_per_entry: usize) -> Result<()> {
        (**self).write(address, data, words_per_entry)
    }

    fn bus_type(&self) -> BusType {
        (**self).bus_type()
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    /// In-memory transaction log (dry run, tests)
    Recording,

    /// Memory-mapped device window
    Mmio,
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recording => write!(f, "Recording"),
            Self::Mmio => write!(f, "MMIO"),
        }
    }
}
