// SPDX-License-Identifier: AGPL-3.0-only

//! Recording bus backend
//!
//! Implements [`BusWriter`] by appending every transaction to an in-memory
//! log instead of touching hardware. This enables:
//!
//! 1. **Dry runs**: the CLI prints exactly what a setup or state change would
//!    put on the bus.
//! 2. **CI without hardware**: every ordering and splitting property of the
//!    driver is checked against the recorded sequence.
//! 3. **Fault injection**: [`RecordingBus::fail_after`] makes a later write
//!    fail, to check that errors abort the remaining sequence.

use crate::bus::{BusType, BusWriter};
use crate::error::{CgraError, Result};
use cgra_chip::{BusAddress, TargetClass};
use std::fmt;
use tracing::trace;

/// One recorded bus write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Start address of the burst
    pub address: BusAddress,
    /// Words transferred, in order
    pub data: Vec<u32>,
    /// Words per addressed entry
    pub words_per_entry: usize,
}

impl Transaction {
    /// Target class the burst is aimed at.
    pub fn target_class(&self) -> TargetClass {
        self.address.target_class()
    }

    /// Number of words in the burst.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of entries, i.e. offset steps covered.
    pub fn entries(&self) -> usize {
        self.data.len() / self.words_per_entry
    }

    /// Whether the burst carries no data (never produced by the driver).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}/{}/{} len={}",
            self.address,
            self.address.target_class(),
            self.address.target_id(),
            self.address.offset(),
            self.data.len()
        )
    }
}

/// In-memory bus.
#[derive(Debug, Default)]
pub struct RecordingBus {
    transactions: Vec<Transaction>,
    fail_after: Option<usize>,
}

impl RecordingBus {
    /// Create an empty recording bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the first `count` writes succeed and every later one fail.
    #[must_use]
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// All transactions so far, in issue order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of transactions so far.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Total words written over all transactions.
    pub fn word_count(&self) -> usize {
        self.transactions.iter().map(Transaction::len).sum()
    }

    /// Take the recorded transactions, leaving the log empty.
    pub fn take(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    /// Forget all recorded transactions.
    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}

impl BusWriter for RecordingBus {
    fn write(&mut self, address: BusAddress, data: &[u32], words_per_entry: usize) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.transactions.len() >= limit) {
            return Err(CgraError::transfer_failed(format!(
                "injected failure at {address} after {} transactions",
                self.transactions.len()
            )));
        }

        trace!("record {address} len={}", data.len());
        self.transactions.push(Transaction {
            address,
            data: data.to_vec(),
            words_per_entry,
        });
        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::Recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut bus = RecordingBus::new();
        let a = BusAddress::encode(TargetClass::Other, 1, 0);
        let b = BusAddress::encode(TargetClass::Parameter, 2, 0);
        bus.write(a, &[1, 2], 2).unwrap();
        bus.write(b, &[3], 1).unwrap();

        assert_eq!(bus.len(), 2);
        assert_eq!(bus.word_count(), 3);
        assert_eq!(bus.transactions()[0].address, a);
        assert_eq!(bus.transactions()[1].data, vec![3]);
        assert_eq!(bus.transactions()[0].entries(), 1);
        assert_eq!(bus.bus_type(), BusType::Recording);
    }

    #[test]
    fn injected_failure() {
        let mut bus = RecordingBus::new().fail_after(1);
        let a = BusAddress::encode(TargetClass::Other, 1, 0);
        assert!(bus.write(a, &[1], 1).is_ok());
        let err = bus.write(a, &[2], 1).unwrap_err();
        assert!(matches!(err, CgraError::TransferFailed { .. }));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn display_names_fields() {
        let t = Transaction {
            address: BusAddress::encode(TargetClass::SingleRegister, 7, 0),
            data: vec![50_000],
            words_per_entry: 1,
        };
        assert_eq!(t.to_string(), "0xdc00 SingleRegister/7/0 len=1");
    }
}
