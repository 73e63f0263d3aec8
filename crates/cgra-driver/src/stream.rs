//! Bounded stream transmission
//!
//! Splits one logical transfer (a context, a constant table, a parameter
//! range) into AXI bursts that are never longer than the configured maximum
//! and never cross a 4 KB address boundary.
//!
//! Addressing is per *entry*, not per word: an entry of `words_per_entry`
//! transfers occupies a single offset step of the target, so the address
//! advances by [`TRANSFER_SIZE`] per entry.

use crate::bus::BusWriter;
use crate::error::Result;
use cgra_chip::axi::{MAX_TRANSACTION_LENGTH, TRANSACTION_BOUNDARY, TRANSFER_SIZE};
use cgra_chip::BusAddress;
use tracing::{debug, trace};

/// One legal bus write: `data[start..start + len]` to `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    /// Index of the first word in the source data
    pub start: usize,
    /// Number of words, always a multiple of the entry width
    pub len: usize,
    /// Bus address of the first entry
    pub address: BusAddress,
}

/// Iterator over the bursts of one transfer.
///
/// Each burst is the largest whole number of entries that fits the maximum
/// burst length and the remaining data, shrunk so it ends exactly at a 4 KB
/// boundary when it would otherwise cross one.
#[derive(Debug, Clone)]
pub struct BurstPlan {
    remaining: usize,
    cursor: usize,
    words_per_entry: usize,
    max_burst_words: usize,
    address: BusAddress,
}

impl BurstPlan {
    /// Plan a transfer of `total_words` words starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `words_per_entry` is zero, if `total_words` is not a
    /// multiple of `words_per_entry`, if `max_burst_words` cannot hold a
    /// single entry, or if `max_burst_words` exceeds the AXI limit of
    /// [`MAX_TRANSACTION_LENGTH`] transfers.
    pub fn new(
        total_words: usize,
        words_per_entry: usize,
        start: BusAddress,
        max_burst_words: usize,
    ) -> Self {
        assert!(words_per_entry > 0, "entries must be at least one word wide");
        assert!(
            total_words % words_per_entry == 0,
            "transfer of {total_words} words is not a multiple of {words_per_entry} words per entry"
        );
        assert!(
            max_burst_words >= words_per_entry,
            "max burst of {max_burst_words} words cannot hold one {words_per_entry}-word entry"
        );
        assert!(
            max_burst_words <= MAX_TRANSACTION_LENGTH,
            "max burst of {max_burst_words} words exceeds the AXI limit of {MAX_TRANSACTION_LENGTH}"
        );

        Self {
            remaining: total_words,
            cursor: 0,
            words_per_entry,
            max_burst_words,
            address: start,
        }
    }

    #[allow(clippy::cast_possible_truncation)] // bursts are at most max_burst_words long
    fn entries(&self, words: usize) -> u32 {
        (words / self.words_per_entry) as u32
    }
}

impl Iterator for BurstPlan {
    type Item = Burst;

    fn next(&mut self) -> Option<Burst> {
        if self.remaining == 0 {
            return None;
        }

        let cap = self.max_burst_words.min(self.remaining);
        let mut len = cap - cap % self.words_per_entry;

        let start_mod = self.address.raw() % TRANSACTION_BOUNDARY;
        let end_mod = self.address.advance(self.entries(len)).raw() % TRANSACTION_BOUNDARY;
        if start_mod > end_mod && end_mod != 0 {
            // stop exactly at the boundary, resume there next time
            len -= (end_mod / TRANSFER_SIZE) as usize * self.words_per_entry;
        }

        let burst = Burst {
            start: self.cursor,
            len,
            address: self.address,
        };

        self.cursor += len;
        self.remaining -= len;
        self.address = self.address.advance(self.entries(len));

        Some(burst)
    }
}

/// Send `data` to `start` in legal bursts.
///
/// Returns the number of bursts issued.
///
/// # Errors
///
/// Returns the first bus error; the remaining bursts are not sent.
///
/// # Panics
///
/// Panics on the [`BurstPlan::new`] preconditions.
pub fn send_stream<B: BusWriter + ?Sized>(
    bus: &mut B,
    data: &[u32],
    words_per_entry: usize,
    start: BusAddress,
    max_burst_words: usize,
) -> Result<usize> {
    let plan = BurstPlan::new(data.len(), words_per_entry, start, max_burst_words);
    debug!(
        "stream {} words to {start} ({words_per_entry} per entry, max {max_burst_words})",
        data.len()
    );

    let mut bursts = 0;
    for burst in plan {
        trace!("burst {} words @ {}", burst.len, burst.address);
        bus.write(
            burst.address,
            &data[burst.start..burst.start + burst.len],
            words_per_entry,
        )?;
        bursts += 1;
    }
    Ok(bursts)
}
