//! Dirty parameter coalescing
//!
//! Turns a sparse set of dirty logical parameters into the fewest
//! contiguous internal-ID ranges, one bus stream per range. The number of
//! streams equals the number of maximal runs of adjacent dirty IDs, not the
//! number of dirty parameters.

use crate::bus::BusWriter;
use crate::composition::ParameterLayout;
use crate::error::Result;
use crate::params::ParameterArrayRef;
use crate::stream::send_stream;
use cgra_chip::IdRange;
use tracing::debug;

/// Send one contiguous ID range in full.
///
/// `data` must start with the words of `range.lower()`; anything beyond
/// the range is ignored. Returns the number of words sent so the caller can
/// advance its source cursor.
///
/// # Errors
///
/// Returns the first bus error.
///
/// # Panics
///
/// Panics if `data` is shorter than the range.
pub fn send_range<B: BusWriter + ?Sized>(
    bus: &mut B,
    data: &[u32],
    range: &IdRange,
    layout: ParameterLayout,
    max_burst_words: usize,
) -> Result<usize> {
    let words = range.len() * layout.words;
    assert!(
        data.len() >= words,
        "parameter range {range} needs {words} words, got {}",
        data.len()
    );

    debug!("parameter range {range} ({words} words)");
    send_stream(bus, &data[..words], layout.words, layout.address(range), max_burst_words)?;
    Ok(words)
}

/// Scratch space for gathering dirty parameters.
///
/// `ids[i]` owns `data[i * words..(i + 1) * words]`. Sized once for the
/// largest possible update; one coalescer per driver instance, not shared.
#[derive(Debug, Clone)]
pub struct RangeCoalescer {
    ids: Vec<u32>,
    data: Vec<u32>,
    layout: ParameterLayout,
}

impl RangeCoalescer {
    /// Scratch for up to `max_ids` internal IDs.
    pub fn new(max_ids: usize, layout: ParameterLayout) -> Self {
        Self {
            ids: Vec::with_capacity(max_ids),
            data: Vec::with_capacity(max_ids * layout.words),
            layout,
        }
    }

    /// Gather the dirty parameters of `params` into scratch.
    ///
    /// Returns the number of internal IDs gathered.
    ///
    /// # Panics
    ///
    /// Panics if `params` has no dirty flag array, or has more parameters
    /// than `lookup` has entries.
    pub fn gather(&mut self, params: &ParameterArrayRef<'_>, lookup: &[IdRange]) -> usize {
        let Some(dirty) = params.dirty_flags() else {
            panic!("sending run-time parameters requires a dirty flag array");
        };
        let count = params.count(self.layout.words);
        assert!(
            count <= lookup.len(),
            "{count} parameters but the lookup table has {} entries",
            lookup.len()
        );

        self.ids.clear();
        self.data.clear();

        for (index, &is_dirty) in dirty.iter().enumerate() {
            if !is_dirty {
                continue;
            }
            let value = params.parameter(index, self.layout.words);
            for id in lookup[index].ids() {
                self.ids.push(id);
                self.data.extend_from_slice(value);
            }
        }

        self.ids.len()
    }

    /// Maximal runs of adjacent IDs in the gathered sequence.
    pub fn runs(&self) -> Runs<'_> {
        Runs { ids: &self.ids }
    }

    /// Gathered words, in ID sequence order.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Send exactly the dirty parameters, one stream per run of IDs.
    ///
    /// Returns the number of ranges sent; zero when nothing is dirty.
    ///
    /// # Errors
    ///
    /// Returns the first bus error; later ranges are not sent.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`gather`](Self::gather).
    pub fn send_dirty<B: BusWriter + ?Sized>(
        &mut self,
        bus: &mut B,
        params: &ParameterArrayRef<'_>,
        lookup: &[IdRange],
        max_burst_words: usize,
    ) -> Result<usize> {
        if self.gather(params, lookup) == 0 {
            return Ok(0);
        }

        let layout = self.layout;
        let mut cursor = 0;
        let mut ranges = 0;
        for range in self.runs() {
            cursor += send_range(bus, &self.data[cursor..], &range, layout, max_burst_words)?;
            ranges += 1;
        }
        debug!("sent {} dirty IDs in {ranges} ranges", self.ids.len());
        Ok(ranges)
    }
}

/// Iterator over maximal runs of adjacent IDs.
#[derive(Debug, Clone)]
pub struct Runs<'a> {
    ids: &'a [u32],
}

impl Iterator for Runs<'_> {
    type Item = IdRange;

    fn next(&mut self) -> Option<IdRange> {
        let (&first, rest) = self.ids.split_first()?;
        let mut range = IdRange::single(first);
        let mut taken = 1;
        for &id in rest {
            if id != range.upper() {
                break;
            }
            range.extend();
            taken += 1;
        }
        self.ids = &self.ids[taken..];
        Some(range)
    }
}
