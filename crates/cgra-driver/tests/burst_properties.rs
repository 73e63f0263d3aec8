//! Property tests for burst splitting and dirty-parameter coalescing

use std::panic::{catch_unwind, AssertUnwindSafe};

use cgra_driver::chip::axi::{MAX_TRANSACTION_LENGTH, TRANSACTION_BOUNDARY, TRANSFER_SIZE};
use cgra_driver::{
    send_stream, BurstPlan, BusAddress, Composition, IdRange, ParameterArrayRef, ParameterLayout, RangeCoalescer,
    RecordingBus,
};
use proptest::prelude::*;

const LAYOUT: ParameterLayout = ParameterLayout {
    words: 1,
    hybrid: false,
};

/// Monotonic lookup table: ranges of width 1..=3 separated by gaps of 0..=2.
fn monotonic_lookup(max_params: usize) -> impl Strategy<Value = Vec<IdRange>> {
    prop::collection::vec((1u32..=3, 0u32..=2), 1..=max_params).prop_map(|shape| {
        let mut next = 0;
        shape
            .into_iter()
            .map(|(width, gap)| {
                let range = IdRange::new(next + gap, next + gap + width);
                next = range.upper();
                range
            })
            .collect()
    })
}

fn lookup_with_flags(max_params: usize) -> impl Strategy<Value = (Vec<IdRange>, Vec<bool>)> {
    monotonic_lookup(max_params).prop_flat_map(|lookup| {
        let n = lookup.len();
        (Just(lookup), prop::collection::vec(any::<bool>(), n))
    })
}

fn expected_ids(lookup: &[IdRange], dirty: &[bool]) -> Vec<u32> {
    lookup
        .iter()
        .zip(dirty)
        .filter(|(_, d)| **d)
        .flat_map(|(r, _)| r.ids())
        .collect()
}

fn count_runs(ids: &[u32]) -> usize {
    if ids.is_empty() {
        return 0;
    }
    1 + ids.windows(2).filter(|w| w[1] != w[0] + 1).count()
}

proptest! {
    #[test]
    fn bursts_are_legal(
        entries in 0usize..600,
        words_per_entry in 1usize..=4,
        extra in 0usize..=256,
        start_word in 0u32..(1 << 14),
    ) {
        let total = entries * words_per_entry;
        let max = (words_per_entry + extra).min(256);
        let start = BusAddress::from_raw(start_word * TRANSFER_SIZE);

        let mut sum = 0;
        for burst in BurstPlan::new(total, words_per_entry, start, max) {
            prop_assert!(burst.len > 0);
            prop_assert_eq!(burst.len % words_per_entry, 0);
            prop_assert!(burst.len <= max);
            prop_assert_eq!(burst.start, sum);

            let first = burst.address.raw();
            let bytes = (burst.len / words_per_entry) as u32 * TRANSFER_SIZE;
            let last = first + bytes - 1;
            prop_assert_eq!(first / TRANSACTION_BOUNDARY, last / TRANSACTION_BOUNDARY);

            sum += burst.len;
        }
        prop_assert_eq!(sum, total);
    }

    #[test]
    fn oversized_max_burst_is_refused(
        max in (MAX_TRANSACTION_LENGTH + 1)..=4096,
        start_word in 0u32..(1 << 14),
    ) {
        let data = vec![0u32; max];
        let mut bus = RecordingBus::new();
        let start = BusAddress::from_raw(start_word * TRANSFER_SIZE);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = send_stream(&mut bus, &data, 1, start, max);
        }));
        prop_assert!(result.is_err());
        prop_assert!(bus.is_empty());
    }

    #[test]
    fn runs_match_dirty_pattern((lookup, dirty) in lookup_with_flags(64)) {
        let values: Vec<u32> = (0..lookup.len() as u32).map(|i| 1000 + i).collect();
        let params = ParameterArrayRef::new(&values, &dirty);
        let footprint = lookup.iter().map(IdRange::len).sum();
        let mut coalescer = RangeCoalescer::new(footprint, LAYOUT);

        let ids = expected_ids(&lookup, &dirty);
        prop_assert_eq!(coalescer.gather(&params, &lookup), ids.len());

        let runs: Vec<IdRange> = coalescer.runs().collect();
        prop_assert_eq!(runs.len(), count_runs(&ids));

        // runs cover exactly the dirty IDs, ascending and disjoint
        let covered: Vec<u32> = runs.iter().flat_map(IdRange::ids).collect();
        prop_assert_eq!(&covered, &ids);
        for pair in runs.windows(2) {
            prop_assert!(pair[0].upper() < pair[1].lower());
        }

        let data: Vec<u32> = lookup
            .iter()
            .zip(&dirty)
            .enumerate()
            .filter(|(_, (_, d))| **d)
            .flat_map(|(i, (r, _))| std::iter::repeat(values[i]).take(r.len()))
            .collect();
        prop_assert_eq!(coalescer.data(), &data[..]);
    }

    #[test]
    fn one_transaction_per_run((lookup, dirty) in lookup_with_flags(4)) {
        // parameter IDs must fit the 4-bit target ID field
        prop_assume!(lookup.last().map_or(0, IdRange::upper) <= 16);

        let values: Vec<u32> = (0..lookup.len() as u32).collect();
        let params = ParameterArrayRef::new(&values, &dirty);
        let mut bus = RecordingBus::new();
        let mut coalescer = RangeCoalescer::new(16, LAYOUT);

        let ranges = coalescer.send_dirty(&mut bus, &params, &lookup, 256).unwrap();
        let ids = expected_ids(&lookup, &dirty);

        prop_assert_eq!(ranges, count_runs(&ids));
        prop_assert_eq!(bus.len(), ranges);
        let sent: Vec<u32> = bus.transactions().iter().flat_map(|t| t.data.clone()).collect();
        prop_assert_eq!(sent.len(), ids.len());
    }

    #[test]
    fn ranges_follow_lookup_order(
        lookup in monotonic_lookup(12).prop_flat_map(|l| Just(l).prop_shuffle()),
    ) {
        let mut composition = Composition::static_4pe();
        composition.run_time_parameter_map = lookup.clone();

        let values: Vec<u32> = (0..lookup.len() as u32).collect();
        let dirty = vec![true; lookup.len()];
        let mut coalescer = RangeCoalescer::new(composition.max_dirty_footprint(), LAYOUT);
        coalescer.gather(&ParameterArrayRef::new(&values, &dirty), &lookup);
        let runs: Vec<IdRange> = coalescer.runs().collect();

        // ranges go out in table order, never re-sorted
        let covered: Vec<u32> = runs.iter().flat_map(IdRange::ids).collect();
        let in_table_order: Vec<u32> = lookup.iter().flat_map(IdRange::ids).collect();
        prop_assert_eq!(covered, in_table_order);

        let ascending = runs.windows(2).all(|pair| pair[0].upper() <= pair[1].lower());
        prop_assert_eq!(ascending, composition.lookup_is_monotonic());
    }

    #[test]
    fn all_clean_sends_nothing(lookup in monotonic_lookup(32)) {
        let values = vec![7u32; lookup.len()];
        let dirty = vec![false; lookup.len()];
        let mut bus = RecordingBus::new();
        let mut coalescer = RangeCoalescer::new(128, LAYOUT);

        let ranges = coalescer
            .send_dirty(&mut bus, &ParameterArrayRef::new(&values, &dirty), &lookup, 256)
            .unwrap();
        prop_assert_eq!(ranges, 0);
        prop_assert!(bus.is_empty());
    }
}
