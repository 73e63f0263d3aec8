//! CGRA internal parameter ID ranges.

use std::fmt;
use std::ops::Range;

/// Half-open range `[lower, upper)` of CGRA internal IDs.
///
/// Used both as an entry of the run-time parameter lookup table and as the
/// unit of one parameter transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRange {
    lower: u32,
    upper: u32,
}

impl IdRange {
    /// Create a range.
    ///
    /// # Panics
    ///
    /// Panics if `lower >= upper`.
    #[must_use]
    pub const fn new(lower: u32, upper: u32) -> Self {
        assert!(lower < upper, "IdRange requires lower < upper");
        Self { lower, upper }
    }

    /// Range holding exactly one ID.
    #[must_use]
    pub const fn single(id: u32) -> Self {
        Self::new(id, id + 1)
    }

    /// First ID.
    #[must_use]
    pub const fn lower(&self) -> u32 {
        self.lower
    }

    /// One past the last ID.
    #[must_use]
    pub const fn upper(&self) -> u32 {
        self.upper
    }

    /// Number of IDs.
    #[must_use]
    #[allow(clippy::len_without_is_empty)] // never empty
    pub const fn len(&self) -> usize {
        (self.upper - self.lower) as usize
    }

    /// Grow the range by one ID at the top.
    pub fn extend(&mut self) {
        self.upper += 1;
    }

    /// Iterate all IDs in ascending order.
    pub fn ids(&self) -> Range<u32> {
        self.lower..self.upper
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_and_ids() {
        let r = IdRange::new(3, 5);
        assert_eq!(r.len(), 2);
        assert_eq!(r.ids().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn extend_grows_upper() {
        let mut r = IdRange::single(6);
        r.extend();
        assert_eq!(r, IdRange::new(6, 8));
        assert_eq!(r.to_string(), "[6, 8)");
    }

    #[test]
    #[should_panic(expected = "lower < upper")]
    fn empty_range_rejected() {
        let _ = IdRange::new(4, 4);
    }
}
