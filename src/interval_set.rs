//! Sorted, merged integer ranges over positive integers: page ranges,
//! input-page ranges, and `force-front-side` sets all reduce to this type.

use serde::{Deserialize, Serialize};

/// Half-open range `[lower, upper)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub lower: u32,
    pub upper: u32,
}

/// A set of disjoint, sorted integer ranges.
///
/// Call [`IntervalSet::add_range`]/[`IntervalSet::add_single`] any number of
/// times, then [`IntervalSet::finish`] once to coalesce and sort. Calling
/// `add_*` again without an intervening [`IntervalSet::clear`] is a logic
/// error in the caller and panics in debug builds, matching the source's
/// "must not mutate after finish" contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet {
    ranges: Vec<Range>,
    finished: bool,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An interval set that contains every positive integer.
    pub fn all() -> Self {
        let mut s = Self::new();
        s.add_range(1, u32::MAX);
        s.finish();
        s
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn add_single(&mut self, n: u32) {
        self.add_range(n, n);
    }

    pub fn add_range(&mut self, lo: u32, hi: u32) {
        debug_assert!(!self.finished, "add_range called after finish() without clear()");
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        // Stored as a half-open range; callers pass an inclusive upper bound.
        self.ranges.push(Range {
            lower: lo,
            upper: hi.saturating_add(1),
        });
    }

    /// Sorts by lower bound and coalesces overlapping or touching ranges.
    pub fn finish(&mut self) {
        if self.ranges.is_empty() {
            self.finished = true;
            return;
        }
        self.ranges.sort_by_key(|r| r.lower);
        let mut merged: Vec<Range> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if r.lower <= last.upper => {
                    last.upper = last.upper.max(r.upper);
                }
                _ => merged.push(r),
            }
        }
        self.ranges = merged;
        self.finished = true;
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.finished = false;
    }

    /// Binary search over the coalesced ranges.
    pub fn contains(&self, n: u32) -> bool {
        if self.ranges.is_empty() {
            return false;
        }
        self.ranges
            .binary_search_by(|r| {
                if n < r.lower {
                    std::cmp::Ordering::Greater
                } else if n >= r.upper {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Parses a comma-separated list of `N` or `N-M` tokens. A missing or
    /// oversized upper bound is treated as open (extends to `u32::MAX`).
    pub fn parse(input: &str) -> Self {
        let mut set = Self::new();
        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some((lo, hi)) = token.split_once('-') {
                let lo: u32 = lo.trim().parse().unwrap_or(1);
                let hi: u32 = hi.trim().parse().unwrap_or(u32::MAX);
                set.add_range(lo, hi);
            } else if let Ok(n) = token.parse::<u32>() {
                set.add_single(n);
            }
        }
        set.finish();
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_overlapping_and_touching_ranges() {
        let mut set = IntervalSet::new();
        set.add_range(5, 10);
        set.add_range(1, 4);
        set.add_range(11, 12);
        set.finish();

        assert!(set.contains(1));
        assert!(set.contains(7));
        assert!(set.contains(12));
        assert!(!set.contains(13));
    }

    #[test]
    fn contains_is_monotonic_within_a_range_and_ranges_are_disjoint() {
        let set = IntervalSet::parse("2-3,5,8-10");
        let hits: Vec<u32> = (1..=12).filter(|n| set.contains(*n)).collect();
        assert_eq!(hits, vec![2, 3, 5, 8, 9, 10]);
    }

    #[test]
    fn open_upper_bound_parses_as_unbounded() {
        let set = IntervalSet::parse("5-999999999");
        assert!(set.contains(1_000_000));
    }

    #[test]
    fn all_contains_everything_positive() {
        let set = IntervalSet::all();
        assert!(set.contains(1));
        assert!(set.contains(10_000));
    }
}
