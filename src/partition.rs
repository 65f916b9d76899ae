//! Splitting the global iteration space across execution units.
//!
//! `N` elements over `P` units become two contiguous size groups: with
//! `E = min(P, N)` effective units and `r = N mod E`, the first `r` units
//! receive `⌈N/E⌉` elements and the remaining `E - r` receive `⌊N/E⌋`, in
//! enumeration order. The ranges union to exactly `[0, N)`, are pairwise
//! disjoint and gap-free, and no two differ in size by more than one. Units
//! past `E` receive empty ranges and perform no work.

use std::ops::Range;

use smallvec::SmallVec;

/// Per-unit work assignments. Stack-allocated for typical unit counts.
pub type UnitRanges = SmallVec<[Range<usize>; 16]>;

/// Split `total` elements across `units` execution units.
///
/// Returns one range per requested unit (empty for units beyond the effective
/// count). `total == 0` or `units == 0` yields only empty assignments.
pub fn split_work(total: usize, units: usize) -> UnitRanges {
    let mut ranges = UnitRanges::new();
    if units == 0 {
        return ranges;
    }
    if total == 0 {
        ranges.resize(units, 0..0);
        return ranges;
    }

    let effective = units.min(total);
    let small = total / effective;
    let remainder = total % effective;

    let mut start = 0;
    for unit in 0..units {
        let size = if unit >= effective {
            0
        } else if unit < remainder {
            small + 1
        } else {
            small
        };
        ranges.push(start..start + size);
        start += size;
    }
    debug_assert_eq!(start, total);
    ranges
}
