//! Index resolution: logical iteration (outer `i`, inner `j`) to element
//! addresses.
//!
//! The sparse side of every operation resolves through the pattern array:
//! `pattern[j % L] + delta * i`, reduced modulo the target's element count
//! (the address space is treated as circular; see [`IndexPolicy`] for the
//! strict alternative). Double-indirection variants insert one extra lookup
//! through a secondary index array before the pattern.
//!
//! The dense side never indirects: `j + L * (i % wrap)` packs `wrap` bands of
//! `L` elements, and outer iterations beyond `wrap` deliberately alias
//! earlier bands (last write wins within a unit's sequential order).
//!
//! [`IndexPolicy`]: crate::IndexPolicy

/// Resolve a single-indirection sparse index.
///
/// `index(j, i) = (pattern[j % L] + delta * i) % target_len`.
#[inline]
pub fn resolve_single(
    pattern: &[usize],
    j: usize,
    i: usize,
    delta: usize,
    target_len: usize,
) -> usize {
    let base = pattern[j % pattern.len()];
    (base + delta * i) % target_len
}

/// Resolve a double-indirection sparse index.
///
/// The secondary array supplies an index into the pattern array:
/// `index(j, i) = (pattern[secondary[j % L] % L] + delta * i) % target_len`.
#[inline]
pub fn resolve_double(
    pattern: &[usize],
    secondary: &[usize],
    j: usize,
    i: usize,
    delta: usize,
    target_len: usize,
) -> usize {
    let through = secondary[j % pattern.len()] % pattern.len();
    (pattern[through] + delta * i) % target_len
}

/// Dense-side index with wrap: `j + L * (i % wrap)`.
///
/// Always less than `L * wrap` by construction. With `wrap > 1`, outer
/// iterations `i` and `i + wrap` address the same dense position on purpose.
#[inline]
pub fn dense_index(j: usize, i: usize, pattern_length: usize, wrap: usize) -> usize {
    j + pattern_length * (i % wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_single_applies_stride_per_outer_iteration() {
        let pattern = [0, 2, 4, 6];
        // i = 0 reads the pattern bases directly.
        assert_eq!(resolve_single(&pattern, 1, 0, 8, 64), 2);
        // Each outer iteration advances by delta.
        assert_eq!(resolve_single(&pattern, 1, 3, 8, 64), 26);
        // Inner index wraps over the pattern length.
        assert_eq!(resolve_single(&pattern, 5, 0, 8, 64), 2);
    }

    #[test]
    fn test_resolve_single_wraps_target_length() {
        let pattern = [60];
        assert_eq!(resolve_single(&pattern, 0, 1, 8, 64), 4);
    }

    #[test]
    fn test_resolve_double_identity_matches_single() {
        let pattern = [3, 1, 4, 1, 5, 9, 2, 6];
        let identity: Vec<usize> = (0..pattern.len()).collect();
        for j in 0..16 {
            for i in 0..4 {
                assert_eq!(
                    resolve_double(&pattern, &identity, j, i, 8, 128),
                    resolve_single(&pattern, j, i, 8, 128),
                );
            }
        }
    }

    #[test]
    fn test_resolve_double_reorders_through_secondary() {
        let pattern = [10, 20, 30, 40];
        let secondary = [3, 2, 1, 0];
        assert_eq!(resolve_double(&pattern, &secondary, 0, 0, 0, 64), 40);
        assert_eq!(resolve_double(&pattern, &secondary, 3, 0, 0, 64), 10);
        // Secondary values past the pattern length wrap onto it.
        let oversized = [7, 0, 0, 0];
        assert_eq!(resolve_double(&pattern, &oversized, 0, 0, 0, 64), 40);
    }

    #[test]
    fn test_dense_index_bands() {
        // L = 8, wrap = 2: band 0 holds even iterations, band 1 odd ones.
        assert_eq!(dense_index(3, 0, 8, 2), 3);
        assert_eq!(dense_index(3, 1, 8, 2), 11);
        assert_eq!(dense_index(3, 2, 8, 2), 3);
        // wrap = 1 collapses every iteration onto one band.
        assert_eq!(dense_index(5, 7, 8, 1), 5);
    }

    #[test]
    fn test_dense_index_stays_in_bounds() {
        let (l, wrap) = (8, 3);
        for j in 0..l {
            for i in 0..10 {
                assert!(dense_index(j, i, l, wrap) < l * wrap);
            }
        }
    }
}
