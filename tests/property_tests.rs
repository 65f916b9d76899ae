//! Property-based tests using proptest
//!
//! These check the invariants that must hold for all inputs: exact partition
//! coverage of the iteration space, and unit-count independence of kernels
//! whose destination ranges are disjoint by construction.

use proptest::prelude::*;
use tilescatter_rs::{split_work, BufferId, Engine, KernelVariant, RunConfig};

proptest! {
    // Property: assignments union to exactly [0, N), in order, gap-free.
    #[test]
    fn test_partition_covers_exactly(total in 0usize..50_000, units in 1usize..128) {
        let ranges = split_work(total, units);
        prop_assert_eq!(ranges.len(), units);

        let mut cursor = 0;
        for r in ranges.iter() {
            prop_assert_eq!(r.start, cursor);
            cursor = r.end;
        }
        prop_assert_eq!(cursor, total);
    }

    // Property: no two assignment sizes differ by more than one, counting
    // the empty assignments of surplus units.
    #[test]
    fn test_partition_sizes_near_even(total in 0usize..50_000, units in 1usize..128) {
        let ranges = split_work(total, units);
        let min = ranges.iter().map(|r| r.len()).min().unwrap();
        let max = ranges.iter().map(|r| r.len()).max().unwrap();
        prop_assert!(max - min <= 1, "sizes range from {min} to {max}");
    }

    // Property: with delta = pattern_length the scatter destinations are
    // disjoint, so the result is independent of the unit count.
    #[test]
    fn test_scatter_is_unit_count_independent(
        l in 1usize..12,
        count in 1usize..12,
        units in 2usize..9,
        seed in 0u64..1000,
    ) {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);

        let mut pattern: Vec<usize> = (0..l).collect();
        // Shuffle the bases; destinations stay disjoint across iterations.
        for j in (1..l).rev() {
            pattern.swap(j, rng.gen_range(0..=j));
        }
        let dense: Vec<u64> = (0..l).map(|_| rng.gen_range(1..u64::MAX)).collect();

        let build = || {
            Engine::configure(
                RunConfig::new(pattern.clone(), vec![0u64; l * count], dense.clone(), l, 1, count)
                    .with_tile_len(4),
            )
            .unwrap()
        };

        let baseline = build();
        baseline.run(KernelVariant::Scatter, 1).unwrap();
        let parallel = build();
        parallel.run(KernelVariant::Scatter, units).unwrap();

        prop_assert_eq!(
            baseline.read_back(BufferId::Sparse).unwrap(),
            parallel.read_back(BufferId::Sparse).unwrap()
        );
    }

    // Property: when every outer iteration owns its own wrap band
    // (count == wrap) no two elements share a dense destination, so gather
    // is independent of the unit count.
    #[test]
    fn test_gather_is_unit_count_independent(
        l in 1usize..12,
        wrap in 1usize..8,
        units in 2usize..9,
        seed in 0u64..1000,
    ) {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);

        let count = wrap;
        let sparse_len = l * count + l;
        let pattern: Vec<usize> = (0..l).map(|_| rng.gen_range(0..l)).collect();
        let sparse: Vec<u64> = (0..sparse_len).map(|_| rng.gen_range(1..u64::MAX)).collect();

        let build = || {
            Engine::configure(
                RunConfig::new(pattern.clone(), sparse.clone(), vec![0u64; l * wrap], l, wrap, count)
                    .with_tile_len(4),
            )
            .unwrap()
        };

        let baseline = build();
        baseline.run(KernelVariant::Gather, 1).unwrap();
        let parallel = build();
        parallel.run(KernelVariant::Gather, units).unwrap();

        prop_assert_eq!(
            baseline.read_back(BufferId::Dense).unwrap(),
            parallel.read_back(BufferId::Dense).unwrap()
        );
    }
}
