//! The five access-pattern kernels.
//!
//! Each kernel instance runs to completion, single-threaded, on one unit,
//! over its contiguous assignment `[start, end)` of the iteration space.
//! Convention: `i = elem / pattern_length` (outer), `j = elem %
//! pattern_length` (inner). Per element the kernel resolves its source and
//! destination addresses, moves one element between tile caches, and flushes
//! every dirty cache before returning.
//!
//! Destination tiles are loaded before their first write (read-modify-write):
//! a unit's assignment rarely covers a destination tile exactly, and on the
//! dense side wrap aliasing makes partial tile updates the norm.

use std::ops::Range;

use crate::cache::TileCache;
use crate::config::{IterationSpace, KernelVariant};
use crate::resolve::{dense_index, resolve_double, resolve_single};
use crate::store::{BufferId, TileStore};
use crate::{EngineError, Result};

/// Read-only index arrays of one invocation, shared by all units.
pub(crate) struct PatternSet<'a> {
    pub pattern: &'a [usize],
    pub pattern_scatter: Option<&'a [usize]>,
    pub secondary: Option<&'a [usize]>,
}

impl<'a> PatternSet<'a> {
    fn secondary_for(&self, variant: KernelVariant) -> Result<&'a [usize]> {
        self.secondary
            .ok_or(EngineError::MissingSecondaryPattern(variant.name()))
    }
}

/// Run one unit's kernel pass over its work assignment.
pub(crate) fn run_unit<T: Copy + Default>(
    variant: KernelVariant,
    range: Range<usize>,
    space: &IterationSpace,
    patterns: &PatternSet<'_>,
    store: &TileStore<T>,
) -> Result<()> {
    if range.is_empty() {
        return Ok(());
    }
    match variant {
        KernelVariant::Gather => gather(range, space, patterns.pattern, store),
        KernelVariant::Scatter => scatter(range, space, patterns.pattern, store),
        KernelVariant::GatherScatter => {
            let pattern_scatter = patterns
                .pattern_scatter
                .ok_or(EngineError::MissingScatterPattern)?;
            gather_scatter(range, space, patterns.pattern, pattern_scatter, store)
        }
        KernelVariant::MultiGather => {
            let secondary = patterns.secondary_for(variant)?;
            multi_gather(range, space, patterns.pattern, secondary, store)
        }
        KernelVariant::MultiScatter => {
            let secondary = patterns.secondary_for(variant)?;
            multi_scatter(range, space, patterns.pattern, secondary, store)
        }
    }
}

/// `dense[j + L*(i % wrap)] = sparse[pattern[j] + delta*i]`
fn gather<T: Copy + Default>(
    range: Range<usize>,
    space: &IterationSpace,
    pattern: &[usize],
    store: &TileStore<T>,
) -> Result<()> {
    let sparse_len = store.len(BufferId::Sparse)?;
    let l = space.pattern_length;
    let mut src = TileCache::new(store, BufferId::Sparse);
    let mut dst = TileCache::new(store, BufferId::Dense);

    for elem in range {
        let (i, j) = (elem / l, elem % l);
        let value = src.read(store, resolve_single(pattern, j, i, space.delta, sparse_len))?;
        dst.write(store, dense_index(j, i, l, space.wrap), value)?;
    }
    dst.flush(store)
}

/// `sparse[pattern[j] + delta*i] = dense[j + L*(i % wrap)]`
fn scatter<T: Copy + Default>(
    range: Range<usize>,
    space: &IterationSpace,
    pattern: &[usize],
    store: &TileStore<T>,
) -> Result<()> {
    let sparse_len = store.len(BufferId::Sparse)?;
    let l = space.pattern_length;
    let mut src = TileCache::new(store, BufferId::Dense);
    let mut dst = TileCache::new(store, BufferId::Sparse);

    for elem in range {
        let (i, j) = (elem / l, elem % l);
        let value = src.read(store, dense_index(j, i, l, space.wrap))?;
        dst.write(store, resolve_single(pattern, j, i, space.delta, sparse_len), value)?;
    }
    dst.flush(store)
}

/// `sparse_out[pattern_scatter[j] + delta_scatter*i] = sparse[pattern_gather[j] + delta*i]`
///
/// The read and write sides carry independent patterns and strides; the dense
/// buffer is not involved.
fn gather_scatter<T: Copy + Default>(
    range: Range<usize>,
    space: &IterationSpace,
    pattern_gather: &[usize],
    pattern_scatter: &[usize],
    store: &TileStore<T>,
) -> Result<()> {
    let src_len = store.len(BufferId::Sparse)?;
    let dst_len = store.len(BufferId::SparseScatter)?;
    let l = space.pattern_length;
    let mut src = TileCache::new(store, BufferId::Sparse);
    let mut dst = TileCache::new(store, BufferId::SparseScatter);

    for elem in range {
        let (i, j) = (elem / l, elem % l);
        let value = src.read(
            store,
            resolve_single(pattern_gather, j, i, space.delta, src_len),
        )?;
        dst.write(
            store,
            resolve_single(pattern_scatter, j, i, space.delta_scatter, dst_len),
            value,
        )?;
    }
    dst.flush(store)
}

/// `dense[j + L*(i % wrap)] = sparse[pattern[secondary[j]] + delta*i]`
fn multi_gather<T: Copy + Default>(
    range: Range<usize>,
    space: &IterationSpace,
    pattern: &[usize],
    secondary: &[usize],
    store: &TileStore<T>,
) -> Result<()> {
    let sparse_len = store.len(BufferId::Sparse)?;
    let l = space.pattern_length;
    let mut src = TileCache::new(store, BufferId::Sparse);
    let mut dst = TileCache::new(store, BufferId::Dense);

    for elem in range {
        let (i, j) = (elem / l, elem % l);
        let value = src.read(
            store,
            resolve_double(pattern, secondary, j, i, space.delta, sparse_len),
        )?;
        dst.write(store, dense_index(j, i, l, space.wrap), value)?;
    }
    dst.flush(store)
}

/// `sparse[pattern[secondary[j]] + delta*i] = dense[j + L*(i % wrap)]`
fn multi_scatter<T: Copy + Default>(
    range: Range<usize>,
    space: &IterationSpace,
    pattern: &[usize],
    secondary: &[usize],
    store: &TileStore<T>,
) -> Result<()> {
    let sparse_len = store.len(BufferId::Sparse)?;
    let l = space.pattern_length;
    let mut src = TileCache::new(store, BufferId::Dense);
    let mut dst = TileCache::new(store, BufferId::Sparse);

    for elem in range {
        let (i, j) = (elem / l, elem % l);
        let value = src.read(store, dense_index(j, i, l, space.wrap))?;
        dst.write(
            store,
            resolve_double(pattern, secondary, j, i, space.delta, sparse_len),
            value,
        )?;
    }
    dst.flush(store)
}
