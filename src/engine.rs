//! Host-facing entry points: configure an invocation, run it across units,
//! read the result back.
//!
//! `run` is all-or-nothing from the host's perspective: the work is split
//! once, every unit executes its kernel pass on the rayon pool, and the call
//! returns only when all of them have finished and flushed. There is no
//! mid-range cancellation of an individual unit.

use rayon::prelude::*;
use tracing::{debug, info_span, trace};

use crate::config::{IndexPolicy, IterationSpace, KernelVariant, RunConfig};
use crate::kernel::{run_unit, PatternSet};
use crate::partition::split_work;
use crate::store::{BufferId, TileStore};
use crate::{EngineError, Result};

/// One validated invocation: iteration space, index arrays and the tile
/// store holding the payload buffers.
pub struct Engine<T> {
    space: IterationSpace,
    policy: IndexPolicy,
    pattern: Box<[usize]>,
    pattern_scatter: Option<Box<[usize]>>,
    secondary: Option<Box<[usize]>>,
    store: TileStore<T>,
}

impl<T: Copy + Default + Send + Sync> Engine<T> {
    /// Validate a configuration and populate the tile store.
    ///
    /// Every configuration error surfaces here, before any unit can start.
    pub fn configure(config: RunConfig<T>) -> Result<Self> {
        let space = config.validate()?;

        let mut store = TileStore::with_tile_len(config.tile_len);
        store.insert(BufferId::Sparse, &config.sparse);
        store.insert(BufferId::Dense, &config.dense);
        if let Some(out) = &config.sparse_scatter {
            store.insert(BufferId::SparseScatter, out);
        }

        debug!(
            count = space.count,
            pattern_length = space.pattern_length,
            wrap = space.wrap,
            delta = space.delta,
            tile_len = store.tile_len(),
            "configured"
        );

        Ok(Self {
            space,
            policy: config.policy,
            pattern: config.pattern.into_boxed_slice(),
            pattern_scatter: config.pattern_scatter.map(Vec::into_boxed_slice),
            secondary: config.secondary.map(Vec::into_boxed_slice),
            store,
        })
    }

    /// The validated iteration space.
    pub fn space(&self) -> &IterationSpace {
        &self.space
    }

    /// The out-of-range index policy this engine was configured with.
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// The underlying tile store (tile-level access for probes and tests).
    pub fn store(&self) -> &TileStore<T> {
        &self.store
    }

    /// Run one kernel variant across `unit_count` execution units and block
    /// until every unit has completed its range and flushed its caches.
    ///
    /// Completion order of competing element-level writes from different
    /// units is non-deterministic; everything else is.
    pub fn run(&self, variant: KernelVariant, unit_count: usize) -> Result<()> {
        if unit_count == 0 {
            return Err(EngineError::ZeroUnits);
        }
        self.require_arrays(variant)?;

        let total = self.space.total_elements();
        let assignments = split_work(total, unit_count);

        let span = info_span!("run", kernel = variant.name(), units = unit_count, total);
        let _guard = span.enter();
        debug!(
            effective = assignments.iter().filter(|r| !r.is_empty()).count(),
            "dispatching"
        );

        let patterns = PatternSet {
            pattern: &self.pattern,
            pattern_scatter: self.pattern_scatter.as_deref(),
            secondary: self.secondary.as_deref(),
        };

        assignments
            .into_vec()
            .into_par_iter()
            .enumerate()
            .try_for_each(|(unit, range)| {
                trace!(unit, start = range.start, end = range.end, "unit pass");
                run_unit(variant, range, &self.space, &patterns, &self.store)
            })
    }

    /// Host-visible copy of a payload buffer, for verification.
    pub fn read_back(&self, buffer: BufferId) -> Result<Vec<T>> {
        self.store.read_back(buffer)
    }

    /// Reject variants whose required index arrays were never configured,
    /// before any work is dispatched.
    fn require_arrays(&self, variant: KernelVariant) -> Result<()> {
        match variant {
            KernelVariant::GatherScatter => {
                if self.pattern_scatter.is_none() || !self.store.contains(BufferId::SparseScatter) {
                    return Err(EngineError::MissingScatterPattern);
                }
            }
            KernelVariant::MultiGather | KernelVariant::MultiScatter => {
                if self.secondary.is_none() {
                    return Err(EngineError::MissingSecondaryPattern(variant.name()));
                }
            }
            KernelVariant::Gather | KernelVariant::Scatter => {}
        }
        Ok(())
    }
}
