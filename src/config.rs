//! Host-side configuration: kernel selection, iteration space, validation.
//!
//! Everything rejectable is rejected here, synchronously, before any unit is
//! dispatched. Out-of-range resolved indices are handled by one of two
//! policies applied consistently: the default wraps every resolved index
//! modulo its target length (the address space is circular), the strict
//! policy instead pre-validates the index arrays and refuses the
//! configuration.

use crate::{EngineError, Result, BufferId, ELEMENTS_PER_TILE};

/// The closed set of access-pattern kernels.
///
/// Dispatch is a `match` over this enum; there is deliberately no open
/// registration mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelVariant {
    /// `dense[j + L*(i % wrap)] = sparse[pattern[j] + delta*i]`
    Gather,
    /// `sparse[pattern[j] + delta*i] = dense[j + L*(i % wrap)]`
    Scatter,
    /// `sparse_out[pattern_scatter[j] + delta_scatter*i] = sparse[pattern_gather[j] + delta*i]`
    GatherScatter,
    /// Gather with the pattern index resolved through a secondary array.
    MultiGather,
    /// Scatter with the pattern index resolved through a secondary array.
    MultiScatter,
}

impl KernelVariant {
    pub(crate) fn name(self) -> &'static str {
        match self {
            KernelVariant::Gather => "gather",
            KernelVariant::Scatter => "scatter",
            KernelVariant::GatherScatter => "gather-scatter",
            KernelVariant::MultiGather => "multi-gather",
            KernelVariant::MultiScatter => "multi-scatter",
        }
    }
}

/// Policy for resolved indices that exceed their target array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Reduce every resolved index modulo the target length.
    #[default]
    WrapModulo,
    /// Pre-validate the index arrays at configure time and reject any
    /// configuration that could resolve past a target; no run-time wrapping
    /// is then required.
    Strict,
}

/// Scalar description of one invocation's iteration space.
///
/// The kernel processes `count * pattern_length` elements; `wrap` partitions
/// the dense index space into `wrap` repeating bands of `pattern_length`
/// elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationSpace {
    /// Number of outer iterations.
    pub count: usize,
    /// Length of the index pattern (inner loop extent).
    pub pattern_length: usize,
    /// Modulo period of the dense index space.
    pub wrap: usize,
    /// Per-outer-iteration offset on the sparse side.
    pub delta: usize,
    /// Sparse-side stride of the fused operation's scatter half.
    pub delta_scatter: usize,
}

impl IterationSpace {
    /// Total elements processed: `count * pattern_length`.
    #[inline]
    pub fn total_elements(&self) -> usize {
        self.count * self.pattern_length
    }
}

/// Everything the host supplies for one invocation: index arrays, payload
/// buffers, strides and the iteration shape.
///
/// Build the common case with [`RunConfig::new`], then chain the `with_*`
/// methods for double indirection, the fused variant, a non-default index
/// policy or a test tile geometry.
pub struct RunConfig<T> {
    pub(crate) pattern: Vec<usize>,
    pub(crate) pattern_scatter: Option<Vec<usize>>,
    pub(crate) secondary: Option<Vec<usize>>,
    pub(crate) sparse: Vec<T>,
    pub(crate) sparse_scatter: Option<Vec<T>>,
    pub(crate) dense: Vec<T>,
    pub(crate) delta: usize,
    pub(crate) delta_scatter: usize,
    pub(crate) wrap: usize,
    pub(crate) count: usize,
    pub(crate) policy: IndexPolicy,
    pub(crate) tile_len: usize,
}

impl<T> RunConfig<T> {
    /// Configuration for the single-indirection variants.
    ///
    /// `delta` is the sparse-side stride per outer iteration; the fused
    /// scatter stride defaults to the same value until
    /// [`with_scatter`](Self::with_scatter) overrides it.
    pub fn new(
        pattern: Vec<usize>,
        sparse: Vec<T>,
        dense: Vec<T>,
        delta: usize,
        wrap: usize,
        count: usize,
    ) -> Self {
        Self {
            pattern,
            pattern_scatter: None,
            secondary: None,
            sparse,
            sparse_scatter: None,
            dense,
            delta,
            delta_scatter: delta,
            wrap,
            count,
            policy: IndexPolicy::default(),
            tile_len: ELEMENTS_PER_TILE,
        }
    }

    /// Add the secondary index array required by `MultiGather`/`MultiScatter`.
    pub fn with_secondary(mut self, secondary: Vec<usize>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Add the scatter half of the fused `GatherScatter` operation: its
    /// pattern, destination payload and stride.
    pub fn with_scatter(
        mut self,
        pattern_scatter: Vec<usize>,
        sparse_scatter: Vec<T>,
        delta_scatter: usize,
    ) -> Self {
        self.pattern_scatter = Some(pattern_scatter);
        self.sparse_scatter = Some(sparse_scatter);
        self.delta_scatter = delta_scatter;
        self
    }

    /// Select the out-of-range index policy.
    pub fn with_policy(mut self, policy: IndexPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the tile geometry (testing only; the platform default is
    /// [`ELEMENTS_PER_TILE`]).
    pub fn with_tile_len(mut self, tile_len: usize) -> Self {
        self.tile_len = tile_len;
        self
    }

    /// Reject-fast validation; returns the iteration space on success.
    pub(crate) fn validate(&self) -> Result<IterationSpace> {
        if self.pattern.is_empty() {
            return Err(EngineError::EmptyPattern);
        }
        if self.count == 0 {
            return Err(EngineError::ZeroCount);
        }
        if self.wrap == 0 {
            return Err(EngineError::ZeroWrap);
        }
        if self.sparse.is_empty() {
            return Err(EngineError::EmptyBuffer(BufferId::Sparse));
        }

        let pattern_length = self.pattern.len();
        if let Some(scatter) = &self.pattern_scatter {
            if scatter.len() != pattern_length {
                return Err(EngineError::PatternLengthMismatch {
                    gather: pattern_length,
                    scatter: scatter.len(),
                });
            }
        }
        if let Some(out) = &self.sparse_scatter {
            if out.is_empty() {
                return Err(EngineError::EmptyBuffer(BufferId::SparseScatter));
            }
        }
        if let Some(secondary) = &self.secondary {
            if secondary.len() != pattern_length {
                return Err(EngineError::SecondaryLengthMismatch {
                    secondary: secondary.len(),
                    pattern: pattern_length,
                });
            }
        }

        let needed = pattern_length * self.wrap;
        if self.dense.len() < needed {
            return Err(EngineError::DenseTooSmall {
                len: self.dense.len(),
                needed,
            });
        }

        if self.policy == IndexPolicy::Strict {
            self.validate_strict()?;
        }

        Ok(IterationSpace {
            count: self.count,
            pattern_length,
            wrap: self.wrap,
            delta: self.delta,
            delta_scatter: self.delta_scatter,
        })
    }

    /// Strict pre-pass over the index arrays.
    ///
    /// The sparse-side index grows monotonically with the outer iteration, so
    /// checking `base + delta * (count - 1)` per pattern entry bounds every
    /// element the run will resolve. Double indirection selects among the
    /// same pattern entries, so the pattern check also covers it; the
    /// secondary values themselves must index the pattern directly.
    fn validate_strict(&self) -> Result<()> {
        check_reach(&self.pattern, self.delta, self.count, self.sparse.len())?;

        if let Some(secondary) = &self.secondary {
            for &through in secondary.iter() {
                if through >= self.pattern.len() {
                    return Err(EngineError::IndexOutOfRange {
                        index: through,
                        len: self.pattern.len(),
                    });
                }
            }
        }

        if let (Some(scatter), Some(out)) = (&self.pattern_scatter, &self.sparse_scatter) {
            check_reach(scatter, self.delta_scatter, self.count, out.len())?;
        }
        Ok(())
    }
}

fn check_reach(pattern: &[usize], delta: usize, count: usize, len: usize) -> Result<()> {
    for &base in pattern {
        let reach = base + delta * (count - 1);
        if reach >= len {
            return Err(EngineError::IndexOutOfRange { index: reach, len });
        }
    }
    Ok(())
}
