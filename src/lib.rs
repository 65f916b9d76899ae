//! Indexed gather/scatter data movement over a tiled memory store.
//!
//! This crate reorganizes data between a large, sparsely-addressed buffer and
//! a small, densely-packed buffer according to user-specified index patterns.
//! The work is split across many independent execution units that share a
//! tiled memory store: every access goes through a per-unit, one-tile cache,
//! and the store only speaks whole tiles with blocking read/modify/write
//! semantics.
//!
//! # Core Types
//!
//! - [`TileStore`]: the shared, tile-granular memory; blocking
//!   [`read_tile`](TileStore::read_tile) / [`write_tile`](TileStore::write_tile)
//!   plus the masked [`merge_tile`](TileStore::merge_tile) exchange that makes
//!   concurrent destination tiles safe across units
//! - [`TileCache`]: per-(unit, buffer) cache holding at most one resident
//!   tile; loads on miss, merges written lanes back on eviction and flush
//! - [`Engine`]: host-facing entry point — [`configure`](Engine::configure),
//!   [`run`](Engine::run), [`read_back`](Engine::read_back)
//! - [`KernelVariant`]: the closed set of access patterns — `Gather`,
//!   `Scatter`, `GatherScatter`, `MultiGather`, `MultiScatter`
//!
//! # Example
//!
//! ```rust
//! use tilescatter_rs::{BufferId, Engine, KernelVariant, RunConfig};
//!
//! // Gather sparse[pattern[j] + 8*i] into a dense buffer of two wrap bands.
//! let pattern: Vec<usize> = (0..8).collect();
//! let sparse: Vec<u16> = (0..32).collect();
//! let dense = vec![0u16; 16];
//!
//! let config = RunConfig::new(pattern, sparse, dense, 8, 2, 2);
//! let engine = Engine::configure(config).unwrap();
//! engine.run(KernelVariant::Gather, 4).unwrap();
//!
//! let out = engine.read_back(BufferId::Dense).unwrap();
//! assert_eq!(out[0], 0);
//! assert_eq!(out[8], 8); // second wrap band holds iteration i = 1
//! ```
//!
//! # Concurrency
//!
//! Each execution unit runs its kernel pass sequentially over one contiguous
//! range of the iteration space; units run in parallel on the rayon pool and
//! the host blocks until all of them finish. Competing element-level writes
//! from different units are last-write-wins and their order is
//! non-deterministic across units; tile-level lost updates cannot occur
//! because dirty tiles are merged lane-by-lane under the store's tile lock.

mod cache;
mod config;
mod engine;
mod kernel;
mod partition;
pub mod probe;
mod resolve;
mod store;

// ============================================================================
// Store and cache
// ============================================================================
pub use cache::TileCache;
pub use store::{BufferId, TileStore};

// ============================================================================
// Configuration and host entry points
// ============================================================================
pub use config::{IndexPolicy, IterationSpace, KernelVariant, RunConfig};
pub use engine::Engine;

// ============================================================================
// Lower-level building blocks
// ============================================================================
pub use partition::{split_work, UnitRanges};
pub use resolve::{dense_index, resolve_double, resolve_single};

// ============================================================================
// Constants
// ============================================================================

/// Number of elements in one tile, the unit of transfer between the store
/// and a unit's cache.
///
/// This is the platform's native 32 × 32 tile. [`TileStore::with_tile_len`]
/// accepts other geometries for testing.
pub const ELEMENTS_PER_TILE: usize = 32 * 32;

// ============================================================================
// Error types
// ============================================================================

/// Errors surfaced by configuration validation and store access.
///
/// Everything in the configuration family is rejected synchronously, before
/// any unit starts. A dirty tile dropped without a flush or a tile-level lost
/// update are design invariants covered by debug assertions and tests, not
/// runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The index pattern is empty.
    #[error("pattern length must be at least 1")]
    EmptyPattern,

    /// The iteration count is zero.
    #[error("iteration count must be at least 1")]
    ZeroCount,

    /// The wrap period is zero.
    #[error("wrap must be at least 1")]
    ZeroWrap,

    /// A run was requested with zero execution units.
    #[error("unit count must be at least 1")]
    ZeroUnits,

    /// Gather and scatter patterns of a fused operation differ in length.
    #[error("pattern length mismatch: gather {gather} vs scatter {scatter}")]
    PatternLengthMismatch { gather: usize, scatter: usize },

    /// The secondary index array does not match the pattern length.
    #[error("secondary index length {secondary} does not match pattern length {pattern}")]
    SecondaryLengthMismatch { secondary: usize, pattern: usize },

    /// A double-indirection variant was run without a secondary index array.
    #[error("kernel variant {0} requires a secondary index array")]
    MissingSecondaryPattern(&'static str),

    /// The fused variant was run without a scatter pattern and output buffer.
    #[error("gather-scatter requires a scatter pattern and output buffer")]
    MissingScatterPattern,

    /// The dense buffer cannot hold `pattern_length * wrap` elements.
    #[error("dense buffer holds {len} elements, need at least {needed}")]
    DenseTooSmall { len: usize, needed: usize },

    /// A payload buffer holds no elements.
    #[error("buffer {0:?} must hold at least one element")]
    EmptyBuffer(BufferId),

    /// Strict-policy pre-validation found a resolved index past its target.
    #[error("resolved index {index} out of range for buffer of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    /// The addressed buffer was not created by this configuration.
    #[error("buffer {0:?} is not configured")]
    UnknownBuffer(BufferId),

    /// A tile id past the end of the addressed buffer.
    #[error("tile {tile} out of range for buffer {buffer:?} with {tiles} tiles")]
    TileOutOfRange {
        buffer: BufferId,
        tile: usize,
        tiles: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
