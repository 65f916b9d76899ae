//! Point-to-point transport probe.
//!
//! Streams whole tiles between two buffers through the store's blocking
//! primitives and reports how fast the transport moved them. This measures
//! raw tile transfer speed, not access-pattern correctness; it exists so a
//! harness can separate "the interconnect is slow" from "the pattern is
//! cache-hostile".

use std::time::{Duration, Instant};

use tracing::debug;

use crate::store::{BufferId, TileStore};
use crate::Result;

/// Outcome of one probe pass.
#[derive(Debug, Clone, Copy)]
pub struct TransferReport {
    /// Tiles moved (one read plus one write each).
    pub tiles: usize,
    /// Payload bytes moved, counting each tile once.
    pub bytes: usize,
    /// Wall time for the whole stream.
    pub elapsed: Duration,
}

impl TransferReport {
    /// Payload throughput; zero if the clock did not advance.
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}

/// Stream `tiles` whole tiles from `src` to `dst`, cycling over each
/// buffer's tiles in order.
pub fn stream_tiles<T: Copy + Default>(
    store: &TileStore<T>,
    src: BufferId,
    dst: BufferId,
    tiles: usize,
) -> Result<TransferReport> {
    let src_tiles = store.num_tiles(src)?;
    let dst_tiles = store.num_tiles(dst)?;
    let tile_bytes = store.tile_len() * std::mem::size_of::<T>();
    let mut block = vec![T::default(); store.tile_len()].into_boxed_slice();

    let start = Instant::now();
    for t in 0..tiles {
        store.read_tile_into(src, t % src_tiles, &mut block)?;
        store.write_tile(dst, t % dst_tiles, &block)?;
    }
    let elapsed = start.elapsed();

    let report = TransferReport {
        tiles,
        bytes: tiles * tile_bytes,
        elapsed,
    };
    debug!(
        tiles = report.tiles,
        bytes = report.bytes,
        elapsed_us = elapsed.as_micros() as u64,
        "tile stream complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_copies_and_counts() {
        let mut store = TileStore::with_tile_len(4);
        store.insert(BufferId::Sparse, &(0u32..8).collect::<Vec<_>>());
        store.insert(BufferId::Dense, &[0u32; 8]);

        let report = stream_tiles(&store, BufferId::Sparse, BufferId::Dense, 2).unwrap();

        assert_eq!(report.tiles, 2);
        assert_eq!(report.bytes, 2 * 4 * std::mem::size_of::<u32>());
        assert_eq!(
            store.read_back(BufferId::Dense).unwrap(),
            (0..8).collect::<Vec<u32>>()
        );
    }

    #[test]
    fn test_stream_cycles_over_short_source() {
        let mut store = TileStore::with_tile_len(4);
        store.insert(BufferId::Sparse, &[7u32; 4]); // one tile
        store.insert(BufferId::Dense, &[0u32; 12]); // three tiles

        let report = stream_tiles(&store, BufferId::Sparse, BufferId::Dense, 3).unwrap();

        assert_eq!(report.tiles, 3);
        assert_eq!(store.read_back(BufferId::Dense).unwrap(), vec![7; 12]);
    }

    #[test]
    fn test_unknown_buffer_propagates() {
        let mut store = TileStore::with_tile_len(4);
        store.insert(BufferId::Sparse, &[0u32; 4]);
        assert!(stream_tiles(&store, BufferId::Sparse, BufferId::Dense, 1).is_err());
    }
}
