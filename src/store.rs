//! The tiled memory store shared by all execution units.
//!
//! Memory is divided into fixed-size tiles of `tile_len` contiguous elements;
//! element `e` lives in tile `e / tile_len` at offset `e % tile_len`. The
//! store only speaks whole tiles: [`TileStore::read_tile`] and
//! [`TileStore::write_tile`] are blocking round trips guarded by a per-tile
//! lock, deterministic with respect to prior writes.
//!
//! Plain `write_tile` gives no cross-unit atomicity — two units writing the
//! same tile id land in unspecified order and the last write wins wholesale.
//! Destination write-back therefore goes through [`TileStore::merge_tile`],
//! which copies only the lanes a unit actually wrote while holding the tile
//! lock. Concurrent merges to one tile interleave at element granularity, so
//! a unit can no longer erase a neighbour's elements; only deliberate
//! element-level collisions remain last-write-wins.

use parking_lot::Mutex;

use crate::{EngineError, Result, ELEMENTS_PER_TILE};

/// Identifies one logical array inside the store.
///
/// `Sparse` is the scattered-side payload (and the read side of the fused
/// gather-scatter operation); `SparseScatter` is the fused operation's
/// destination payload; `Dense` is the packed-side payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferId {
    Sparse,
    SparseScatter,
    Dense,
}

/// One logical array, padded out to whole tiles.
struct TiledArray<T> {
    /// Logical element count, before tile padding.
    len: usize,
    tiles: Vec<Mutex<Box<[T]>>>,
}

impl<T: Copy + Default> TiledArray<T> {
    fn new(data: &[T], tile_len: usize) -> Self {
        let num_tiles = data.len().div_ceil(tile_len).max(1);
        let mut tiles = Vec::with_capacity(num_tiles);
        for t in 0..num_tiles {
            let mut block = vec![T::default(); tile_len].into_boxed_slice();
            let start = t * tile_len;
            if start < data.len() {
                let end = (start + tile_len).min(data.len());
                block[..end - start].copy_from_slice(&data[start..end]);
            }
            tiles.push(Mutex::new(block));
        }
        Self {
            len: data.len(),
            tiles,
        }
    }
}

/// Tiled, addressable memory with blocking read/write-by-tile-id access.
///
/// Buffers are registered by the host before an invocation and read back
/// afterward; execution units only ever touch them through whole-tile
/// transfers. The store is `Sync`: tiles are individually locked and every
/// operation holds exactly one tile lock for the duration of one copy.
pub struct TileStore<T> {
    tile_len: usize,
    sparse: Option<TiledArray<T>>,
    sparse_scatter: Option<TiledArray<T>>,
    dense: Option<TiledArray<T>>,
}

impl<T: Copy + Default> TileStore<T> {
    /// Create an empty store with the platform tile geometry
    /// ([`ELEMENTS_PER_TILE`]).
    pub fn new() -> Self {
        Self::with_tile_len(ELEMENTS_PER_TILE)
    }

    /// Create an empty store with a custom tile length.
    ///
    /// # Panics
    /// Panics if `tile_len` is zero.
    pub fn with_tile_len(tile_len: usize) -> Self {
        assert!(tile_len > 0, "tile length must be positive");
        Self {
            tile_len,
            sparse: None,
            sparse_scatter: None,
            dense: None,
        }
    }

    /// Elements per tile for this store.
    #[inline]
    pub fn tile_len(&self) -> usize {
        self.tile_len
    }

    /// Register a buffer, copying `data` into tile-aligned storage.
    ///
    /// The final tile is padded with `T::default()`; the padding is invisible
    /// to [`read_back`](Self::read_back).
    pub fn insert(&mut self, buffer: BufferId, data: &[T]) {
        let array = TiledArray::new(data, self.tile_len);
        *self.slot_mut(buffer) = Some(array);
    }

    /// Logical element count of a buffer.
    pub fn len(&self, buffer: BufferId) -> Result<usize> {
        Ok(self.array(buffer)?.len)
    }

    /// Whether a buffer has been registered.
    pub fn contains(&self, buffer: BufferId) -> bool {
        self.slot(buffer).is_some()
    }

    /// Number of tiles backing a buffer.
    pub fn num_tiles(&self, buffer: BufferId) -> Result<usize> {
        Ok(self.array(buffer)?.tiles.len())
    }

    /// Blocking read of one whole tile.
    pub fn read_tile(&self, buffer: BufferId, tile: usize) -> Result<Box<[T]>> {
        let slot = self.tile_slot(buffer, tile)?;
        let guard = slot.lock();
        Ok(guard.clone())
    }

    /// Blocking read of one whole tile into a caller-owned block.
    ///
    /// Same semantics as [`read_tile`](Self::read_tile) without allocating.
    pub fn read_tile_into(&self, buffer: BufferId, tile: usize, block: &mut [T]) -> Result<()> {
        debug_assert_eq!(block.len(), self.tile_len);
        let slot = self.tile_slot(buffer, tile)?;
        let guard = slot.lock();
        block.copy_from_slice(&guard);
        Ok(())
    }

    /// Blocking write of one whole tile. Last write to a tile id wins.
    pub fn write_tile(&self, buffer: BufferId, tile: usize, block: &[T]) -> Result<()> {
        debug_assert_eq!(block.len(), self.tile_len);
        let slot = self.tile_slot(buffer, tile)?;
        let mut guard = slot.lock();
        guard.copy_from_slice(block);
        Ok(())
    }

    /// Merge the written lanes of `block` into a stored tile.
    ///
    /// Holds the tile lock while copying, so merges from different units
    /// interleave at element granularity instead of tile granularity: the
    /// write-back of one unit cannot erase elements another unit wrote to the
    /// same tile. Lanes where `written` is `false` are left untouched.
    pub fn merge_tile(
        &self,
        buffer: BufferId,
        tile: usize,
        block: &[T],
        written: &[bool],
    ) -> Result<()> {
        debug_assert_eq!(block.len(), self.tile_len);
        debug_assert_eq!(written.len(), self.tile_len);
        let slot = self.tile_slot(buffer, tile)?;
        let mut guard = slot.lock();
        for (lane, (&value, &hit)) in block.iter().zip(written.iter()).enumerate() {
            if hit {
                guard[lane] = value;
            }
        }
        Ok(())
    }

    /// Host-visible copy of a buffer, with tile padding stripped.
    pub fn read_back(&self, buffer: BufferId) -> Result<Vec<T>> {
        let array = self.array(buffer)?;
        let mut out = Vec::with_capacity(array.tiles.len() * self.tile_len);
        for tile in &array.tiles {
            out.extend_from_slice(&tile.lock());
        }
        out.truncate(array.len);
        Ok(out)
    }

    fn slot(&self, buffer: BufferId) -> &Option<TiledArray<T>> {
        match buffer {
            BufferId::Sparse => &self.sparse,
            BufferId::SparseScatter => &self.sparse_scatter,
            BufferId::Dense => &self.dense,
        }
    }

    fn slot_mut(&mut self, buffer: BufferId) -> &mut Option<TiledArray<T>> {
        match buffer {
            BufferId::Sparse => &mut self.sparse,
            BufferId::SparseScatter => &mut self.sparse_scatter,
            BufferId::Dense => &mut self.dense,
        }
    }

    fn array(&self, buffer: BufferId) -> Result<&TiledArray<T>> {
        self.slot(buffer)
            .as_ref()
            .ok_or(EngineError::UnknownBuffer(buffer))
    }

    fn tile_slot(&self, buffer: BufferId, tile: usize) -> Result<&Mutex<Box<[T]>>> {
        let array = self.array(buffer)?;
        array.tiles.get(tile).ok_or(EngineError::TileOutOfRange {
            buffer,
            tile,
            tiles: array.tiles.len(),
        })
    }
}

impl<T: Copy + Default> Default for TileStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(data: &[u32], tile_len: usize) -> TileStore<u32> {
        let mut store = TileStore::with_tile_len(tile_len);
        store.insert(BufferId::Sparse, data);
        store
    }

    #[test]
    fn test_insert_pads_to_whole_tiles() {
        let data: Vec<u32> = (0..10).collect();
        let store = store_with(&data, 4);

        assert_eq!(store.num_tiles(BufferId::Sparse).unwrap(), 3);
        assert_eq!(store.len(BufferId::Sparse).unwrap(), 10);

        // Last tile carries two live elements and two default-padded lanes.
        let last = store.read_tile(BufferId::Sparse, 2).unwrap();
        assert_eq!(&*last, &[8, 9, 0, 0]);
    }

    #[test]
    fn test_read_back_strips_padding() {
        let data: Vec<u32> = (0..10).collect();
        let store = store_with(&data, 4);
        assert_eq!(store.read_back(BufferId::Sparse).unwrap(), data);
    }

    #[test]
    fn test_write_then_read_tile() {
        let store = store_with(&[0; 8], 4);
        store.write_tile(BufferId::Sparse, 1, &[5, 6, 7, 8]).unwrap();

        let tile = store.read_tile(BufferId::Sparse, 1).unwrap();
        assert_eq!(&*tile, &[5, 6, 7, 8]);
        assert_eq!(store.read_back(BufferId::Sparse).unwrap(), vec![0, 0, 0, 0, 5, 6, 7, 8]);
    }

    #[test]
    fn test_merge_only_touches_written_lanes() {
        let store = store_with(&[1, 2, 3, 4], 4);

        // Two disjoint masked merges into the same tile, as two units with
        // element-disjoint destinations would produce.
        store
            .merge_tile(BufferId::Sparse, 0, &[10, 0, 0, 0], &[true, false, false, false])
            .unwrap();
        store
            .merge_tile(BufferId::Sparse, 0, &[0, 0, 30, 0], &[false, false, true, false])
            .unwrap();

        assert_eq!(store.read_back(BufferId::Sparse).unwrap(), vec![10, 2, 30, 4]);
    }

    #[test]
    fn test_unknown_buffer_is_rejected() {
        let store = store_with(&[0; 4], 4);
        assert!(matches!(
            store.read_tile(BufferId::Dense, 0),
            Err(EngineError::UnknownBuffer(BufferId::Dense))
        ));
    }

    #[test]
    fn test_tile_out_of_range_is_rejected() {
        let store = store_with(&[0; 4], 4);
        assert!(matches!(
            store.read_tile(BufferId::Sparse, 1),
            Err(EngineError::TileOutOfRange { tile: 1, tiles: 1, .. })
        ));
    }

    #[test]
    fn test_empty_buffer_still_has_one_tile() {
        let store = store_with(&[], 4);
        assert_eq!(store.num_tiles(BufferId::Sparse).unwrap(), 1);
        assert!(store.read_back(BufferId::Sparse).unwrap().is_empty());
    }
}
