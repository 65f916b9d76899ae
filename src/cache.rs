//! Per-unit, per-buffer tile cache.
//!
//! Each execution unit owns one [`TileCache`] per logical array it touches.
//! A cache holds at most one resident tile: a miss loads the addressed tile,
//! first writing back the previous tile if it was modified. Write-back is a
//! masked merge — only the lanes this unit actually wrote travel back to the
//! store — so two units that share a destination tile cannot erase each
//! other's elements.
//!
//! Every kernel pass must [`flush`](TileCache::flush) its caches before
//! returning; a dirty tile dropped on the floor silently loses the last
//! modified tile. Debug builds assert against that on drop.

use crate::store::{BufferId, TileStore};
use crate::Result;

/// Residency state: nothing loaded yet, or one tile with a dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Loaded { tile: usize, dirty: bool },
}

/// A one-tile cache bound to a single buffer of a [`TileStore`].
///
/// Owned by one execution unit for the duration of one kernel invocation and
/// passed by reference into the element loop; never shared across units.
pub struct TileCache<T> {
    buffer: BufferId,
    tile_len: usize,
    state: Slot,
    block: Box<[T]>,
    /// Lanes of `block` written since the last write-back.
    written: Box<[bool]>,
}

impl<T: Copy + Default> TileCache<T> {
    /// Create an empty cache for `buffer`, sized to the store's tile length.
    pub fn new(store: &TileStore<T>, buffer: BufferId) -> Self {
        let tile_len = store.tile_len();
        Self {
            buffer,
            tile_len,
            state: Slot::Empty,
            block: vec![T::default(); tile_len].into_boxed_slice(),
            written: vec![false; tile_len].into_boxed_slice(),
        }
    }

    /// Read the element at `idx`, loading its tile on a miss.
    ///
    /// Reads observe this unit's own unflushed writes.
    pub fn read(&mut self, store: &TileStore<T>, idx: usize) -> Result<T> {
        self.touch(store, idx / self.tile_len)?;
        Ok(self.block[idx % self.tile_len])
    }

    /// Write the element at `idx`, loading its tile on a miss.
    ///
    /// The tile is read before the first write so that unwritten lanes stay
    /// intact, then marked dirty; the value reaches the store on eviction or
    /// [`flush`](Self::flush).
    pub fn write(&mut self, store: &TileStore<T>, idx: usize, value: T) -> Result<()> {
        let tile = idx / self.tile_len;
        self.touch(store, tile)?;
        let lane = idx % self.tile_len;
        self.block[lane] = value;
        self.written[lane] = true;
        self.state = Slot::Loaded { tile, dirty: true };
        Ok(())
    }

    /// Write back the resident tile if it is dirty.
    ///
    /// Idempotent; the tile stays resident and clean afterwards.
    pub fn flush(&mut self, store: &TileStore<T>) -> Result<()> {
        if let Slot::Loaded { tile, dirty: true } = self.state {
            store.merge_tile(self.buffer, tile, &self.block, &self.written)?;
            self.written.fill(false);
            self.state = Slot::Loaded { tile, dirty: false };
        }
        Ok(())
    }

    /// Whether the resident tile holds writes not yet in the store.
    pub fn is_dirty(&self) -> bool {
        matches!(self.state, Slot::Loaded { dirty: true, .. })
    }

    /// The currently resident tile id, if any.
    pub fn resident_tile(&self) -> Option<usize> {
        match self.state {
            Slot::Empty => None,
            Slot::Loaded { tile, .. } => Some(tile),
        }
    }

    /// Make `tile` resident: no-op on a hit, masked write-back of a differing
    /// dirty tile, then a blocking load.
    fn touch(&mut self, store: &TileStore<T>, tile: usize) -> Result<()> {
        match self.state {
            Slot::Loaded { tile: resident, .. } if resident == tile => return Ok(()),
            Slot::Loaded {
                tile: resident,
                dirty: true,
            } => {
                store.merge_tile(self.buffer, resident, &self.block, &self.written)?;
                self.written.fill(false);
            }
            _ => {}
        }
        store.read_tile_into(self.buffer, tile, &mut self.block)?;
        self.state = Slot::Loaded { tile, dirty: false };
        Ok(())
    }
}

impl<T> Drop for TileCache<T> {
    fn drop(&mut self) {
        // A dirty drop means a kernel returned without flushing.
        if !std::thread::panicking() {
            debug_assert!(
                !matches!(self.state, Slot::Loaded { dirty: true, .. }),
                "tile cache for {:?} dropped with a dirty tile",
                self.buffer
            );
        }
    }
}
