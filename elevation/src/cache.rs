use crate::tile::{Tile, TileStatus};
use log::debug;
use srtm::{Raster, Resolution, TileId};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

/// Byte-bounded store of shared tiles, keyed by tile id.
///
/// All operations take one exclusive boundary: background loader and
/// downloader completions race with foreground queries on both the map
/// and the resident-byte counter, so every mutation happens under a
/// single mutex. Eviction removes the least-recently-accessed
/// data-bearing tiles; placeholders and failed tiles carry no data and
/// are never evicted, since removing them would only re-trigger
/// redundant scheduling.
pub struct TileCache {
    inner: Mutex<CacheInner>,
    /// Resident-data limit in bytes; non-positive means unbounded.
    limit_bytes: i64,
    /// Monotonic access clock; stamps order tiles for eviction.
    clock: AtomicU64,
}

struct CacheInner {
    tiles: HashMap<TileId, Arc<Tile>>,
    resident_bytes: usize,
}

/// Point-in-time cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub tiles: usize,
    pub resident_bytes: usize,
}

impl TileCache {
    pub fn new(limit_bytes: i64) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                tiles: HashMap::new(),
                resident_bytes: 0,
            }),
            limit_bytes,
            clock: AtomicU64::new(0),
        }
    }

    fn next_stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the cached tile for `id`, without touching its access
    /// stamp.
    pub fn get(&self, id: TileId) -> Option<Arc<Tile>> {
        let inner = self.inner.lock().unwrap();
        inner.tiles.get(&id).cloned()
    }

    /// Marks `tile` as just accessed.
    pub fn touch(&self, tile: &Tile) {
        tile.touch(self.next_stamp());
    }

    /// Inserts `id` or mutates the existing tile in place, preserving
    /// its identity so other holders observe the update. Adjusts the
    /// resident-byte total by the data-size delta and evicts down to the
    /// limit when the insert pushed past it.
    pub fn put_or_update(
        &self,
        id: TileId,
        resolution: Option<Resolution>,
        raster: Option<Arc<Raster>>,
        status: TileStatus,
    ) -> Arc<Tile> {
        let stamp = self.next_stamp();
        let mut inner = self.inner.lock().unwrap();
        let tile = inner
            .tiles
            .entry(id)
            .or_insert_with(|| Arc::new(Tile::placeholder(id, status)))
            .clone();
        let old_len = tile.data_len();
        tile.set_state(status, resolution, raster);
        tile.touch(stamp);
        let new_len = tile.data_len();
        inner.resident_bytes = inner.resident_bytes - old_len + new_len;
        self.evict_to_limit(&mut inner);
        tile
    }

    /// Applies a completion to `id` if it is still cached.
    ///
    /// Completions are keyed by id, not by tile instance: an outcome for
    /// a tile evicted in the meantime is dropped silently, and a tile
    /// that already reached `Valid` is never reverted by a stale
    /// completion from an earlier attempt.
    pub fn update_if_present(
        &self,
        id: TileId,
        resolution: Option<Resolution>,
        raster: Option<Arc<Raster>>,
        status: TileStatus,
    ) -> Option<Arc<Tile>> {
        let stamp = self.next_stamp();
        let mut inner = self.inner.lock().unwrap();
        let tile = inner.tiles.get(&id)?.clone();
        if tile.status() == TileStatus::Valid && status != TileStatus::Valid {
            debug!("dropping stale {status:?} completion for valid tile {id}");
            return None;
        }
        let old_len = tile.data_len();
        tile.set_state(status, resolution, raster);
        tile.touch(stamp);
        let new_len = tile.data_len();
        inner.resident_bytes = inner.resident_bytes - old_len + new_len;
        self.evict_to_limit(&mut inner);
        Some(tile)
    }

    /// Removes and returns the tile for `id`.
    pub fn remove(&self, id: TileId) -> Option<Arc<Tile>> {
        let mut inner = self.inner.lock().unwrap();
        let tile = inner.tiles.remove(&id)?;
        inner.resident_bytes -= tile.data_len();
        Some(tile)
    }

    /// Probes the cache for `id`, claiming the acquisition task when the
    /// tile is not yet referenced.
    ///
    /// Returns the tile and whether the caller must schedule the task
    /// matching `scheduled`. An existing entry never schedules again:
    /// in-flight tiles already have their task, valid tiles need none,
    /// and failed tiles stay terminal until explicitly invalidated.
    pub fn begin_task(&self, id: TileId, scheduled: TileStatus) -> (Arc<Tile>, bool) {
        let stamp = self.next_stamp();
        let mut inner = self.inner.lock().unwrap();
        match inner.tiles.entry(id) {
            Entry::Occupied(entry) => {
                let tile = entry.get().clone();
                tile.touch(stamp);
                (tile, false)
            }
            Entry::Vacant(entry) => {
                let tile = Arc::new(Tile::placeholder(id, scheduled));
                tile.touch(stamp);
                entry.insert(tile.clone());
                (tile, true)
            }
        }
    }

    /// Drops every tile currently in `status`; returns how many were
    /// dropped. Used when downloading toggles on, so tiles previously
    /// marked `FileMissing` get retried on their next reference.
    pub fn clear_with_status(&self, status: TileStatus) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let doomed: Vec<TileId> = inner
            .tiles
            .values()
            .filter(|tile| tile.status() == status)
            .map(|tile| tile.id())
            .collect();
        for id in &doomed {
            if let Some(tile) = inner.tiles.remove(id) {
                inner.resident_bytes -= tile.data_len();
            }
        }
        doomed.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            tiles: inner.tiles.len(),
            resident_bytes: inner.resident_bytes,
        }
    }

    /// Evicts least-recently-accessed data-bearing tiles until the
    /// resident total is within the limit. No-op when the limit is
    /// non-positive.
    fn evict_to_limit(&self, inner: &mut CacheInner) {
        if self.limit_bytes <= 0 {
            return;
        }
        #[allow(clippy::cast_sign_loss)]
        let limit = self.limit_bytes as usize;
        if inner.resident_bytes <= limit {
            return;
        }
        let mut candidates: Vec<(u64, TileId, usize)> = inner
            .tiles
            .values()
            .filter(|tile| tile.data_len() > 0)
            .map(|tile| (tile.stamp(), tile.id(), tile.data_len()))
            .collect();
        candidates.sort_unstable_by_key(|&(stamp, ..)| stamp);
        for (_, id, data_len) in candidates {
            if inner.resident_bytes <= limit {
                break;
            }
            inner.tiles.remove(&id);
            inner.resident_bytes -= data_len;
            debug!("evicted {id} ({data_len} bytes)");
        }
    }
}
