use srtm::{Raster, Resolution, TileId, C};
use geo::geometry::Coord;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};

/// Lifecycle state of a cached tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// Queued for the sequential disk worker.
    ReadScheduled,
    /// The disk worker is decoding the file.
    Reading,
    /// Elevation data is resident.
    Valid,
    /// The on-disk file failed to decode; terminal, never retried.
    FileInvalid,
    /// No local file and downloading is disabled; terminal until the
    /// download toggle changes.
    FileMissing,
    /// Queued for the download pool.
    DownloadScheduled,
    /// A download worker is fetching the tile.
    Downloading,
    /// The download failed; terminal, retry is a caller decision.
    DownloadFailed,
}

impl TileStatus {
    /// A terminal status does not change without a new trigger.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Valid | Self::FileInvalid | Self::FileMissing | Self::DownloadFailed
        )
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }
}

/// One cached degree-square tile: raster data (when valid) plus
/// lifecycle state.
///
/// Tiles are shared as `Arc<Tile>` and mutated in place through the
/// cache's exclusive boundary, so every holder observes the latest
/// state. The access stamp orders tiles for eviction and is bumped on
/// every status change and every elevation read.
pub struct Tile {
    id: TileId,
    state: RwLock<TileState>,
    last_access: AtomicU64,
}

struct TileState {
    status: TileStatus,
    resolution: Option<Resolution>,
    raster: Option<Arc<Raster>>,
}

impl Tile {
    pub(crate) fn placeholder(id: TileId, status: TileStatus) -> Self {
        Self {
            id,
            state: RwLock::new(TileState {
                status,
                resolution: None,
                raster: None,
            }),
            last_access: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn status(&self) -> TileStatus {
        self.state.read().expect("tile lock poisoned").status
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.state.read().expect("tile lock poisoned").resolution
    }

    /// The resident raster, if this tile is valid.
    pub fn raster(&self) -> Option<Arc<Raster>> {
        self.state.read().expect("tile lock poisoned").raster.clone()
    }

    /// Size of the resident sample data in bytes; zero for placeholders
    /// and failed tiles.
    pub fn data_len(&self) -> usize {
        self.state
            .read()
            .expect("tile lock poisoned")
            .raster
            .as_ref()
            .map_or(0, |raster| raster.byte_len())
    }

    /// Elevation at `coord`, if this tile is valid and contains it.
    pub fn elevation(&self, coord: Coord<C>) -> Option<i16> {
        self.raster().and_then(|raster| raster.sample_at(coord))
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    pub(crate) fn touch(&self, stamp: u64) {
        self.last_access.store(stamp, Ordering::Relaxed);
    }

    /// Replaces the lifecycle state in place.
    ///
    /// Data is resident iff the status is `Valid`; callers never hand a
    /// raster together with a non-valid status.
    pub(crate) fn set_state(
        &self,
        status: TileStatus,
        resolution: Option<Resolution>,
        raster: Option<Arc<Raster>>,
    ) {
        debug_assert_eq!(raster.is_some(), status == TileStatus::Valid);
        let mut state = self.state.write().expect("tile lock poisoned");
        state.status = status;
        state.resolution = resolution;
        state.raster = raster;
    }
}
