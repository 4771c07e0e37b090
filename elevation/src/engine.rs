use crate::{
    cache::{CacheStats, TileCache},
    cancel::CancelToken,
    error::EngineError,
    event::{EngineEvent, EventBus},
    fetch::{run_fetcher, DownloadConfig, DownloadCounters, DownloadStats, FetchJob},
    grid::TileGrid,
    load::{run_loader, LoadJob},
    store::DiskStore,
    tile::{Tile, TileStatus},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use geo::geometry::Coord;
use log::{debug, warn};
use srtm::{Resolution, TileId, C, VOID};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// How long bounds-waiters sleep between completion pulses; also the
/// cancellation latency ceiling.
const WAIT_PULSE: Duration = Duration::from_millis(50);

/// Engine construction parameters. The engine is an owned instance
/// built from one of these and passed to whoever needs it; there is no
/// process-wide singleton.
pub struct EngineConfig {
    /// Directory holding local tile files.
    pub cache_dir: PathBuf,

    /// Resident raster budget in bytes; non-positive means unbounded.
    pub cache_limit_bytes: i64,

    /// Download settings; `None` disables downloading entirely.
    pub download: Option<DownloadConfig>,
}

/// State shared between the engine front door and its workers.
pub(crate) struct Shared {
    pub cache: TileCache,
    pub store: DiskStore,
    pub events: EventBus,
    pub completions: Completions,
    pub download_enabled: AtomicBool,
    pub download: Option<DownloadConfig>,
    pub counters: DownloadCounters,
}

/// Completion pulse: wakes bounds-waiters whenever any tile reaches a
/// new status.
#[derive(Default)]
pub(crate) struct Completions {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl Completions {
    pub fn notify(&self) {
        let mut generation = self.generation.lock().unwrap();
        *generation += 1;
        self.cond.notify_all();
    }

    fn wait_pulse(&self, timeout: Duration) {
        let generation = self.generation.lock().unwrap();
        let _ = self.cond.wait_timeout(generation, timeout).unwrap();
    }
}

/// The elevation engine front door.
///
/// Callers never block on a cache miss: point queries answer `VOID`
/// immediately while the tile is acquired in the background, and bounds
/// queries either fire-and-forget or wait cancellably for completion.
pub struct Engine {
    shared: Arc<Shared>,
    load_tx: Option<Sender<LoadJob>>,
    fetch_tx: Option<Sender<FetchJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let download_enabled = config.download.is_some();
        let shared = Arc::new(Shared {
            cache: TileCache::new(config.cache_limit_bytes),
            store: DiskStore::new(config.cache_dir)?,
            events: EventBus::new(),
            completions: Completions::default(),
            download_enabled: AtomicBool::new(download_enabled),
            download: config.download,
            counters: DownloadCounters::default(),
        });

        let mut workers = Vec::new();

        let (load_tx, load_rx) = unbounded();
        workers.push(
            thread::Builder::new()
                .name("tile-loader".to_owned())
                .spawn({
                    let shared = shared.clone();
                    move || run_loader(shared, load_rx)
                })?,
        );

        let fetch_tx = if let Some(download) = &shared.download {
            let client = reqwest::blocking::Client::builder()
                .timeout(download.timeout)
                .build()?;
            let (fetch_tx, fetch_rx) = unbounded();
            for n in 0..download.workers.max(1) {
                workers.push(
                    thread::Builder::new()
                        .name(format!("tile-fetcher-{n}"))
                        .spawn({
                            let shared = shared.clone();
                            let fetch_rx: Receiver<FetchJob> = fetch_rx.clone();
                            let client = client.clone();
                            move || run_fetcher(shared, fetch_rx, client)
                        })?,
                );
            }
            Some(fetch_tx)
        } else {
            None
        };

        Ok(Self {
            shared,
            load_tx: Some(load_tx),
            fetch_tx,
            workers,
        })
    }

    /// Elevation at `coord`, or `VOID` when the covering tile is not
    /// resident yet.
    ///
    /// Never blocks: a miss caches a placeholder, schedules exactly one
    /// acquisition task, and answers `VOID` immediately. Completion
    /// shows up on later calls and via [`Engine::subscribe`].
    pub fn elevation(&self, coord: Coord<C>) -> i16 {
        let tile = self.tile(TileId::from_coord(coord));
        tile.elevation(coord).unwrap_or(VOID)
    }

    /// Bilinearly interpolated elevation at `coord`, when the covering
    /// tile is resident and the surrounding samples carry data.
    pub fn interpolated_elevation(&self, coord: Coord<C>) -> Option<C> {
        let tile = self.tile(TileId::from_coord(coord));
        let raster = tile.raster()?;
        raster.interpolated(coord).ok()
    }

    /// Returns the cached tile for `id`, scheduling a load or download
    /// on first reference.
    pub fn tile(&self, id: TileId) -> Arc<Tile> {
        let scheduled = if self.shared.store.exists(id) {
            TileStatus::ReadScheduled
        } else if self.download_enabled() && self.fetch_tx.is_some() {
            TileStatus::DownloadScheduled
        } else {
            TileStatus::FileMissing
        };
        let (tile, schedule) = self.shared.cache.begin_task(id, scheduled);
        if schedule {
            self.dispatch(id, scheduled);
        }
        tile
    }

    fn dispatch(&self, id: TileId, scheduled: TileStatus) {
        match scheduled {
            TileStatus::ReadScheduled => {
                self.shared.events.emit(&EngineEvent::LoadScheduled(id));
                if let Some(load_tx) = &self.load_tx {
                    if load_tx.send(LoadJob { id }).is_err() {
                        warn!("load queue closed; marking {id} missing");
                        self.shared
                            .cache
                            .update_if_present(id, None, None, TileStatus::FileMissing);
                        self.shared.completions.notify();
                    }
                }
            }
            TileStatus::DownloadScheduled => {
                let resolution = self
                    .shared
                    .download
                    .as_ref()
                    .map_or(Resolution::OneArcSec, |download| download.resolution);
                self.shared.events.emit(&EngineEvent::DownloadScheduled(id));
                if let Some(fetch_tx) = &self.fetch_tx {
                    if fetch_tx.send(FetchJob { id, resolution }).is_err() {
                        warn!("download queue closed; marking {id} failed");
                        self.shared
                            .cache
                            .update_if_present(id, None, None, TileStatus::DownloadFailed);
                        self.shared.completions.notify();
                    }
                }
            }
            TileStatus::FileMissing => {
                debug!("no local file for {id} and downloads are disabled");
                self.shared.completions.notify();
            }
            _ => {}
        }
    }

    /// Fire-and-forget: references every tile covering the bounds so
    /// missing ones get scheduled.
    pub fn ensure_cached(&self, sw: Coord<C>, ne: Coord<C>) {
        for id in tile_ids_covering(sw, ne) {
            self.tile(id);
        }
    }

    /// Blocks until every tile covering the bounds reaches a terminal
    /// status, or `cancel` trips.
    ///
    /// Tiles evicted mid-wait are re-requested rather than waited on
    /// forever. Cancellation is observed within one pulse and reported
    /// as its own outcome.
    pub fn wait_for_cached(
        &self,
        sw: Coord<C>,
        ne: Coord<C>,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        let ids = tile_ids_covering(sw, ne);
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let mut pending = false;
            for id in &ids {
                match self.shared.cache.get(*id) {
                    Some(tile) if tile.status().is_terminal() => {}
                    Some(_) => pending = true,
                    None => {
                        self.tile(*id);
                        pending = true;
                    }
                }
            }
            if !pending {
                return Ok(());
            }
            self.shared.completions.wait_pulse(WAIT_PULSE);
        }
    }

    /// Snapshot of whatever is resident for the bounds, for analysis
    /// components. Usually preceded by [`Engine::wait_for_cached`].
    pub fn grid(&self, sw: Coord<C>, ne: Coord<C>) -> TileGrid {
        TileGrid::snapshot(&self.shared.cache, sw, ne)
    }

    /// A new subscription to engine lifecycle events.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// The engine's event bus, for bracketing long-running tool
    /// computations with job events.
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn download_enabled(&self) -> bool {
        self.shared.download_enabled.load(Ordering::SeqCst)
    }

    /// Toggles downloading of missing tiles. Toggling on drops every
    /// `FileMissing` entry so previously-unobtainable tiles are retried
    /// on their next reference.
    pub fn set_download_enabled(&self, enabled: bool) {
        let was_enabled = self
            .shared
            .download_enabled
            .swap(enabled, Ordering::SeqCst);
        if enabled && !was_enabled {
            let cleared = self.shared.cache.clear_with_status(TileStatus::FileMissing);
            if cleared > 0 {
                debug!("cleared {cleared} file-missing tiles for retry");
            }
            self.shared.completions.notify();
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }

    pub fn download_stats(&self) -> DownloadStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Closing the job queues lets the workers drain and exit.
        self.load_tx = None;
        self.fetch_tx = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Ids of all tiles covering the given bounds, in either corner order.
fn tile_ids_covering(sw: Coord<C>, ne: Coord<C>) -> Vec<TileId> {
    #[allow(clippy::cast_possible_truncation)]
    let (lat0, lat1) = {
        let (a, b) = (sw.y.floor() as i16, ne.y.floor() as i16);
        (a.min(b), a.max(b))
    };
    #[allow(clippy::cast_possible_truncation)]
    let (lon0, lon1) = {
        let (a, b) = (sw.x.floor() as i16, ne.x.floor() as i16);
        (a.min(b), a.max(b))
    };
    let mut ids = Vec::new();
    for lat in lat0..=lat1 {
        for lon in lon0..=lon1 {
            ids.push(TileId::new(lat, lon));
        }
    }
    ids
}
