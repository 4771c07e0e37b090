use crate::{engine::Shared, event::EngineEvent, tile::TileStatus};
use crossbeam_channel::Receiver;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use srtm::{Raster, Resolution, TileId};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Default width of the download worker pool: enough to overlap
/// fetches for a handful of missing tiles without unbounded concurrency.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 2;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Classified download failure. Retry policy is the caller's decision;
/// none of these are retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// HTTP 401: credentials missing or rejected.
    Unauthorized,
    /// HTTP 403: authenticated but not allowed.
    Forbidden,
    /// HTTP 404: the server has no such tile.
    NotFound,
    /// Connection, timeout, or any other transport-level problem.
    Transport,
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::Transport => write!(f, "transport error"),
        }
    }
}

/// Authentication attached to every tile request.
#[derive(Debug, Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    Basic {
        user: String,
        password: String,
    },
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }
}

/// Where and how to fetch missing tiles.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Base URL serving 1 arc-second tiles.
    pub base_url_1arc: String,

    /// Base URL serving 3 arc-second tiles.
    pub base_url_3arc: String,

    pub auth: Auth,

    /// Download pool width.
    pub workers: usize,

    /// Resolution class requested for missing tiles.
    pub resolution: Resolution,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl DownloadConfig {
    pub fn new(base_url_1arc: impl Into<String>, base_url_3arc: impl Into<String>) -> Self {
        Self {
            base_url_1arc: base_url_1arc.into(),
            base_url_3arc: base_url_3arc.into(),
            auth: Auth::None,
            workers: DEFAULT_DOWNLOAD_WORKERS,
            resolution: Resolution::OneArcSec,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn url_for(&self, id: TileId, resolution: Resolution) -> String {
        let base = match resolution {
            Resolution::OneArcSec => &self.base_url_1arc,
            Resolution::ThreeArcSec => &self.base_url_3arc,
        };
        format!("{}/{id}.hgt", base.trim_end_matches('/'))
    }
}

/// Bytes and tiles fetched this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub tiles_downloaded: usize,
    pub bytes_downloaded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DownloadCounters {
    tiles: AtomicUsize,
    bytes: AtomicU64,
}

impl DownloadCounters {
    fn record(&self, len: usize) {
        self.tiles.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct FetchJob {
    pub id: TileId,
    pub resolution: Resolution,
}

enum FetchError {
    /// HTTP or transport failure; the tile becomes `DownloadFailed`.
    Http(FetchFailureKind, String),
    /// The server answered but the payload does not decode; the tile
    /// becomes `FileInvalid`.
    Payload(String),
}

/// Download worker loop; several run concurrently off one shared queue.
pub(crate) fn run_fetcher(shared: Arc<Shared>, jobs: Receiver<FetchJob>, client: Client) {
    while let Ok(FetchJob { id, resolution }) = jobs.recv() {
        shared
            .cache
            .update_if_present(id, None, None, TileStatus::Downloading);
        shared.events.emit(&EngineEvent::DownloadStarted(id));
        match fetch_one(&shared, &client, id, resolution) {
            Ok(raster) => {
                let resolution = raster.resolution();
                debug!("downloaded {id}");
                shared.cache.update_if_present(
                    id,
                    Some(resolution),
                    Some(raster),
                    TileStatus::Valid,
                );
                shared.events.emit(&EngineEvent::DownloadSucceeded(id));
            }
            Err(FetchError::Http(kind, message)) => {
                warn!("download of {id} failed: {kind}: {message}");
                shared
                    .cache
                    .update_if_present(id, None, None, TileStatus::DownloadFailed);
                shared
                    .events
                    .emit(&EngineEvent::DownloadFailed { id, kind, message });
            }
            Err(FetchError::Payload(reason)) => {
                warn!("downloaded tile {id} is invalid: {reason}");
                shared
                    .cache
                    .update_if_present(id, None, None, TileStatus::FileInvalid);
                shared.events.emit(&EngineEvent::LoadFailed { id, reason });
            }
        }
        shared.completions.notify();
    }
    debug!("tile fetcher shutting down");
}

fn fetch_one(
    shared: &Shared,
    client: &Client,
    id: TileId,
    resolution: Resolution,
) -> Result<Arc<Raster>, FetchError> {
    let Some(config) = &shared.download else {
        return Err(FetchError::Http(
            FetchFailureKind::Transport,
            "downloader is not configured".to_owned(),
        ));
    };
    let url = config.url_for(id, resolution);
    let response = config
        .auth
        .apply(client.get(&url))
        .send()
        .map_err(|e| FetchError::Http(FetchFailureKind::Transport, e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(
            classify_status(status.as_u16()),
            format!("HTTP {status} fetching {url}"),
        ));
    }
    let body = response
        .bytes()
        .map_err(|e| FetchError::Http(FetchFailureKind::Transport, e.to_string()))?;
    shared.counters.record(body.len());

    // Persist first, then decode what was persisted: the downloaded
    // payload may arrive compressed, and the disk store is what knows
    // how to undo that.
    shared
        .store
        .write(id, &body)
        .map_err(|e| FetchError::Payload(e.to_string()))?;
    let bytes = shared
        .store
        .read(id)
        .map_err(|e| FetchError::Payload(e.to_string()))?;
    let raster = Raster::parse_as(id, resolution, &bytes)
        .map_err(|e| FetchError::Payload(e.to_string()))?;
    Ok(Arc::new(raster))
}

fn classify_status(code: u16) -> FetchFailureKind {
    match code {
        401 => FetchFailureKind::Unauthorized,
        403 => FetchFailureKind::Forbidden,
        404 => FetchFailureKind::NotFound,
        _ => FetchFailureKind::Transport,
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_status, DownloadConfig, FetchFailureKind};
    use srtm::{Resolution, TileId};

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(401), FetchFailureKind::Unauthorized);
        assert_eq!(classify_status(403), FetchFailureKind::Forbidden);
        assert_eq!(classify_status(404), FetchFailureKind::NotFound);
        assert_eq!(classify_status(500), FetchFailureKind::Transport);
        assert_eq!(classify_status(302), FetchFailureKind::Transport);
    }

    #[test]
    fn test_url_for() {
        let config = DownloadConfig::new("https://example.com/srtm1/", "https://example.com/srtm3");
        let id = TileId::new(44, -72);
        assert_eq!(
            config.url_for(id, Resolution::OneArcSec),
            "https://example.com/srtm1/N44W072.hgt"
        );
        assert_eq!(
            config.url_for(id, Resolution::ThreeArcSec),
            "https://example.com/srtm3/N44W072.hgt"
        );
    }
}
