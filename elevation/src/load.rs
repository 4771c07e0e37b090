use crate::{engine::Shared, error::EngineError, event::EngineEvent, tile::TileStatus};
use crossbeam_channel::Receiver;
use log::{debug, warn};
use srtm::{Raster, TileId};
use std::{io::ErrorKind, sync::Arc};

pub(crate) struct LoadJob {
    pub id: TileId,
}

/// Disk worker loop.
///
/// Exactly one of these runs per engine: loads are serialized so
/// concurrent misses for different tiles do not thrash the disk.
pub(crate) fn run_loader(shared: Arc<Shared>, jobs: Receiver<LoadJob>) {
    while let Ok(LoadJob { id }) = jobs.recv() {
        shared
            .cache
            .update_if_present(id, None, None, TileStatus::Reading);
        shared.events.emit(&EngineEvent::LoadStarted(id));
        match load_one(&shared, id) {
            Ok(raster) => {
                let raster = Arc::new(raster);
                let resolution = raster.resolution();
                debug!("loaded {id}");
                shared.cache.update_if_present(
                    id,
                    Some(resolution),
                    Some(raster),
                    TileStatus::Valid,
                );
                shared.events.emit(&EngineEvent::LoadSucceeded(id));
            }
            Err(EngineError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                // The file existed when the load was scheduled.
                debug!("tile file for {id} disappeared before reading");
                shared
                    .cache
                    .update_if_present(id, None, None, TileStatus::FileMissing);
                shared.events.emit(&EngineEvent::LoadFailed {
                    id,
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                warn!("load of {id} failed: {err}");
                shared
                    .cache
                    .update_if_present(id, None, None, TileStatus::FileInvalid);
                shared.events.emit(&EngineEvent::LoadFailed {
                    id,
                    reason: err.to_string(),
                });
            }
        }
        shared.completions.notify();
    }
    debug!("tile loader shutting down");
}

fn load_one(shared: &Shared, id: TileId) -> Result<Raster, EngineError> {
    let bytes = shared.store.read(id)?;
    Ok(Raster::parse(id, &bytes)?)
}
