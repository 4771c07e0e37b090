//! On-demand access to degree-square elevation tiles.
//!
//! The engine keeps a byte-bounded cache of [`Tile`]s, populates it in
//! the background from a local [store](store::DiskStore) (one sequential
//! disk worker) or over HTTP (a small download pool), and never blocks a
//! caller on a cache miss: a query for an absent tile returns the void
//! sentinel immediately and schedules exactly one acquisition task.

mod cache;
mod cancel;
mod engine;
mod error;
mod event;
mod fetch;
mod grid;
mod load;
mod store;
mod tile;

pub use crate::{
    cache::{CacheStats, TileCache},
    cancel::CancelToken,
    engine::{Engine, EngineConfig},
    error::EngineError,
    event::{EngineEvent, EventBus},
    fetch::{Auth, DownloadConfig, DownloadStats, FetchFailureKind},
    grid::TileGrid,
    store::DiskStore,
    tile::{Tile, TileStatus},
};
