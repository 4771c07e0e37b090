//! Relief products computed from resident elevation rasters.
//!
//! Every algorithm here operates on an immutable snapshot through the
//! [`ElevationField`] seam (a [`elevation::TileGrid`], a single
//! [`srtm::Raster`], or anything else raster-shaped), so none of them
//! needs locking, and all of them honor a cooperative
//! [`elevation::CancelToken`].

mod contour;
mod error;
mod field;
mod hillshade;
mod jobs;
mod keycol;
#[cfg(test)]
mod testutil;

pub use crate::{
    contour::{contour_levels, isolines, isolines_at, IsolineSegment},
    error::ReliefError,
    field::ElevationField,
    hillshade::{hillshade, HillshadeImage, HillshadeParams},
    jobs::with_job_events,
    keycol::{key_col, Connectivity, KeyCol},
};
