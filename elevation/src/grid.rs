use crate::cache::TileCache;
use geo::geometry::Coord;
use srtm::{Raster, Resolution, TileId, C, VOID};
use std::sync::Arc;

/// Immutable snapshot of a rectangular window of tiles, addressable as
/// one raster.
///
/// The grid is recomputed per query, never persisted: it holds cheap
/// `Arc` handles to whatever rasters were resident when it was taken,
/// and answers `VOID` for cells of tiles that were absent or not yet
/// valid. Row 0 is the northernmost sample row, matching the raster
/// convention.
pub struct TileGrid {
    /// SW corner of the window, in whole degrees.
    sw_lat: i16,
    sw_lon: i16,

    /// Window size in tiles.
    tiles_wide: usize,
    tiles_tall: usize,

    /// Rasters row-major by tile; tile row 0 is the northernmost.
    rasters: Vec<Option<Arc<Raster>>>,

    /// Sampling density of the aggregate raster: the finest class among
    /// the resident tiles, so mixed windows degrade instead of failing.
    resolution: Resolution,

    rows: usize,
    cols: usize,
}

impl TileGrid {
    pub(crate) fn snapshot(cache: &TileCache, sw: Coord<C>, ne: Coord<C>) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let (sw_lat, ne_lat) = {
            let (a, b) = (sw.y.floor() as i16, ne.y.floor() as i16);
            (a.min(b), a.max(b))
        };
        #[allow(clippy::cast_possible_truncation)]
        let (sw_lon, ne_lon) = {
            let (a, b) = (sw.x.floor() as i16, ne.x.floor() as i16);
            (a.min(b), a.max(b))
        };
        let tiles_tall = usize::try_from(ne_lat - sw_lat + 1).unwrap_or(1);
        let tiles_wide = usize::try_from(ne_lon - sw_lon + 1).unwrap_or(1);

        let mut rasters = Vec::with_capacity(tiles_tall * tiles_wide);
        let mut resolution = None;
        for tile_row in 0..tiles_tall {
            #[allow(clippy::cast_possible_truncation)]
            let lat = ne_lat - tile_row as i16;
            for tile_col in 0..tiles_wide {
                #[allow(clippy::cast_possible_truncation)]
                let lon = sw_lon + tile_col as i16;
                let raster = cache.get(TileId::new(lat, lon)).and_then(|tile| {
                    cache.touch(&tile);
                    tile.raster()
                });
                if let Some(raster) = &raster {
                    resolution = Some(match resolution {
                        Some(Resolution::OneArcSec) => Resolution::OneArcSec,
                        _ => raster.resolution(),
                    });
                }
                rasters.push(raster);
            }
        }
        let resolution = resolution.unwrap_or(Resolution::ThreeArcSec);
        let edge = resolution.side() - 1;

        Self {
            sw_lat,
            sw_lon,
            tiles_wide,
            tiles_tall,
            rasters,
            resolution,
            rows: tiles_tall * edge + 1,
            cols: tiles_wide * edge + 1,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Whether every tile in the window had resident data.
    pub fn is_complete(&self) -> bool {
        self.rasters.iter().all(Option::is_some)
    }

    /// Northwest corner of the window.
    pub fn nw_corner(&self) -> Coord<C> {
        Coord {
            x: C::from(self.sw_lon),
            y: C::from(self.sw_lat) + self.tiles_tall as C,
        }
    }

    /// Southeast corner of the window.
    pub fn se_corner(&self) -> Coord<C> {
        Coord {
            x: C::from(self.sw_lon) + self.tiles_wide as C,
            y: C::from(self.sw_lat),
        }
    }

    /// Degrees between adjacent samples.
    pub fn spacing_deg(&self) -> C {
        1.0 / (self.resolution.side() - 1) as C
    }

    /// Elevation at global raster indices; `VOID` outside the window or
    /// where no tile data is resident.
    pub fn elevation(&self, row: usize, col: usize) -> i16 {
        if row >= self.rows || col >= self.cols {
            return VOID;
        }
        let edge = self.resolution.side() - 1;
        let tile_row = (row / edge).min(self.tiles_tall - 1);
        let tile_col = (col / edge).min(self.tiles_wide - 1);
        let local_row = row - tile_row * edge;
        let local_col = col - tile_col * edge;
        match &self.rasters[tile_row * self.tiles_wide + tile_col] {
            None => VOID,
            Some(raster) if raster.resolution() == self.resolution => {
                raster.get_unchecked(local_row, local_col)
            }
            // Coarser tile in a fine window: resample through the
            // tile's own index spacing.
            Some(raster) => {
                let tile_edge = raster.side() - 1;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let row = ((local_row as C / edge as C) * tile_edge as C).round() as usize;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let col = ((local_col as C / edge as C) * tile_edge as C).round() as usize;
                raster.get_unchecked(row, col)
            }
        }
    }

    /// Geo coordinates of the sample at global `row`/`col`.
    pub fn coord(&self, row: usize, col: usize) -> Coord<C> {
        let spacing = self.spacing_deg();
        #[allow(clippy::cast_precision_loss)]
        Coord {
            x: C::from(self.sw_lon) + col as C * spacing,
            y: C::from(self.sw_lat) + self.tiles_tall as C - row as C * spacing,
        }
    }

    /// Maps geo coordinates to the nearest global raster indices, if
    /// inside the window.
    pub fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let spacing = self.spacing_deg();
        let nw = self.nw_corner();
        let se = self.se_corner();
        if coord.x < nw.x || coord.x > se.x || coord.y < se.y || coord.y > nw.y {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let col = (((coord.x - nw.x) / spacing).round() as usize).min(self.cols - 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row = (((nw.y - coord.y) / spacing).round() as usize).min(self.rows - 1);
        Some((row, col))
    }
}
