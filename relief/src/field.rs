use elevation::TileGrid;
use geo::geometry::Coord;
use srtm::{Raster, C};

/// A fully-resident rectangular elevation raster.
///
/// This is the seam between the tile engine and the analysis kernels:
/// the kernels only ever read through it, so any snapshot — a
/// multi-tile [`TileGrid`], a single [`Raster`], a synthetic test grid —
/// works the same. Row 0 is the northernmost row.
pub trait ElevationField: Sync {
    /// (rows, cols) of the raster.
    fn dims(&self) -> (usize, usize);

    /// Sample at `row`/`col`; [`srtm::VOID`] where data is missing.
    fn elevation(&self, row: usize, col: usize) -> i16;

    /// Geo coordinates of the sample at `row`/`col`.
    fn coord(&self, row: usize, col: usize) -> Coord<C>;

    /// Nearest raster indices for `coord`, if inside the raster.
    fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)>;

    /// Degrees between adjacent samples.
    fn spacing_deg(&self) -> C;
}

impl ElevationField for TileGrid {
    fn dims(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn elevation(&self, row: usize, col: usize) -> i16 {
        TileGrid::elevation(self, row, col)
    }

    fn coord(&self, row: usize, col: usize) -> Coord<C> {
        TileGrid::coord(self, row, col)
    }

    fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        TileGrid::index_of(self, coord)
    }

    fn spacing_deg(&self) -> C {
        TileGrid::spacing_deg(self)
    }
}

impl ElevationField for Raster {
    fn dims(&self) -> (usize, usize) {
        (self.side(), self.side())
    }

    fn elevation(&self, row: usize, col: usize) -> i16 {
        self.get(row, col).unwrap_or(srtm::VOID)
    }

    fn coord(&self, row: usize, col: usize) -> Coord<C> {
        self.coord_of(row, col)
    }

    fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        Raster::index_of(self, coord)
    }

    fn spacing_deg(&self) -> C {
        self.resolution().spacing_deg()
    }
}
