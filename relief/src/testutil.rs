use crate::field::ElevationField;
use geo::geometry::Coord;
use srtm::C;

/// Small in-memory raster with unit spacing for kernel tests.
///
/// Coordinates follow the raster convention: x is the column, y is the
/// negated row, so row 0 is the "north" edge.
pub(crate) struct SynthField {
    rows: usize,
    cols: usize,
    data: Vec<i16>,
}

impl SynthField {
    pub fn new(rows: usize, cols: usize, data: Vec<i16>) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> i16) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }
}

impl ElevationField for SynthField {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn elevation(&self, row: usize, col: usize) -> i16 {
        self.data[row * self.cols + col]
    }

    fn coord(&self, row: usize, col: usize) -> Coord<C> {
        #[allow(clippy::cast_precision_loss)]
        Coord {
            x: col as C,
            y: -(row as C),
        }
    }

    fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let col = coord.x.round();
        let row = (-coord.y).round();
        #[allow(clippy::cast_precision_loss)]
        if col < 0.0 || row < 0.0 || col >= self.cols as C || row >= self.rows as C {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some((row as usize, col as usize))
    }

    fn spacing_deg(&self) -> C {
        1.0
    }
}
