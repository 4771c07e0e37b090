use crate::{interp::bilinear, Resolution, SrtmError, TileId, C, VOID};
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use std::sync::atomic::{AtomicI16, Ordering};

/// One degree-square of elevation samples.
///
/// Samples are stored row-major in the raw SRTM file order: row 0 is the
/// northernmost row and column 0 the westernmost column, so row indices
/// grow southward and column indices grow eastward. All index math in
/// this crate is derived for that convention.
#[derive(Debug)]
pub struct Raster {
    /// Tile this raster covers.
    id: TileId,

    /// Sampling density.
    resolution: Resolution,

    /// Elevation samples; `VOID` where the source had no data.
    samples: Box<[i16]>,

    /// Lowest non-void elevation sample; computed lazily.
    min_elevation: AtomicI16,

    /// Highest non-void elevation sample; computed lazily.
    max_elevation: AtomicI16,
}

impl Raster {
    /// Decodes raw big-endian samples into a raster.
    ///
    /// The byte count must match one of the two resolution classes
    /// exactly; anything else is rejected.
    pub fn parse(id: TileId, bytes: &[u8]) -> Result<Self, SrtmError> {
        let resolution =
            Resolution::from_byte_len(bytes.len()).ok_or(SrtmError::RasterLen(bytes.len()))?;
        Self::parse_as(id, resolution, bytes)
    }

    /// Decodes raw big-endian samples, requiring a specific resolution
    /// class.
    pub fn parse_as(id: TileId, resolution: Resolution, bytes: &[u8]) -> Result<Self, SrtmError> {
        if bytes.len() != resolution.byte_len() {
            return Err(SrtmError::RasterLen(bytes.len()));
        }

        let samples = {
            let mut rdr = bytes;
            let mut samples = Vec::with_capacity(resolution.samples());
            for _ in 0..resolution.samples() {
                samples.push(rdr.read_i16::<BE>()?);
            }
            samples.into_boxed_slice()
        };

        Ok(Self {
            id,
            resolution,
            samples,
            min_elevation: i16::MAX.into(),
            max_elevation: i16::MIN.into(),
        })
    }

    /// Builds a raster from already-decoded samples, row 0 northernmost.
    pub fn from_samples(
        id: TileId,
        resolution: Resolution,
        samples: Vec<i16>,
    ) -> Result<Self, SrtmError> {
        if samples.len() != resolution.samples() {
            return Err(SrtmError::RasterLen(samples.len() * 2));
        }
        Ok(Self {
            id,
            resolution,
            samples: samples.into_boxed_slice(),
            min_elevation: i16::MAX.into(),
            max_elevation: i16::MIN.into(),
        })
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Samples along one side.
    pub fn side(&self) -> usize {
        self.resolution.side()
    }

    /// Returns the number of samples in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Size of the sample data in bytes.
    pub fn byte_len(&self) -> usize {
        self.resolution.byte_len()
    }

    /// Returns the sample at `row` (from the north edge) and `col` (from
    /// the west edge), if in bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<i16> {
        let side = self.side();
        if row < side && col < side {
            Some(self.samples[row * side + col])
        } else {
            None
        }
    }

    /// Returns the sample at `row`/`col`.
    ///
    /// Panics if either index is out of bounds.
    pub fn get_unchecked(&self, row: usize, col: usize) -> i16 {
        self.samples[row * self.side() + col]
    }

    /// Returns the sample nearest to the given geo coordinates, or
    /// `None` when `coord` lies outside this tile.
    pub fn sample_at(&self, coord: Coord<C>) -> Option<i16> {
        let (row, col) = self.index_of(coord)?;
        self.get(row, col)
    }

    /// Maps geo coordinates to the nearest raster indices.
    ///
    /// Uses signed-floor fractions, which handle all four hemisphere
    /// quadrants uniformly: the column fraction runs west→east with
    /// increasing index, the latitude fraction is inverted because row 0
    /// is the north edge.
    pub fn index_of(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        if !self.id.contains(coord) {
            return None;
        }
        let edge = (self.side() - 1) as C;
        let frac_lon = coord.x - C::from(self.id.lon());
        let frac_lat = coord.y - C::from(self.id.lat());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let col = (frac_lon * edge).round() as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row = ((1.0 - frac_lat) * edge).round() as usize;
        Some((row, col))
    }

    /// Geo coordinates of the sample at `row`/`col`.
    pub fn coord_of(&self, row: usize, col: usize) -> Coord<C> {
        let edge = (self.side() - 1) as C;
        #[allow(clippy::cast_precision_loss)]
        Coord {
            x: C::from(self.id.lon()) + col as C / edge,
            y: C::from(self.id.lat()) + 1.0 - row as C / edge,
        }
    }

    /// Bilinearly interpolated elevation at `coord` from the four
    /// surrounding samples.
    ///
    /// Rejects coordinates outside the tile and cells touching a void
    /// sample.
    pub fn interpolated(&self, coord: Coord<C>) -> Result<C, SrtmError> {
        if !self.id.contains(coord) {
            return Err(SrtmError::OutsideRect);
        }
        let side = self.side();
        let edge = (side - 1) as C;
        let fx = (coord.x - C::from(self.id.lon())) * edge;
        let fy = (1.0 - (coord.y - C::from(self.id.lat()))) * edge;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let col0 = (fx.floor() as usize).min(side - 2);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row0 = (fy.floor() as usize).min(side - 2);

        // Row `row0` is the north edge of the cell, `row0 + 1` the south.
        let v01 = self.get_unchecked(row0, col0);
        let v11 = self.get_unchecked(row0, col0 + 1);
        let v00 = self.get_unchecked(row0 + 1, col0);
        let v10 = self.get_unchecked(row0 + 1, col0 + 1);
        if [v00, v10, v01, v11].contains(&VOID) {
            return Err(SrtmError::VoidSample);
        }

        let sw = self.coord_of(row0 + 1, col0);
        let ne = self.coord_of(row0, col0 + 1);
        bilinear(
            (coord.x, coord.y),
            (sw.x, sw.y),
            (ne.x, ne.y),
            [C::from(v00), C::from(v10), C::from(v01), C::from(v11)],
        )
    }

    /// Returns the lowest non-void elevation sample in this raster.
    pub fn min_elevation(&self) -> i16 {
        let mut min_elevation = self.min_elevation.load(Ordering::Relaxed);
        if min_elevation == i16::MAX {
            min_elevation = self
                .samples
                .iter()
                .copied()
                .filter(|&e| e != VOID)
                .min()
                .unwrap_or(VOID);
            self.min_elevation.store(min_elevation, Ordering::SeqCst);
        }
        min_elevation
    }

    /// Returns the highest non-void elevation sample in this raster.
    pub fn max_elevation(&self) -> i16 {
        let mut max_elevation = self.max_elevation.load(Ordering::Relaxed);
        if max_elevation == i16::MIN {
            max_elevation = self
                .samples
                .iter()
                .copied()
                .filter(|&e| e != VOID)
                .max()
                .unwrap_or(VOID);
            self.max_elevation.store(max_elevation, Ordering::SeqCst);
        }
        max_elevation
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, Raster, Resolution, SrtmError, TileId, VOID};

    fn raster_with(
        id: TileId,
        resolution: Resolution,
        f: impl Fn(usize, usize) -> i16,
    ) -> Raster {
        let side = resolution.side();
        let mut samples = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                samples.push(f(row, col));
            }
        }
        Raster::from_samples(id, resolution, samples).unwrap()
    }

    fn encode(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_be_bytes()).collect()
    }

    #[test]
    fn test_parse_keeps_file_order() {
        // The first sample in the file is the NW corner, the last the
        // SE corner.
        let side = Resolution::ThreeArcSec.side();
        let mut samples = vec![0i16; side * side];
        samples[0] = 42;
        samples[side - 1] = 17;
        samples[side * side - 1] = 7;
        let raster =
            Raster::parse(TileId::new(44, -72), &encode(&samples)).unwrap();
        assert_eq!(raster.resolution(), Resolution::ThreeArcSec);
        assert_eq!(raster.get_unchecked(0, 0), 42);
        assert_eq!(raster.get_unchecked(0, side - 1), 17);
        assert_eq!(raster.get_unchecked(side - 1, side - 1), 7);
    }

    #[test]
    fn test_parse_rejects_bad_len() {
        let err = Raster::parse(TileId::new(0, 0), &[0u8; 100]).unwrap_err();
        assert!(matches!(err, SrtmError::RasterLen(100)));

        let truncated = vec![0u8; Resolution::ThreeArcSec.byte_len() - 2];
        assert!(Raster::parse(TileId::new(0, 0), &truncated).is_err());

        let oversized = vec![0u8; Resolution::ThreeArcSec.byte_len() + 2];
        assert!(
            Raster::parse_as(TileId::new(0, 0), Resolution::ThreeArcSec, &oversized).is_err()
        );
    }

    #[test]
    fn test_index_of_northwest_quadrant() {
        // Corner mapping for tile N37W105: the south edge is the last
        // row, the west edge is column 0.
        let raster = raster_with(TileId::new(37, -105), Resolution::ThreeArcSec, |_, _| 0);
        let edge = 1200;
        assert_eq!(
            raster.index_of(Coord { x: -105.0, y: 37.0 }),
            Some((edge, 0))
        );
        assert_eq!(
            raster.index_of(Coord {
                x: -104.0001,
                y: 37.9999,
            }),
            Some((0, edge))
        );
        assert_eq!(raster.index_of(Coord { x: -104.5, y: 37.5 }), Some((600, 600)));
        // North and east edges belong to the neighboring tiles.
        assert_eq!(raster.index_of(Coord { x: -104.0, y: 37.5 }), None);
        assert_eq!(raster.index_of(Coord { x: -104.5, y: 38.0 }), None);
    }

    #[test]
    fn test_index_of_southeast_quadrant() {
        let raster = raster_with(TileId::new(-34, 151), Resolution::ThreeArcSec, |_, _| 0);
        let edge = 1200;
        // South edge maps to the last row, north edge to row 0.
        assert_eq!(raster.index_of(Coord { x: 151.0, y: -34.0 }), Some((edge, 0)));
        assert_eq!(
            raster.index_of(Coord {
                x: 151.9999,
                y: -33.0001,
            }),
            Some((0, edge))
        );
    }

    #[test]
    fn test_index_of_remaining_quadrants() {
        let edge = 1200;
        // Northeast.
        let raster = raster_with(TileId::new(37, 14), Resolution::ThreeArcSec, |_, _| 0);
        assert_eq!(raster.index_of(Coord { x: 14.0, y: 37.0 }), Some((edge, 0)));
        assert_eq!(
            raster.index_of(Coord { x: 14.9999, y: 37.9999 }),
            Some((0, edge))
        );
        // Southwest.
        let raster = raster_with(TileId::new(-34, -72), Resolution::ThreeArcSec, |_, _| 0);
        assert_eq!(raster.index_of(Coord { x: -72.0, y: -34.0 }), Some((edge, 0)));
        assert_eq!(
            raster.index_of(Coord {
                x: -71.0001,
                y: -33.0001,
            }),
            Some((0, edge))
        );
    }

    #[test]
    fn test_coord_of_round_trips_corners() {
        let raster = raster_with(TileId::new(44, -72), Resolution::ThreeArcSec, |_, _| 0);
        let side = raster.side();
        for (row, col) in [(0, 0), (0, side - 1), (side - 1, 0), (side - 1, side - 1)] {
            // Corner coordinates on the north/east edges fall into
            // neighboring tiles, so nudge inward before mapping back.
            let Coord { x, y } = raster.coord_of(row, col);
            let nudged = Coord {
                x: if x == -71.0 { x - 1e-9 } else { x },
                y: if y == 45.0 { y - 1e-9 } else { y },
            };
            assert_eq!(raster.index_of(nudged), Some((row, col)));
        }
    }

    #[test]
    fn test_sample_at() {
        let raster = raster_with(TileId::new(44, -72), Resolution::ThreeArcSec, |row, col| {
            if (row, col) == (600, 600) {
                1903
            } else {
                0
            }
        });
        assert_eq!(raster.sample_at(Coord { x: -71.5, y: 44.5 }), Some(1903));
        assert_eq!(raster.sample_at(Coord { x: -70.5, y: 44.5 }), None);
    }

    #[test]
    fn test_min_max_ignore_void() {
        let raster = raster_with(TileId::new(0, 0), Resolution::ThreeArcSec, |row, col| {
            match (row, col) {
                (0, 0) => VOID,
                (1, 1) => -12,
                (2, 2) => 1903,
                _ => 100,
            }
        });
        assert_eq!(raster.min_elevation(), -12);
        assert_eq!(raster.max_elevation(), 1903);
        // Second read hits the cached values.
        assert_eq!(raster.min_elevation(), -12);
        assert_eq!(raster.max_elevation(), 1903);
    }

    #[test]
    fn test_interpolated() {
        // Elevation equal to the column index makes the interpolated
        // value linear in longitude.
        let raster = raster_with(TileId::new(44, -72), Resolution::ThreeArcSec, |_, col| {
            i16::try_from(col).unwrap()
        });
        let edge = 1200.0;
        // Halfway between columns 10 and 11.
        let lon = -72.0 + 10.5 / edge;
        let elev = raster.interpolated(Coord { x: lon, y: 44.5 }).unwrap();
        assert!((elev - 10.5).abs() < 1e-6);

        assert!(matches!(
            raster.interpolated(Coord { x: -70.5, y: 44.5 }),
            Err(SrtmError::OutsideRect)
        ));
    }

    #[test]
    fn test_interpolated_rejects_void_cell() {
        let raster = raster_with(TileId::new(44, -72), Resolution::ThreeArcSec, |row, col| {
            if row <= 1 && col <= 1 {
                VOID
            } else {
                100
            }
        });
        // The NW-most cell touches void samples.
        let coord = Coord {
            x: -72.0 + 0.5 / 1200.0,
            y: 44.0 + 1199.5 / 1200.0,
        };
        assert!(matches!(
            raster.interpolated(coord),
            Err(SrtmError::VoidSample)
        ));
    }
}
