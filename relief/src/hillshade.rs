//! Hillshade: per-cell illumination intensity from slope and aspect.
//!
//! Gradients come from Horn's weighted central difference over each
//! interior 3×3 neighborhood; the outermost ring has no full
//! neighborhood and is excluded. Rows are independent and computed in
//! parallel.

use crate::{error::ReliefError, field::ElevationField};
use elevation::CancelToken;
use geo::{algorithm::HaversineDistance, geometry::Coord, geometry::Point};
use rayon::prelude::*;
use srtm::{C, VOID};

#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun altitude above the horizon, degrees.
    pub altitude_deg: C,

    /// Sun compass azimuth, degrees clockwise from north.
    pub azimuth_deg: C,

    /// Elevation-meters → horizontal-degrees conversion. `None` derives
    /// it from the raster's mean latitude.
    pub z_factor: Option<C>,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            altitude_deg: 45.0,
            azimuth_deg: 315.0,
            z_factor: None,
        }
    }
}

/// Shaded intensity grid over the interior of a raster, plus its
/// geographic corners.
pub struct HillshadeImage {
    pub rows: usize,
    pub cols: usize,
    /// Row-major intensities in `[0, 255]`.
    pub intensity: Vec<u8>,
    /// NW corner of the shaded interior.
    pub nw: Coord<C>,
    /// SE corner of the shaded interior.
    pub se: Coord<C>,
}

impl HillshadeImage {
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.rows && col < self.cols {
            Some(self.intensity[row * self.cols + col])
        } else {
            None
        }
    }
}

/// Meters spanned by one longitude degree at `lat`.
fn one_degree_meters(lat: C) -> C {
    Point::new(0.0, lat).haversine_distance(&Point::new(1.0, lat))
}

/// Computes the hillshade image for `field`.
///
/// The z-factor is derived once per request, never per cell. Any row
/// failing — including cancellation — fails the whole image; no partial
/// results are returned.
pub fn hillshade(
    field: &impl ElevationField,
    params: &HillshadeParams,
    cancel: &CancelToken,
) -> Result<HillshadeImage, ReliefError> {
    let (rows, cols) = field.dims();
    if rows < 3 || cols < 3 {
        return Err(ReliefError::TooSmall { rows, cols });
    }

    let zenith = (90.0 - params.altitude_deg).to_radians();
    let azimuth = math_azimuth(params.azimuth_deg).to_radians();
    let z_factor = params.z_factor.unwrap_or_else(|| {
        let mean_lat = (field.coord(0, 0).y + field.coord(rows - 1, 0).y) / 2.0;
        one_degree_meters(mean_lat).recip()
    });
    let cell = field.spacing_deg();

    let out_cols = cols - 2;
    let lines: Vec<Vec<u8>> = (1..rows - 1)
        .into_par_iter()
        .map(|row| {
            if cancel.is_cancelled() {
                return Err(ReliefError::Cancelled);
            }
            let mut line = Vec::with_capacity(out_cols);
            for col in 1..cols - 1 {
                line.push(shade_cell(field, row, col, cell, z_factor, zenith, azimuth));
            }
            Ok(line)
        })
        .collect::<Result<_, _>>()?;

    Ok(HillshadeImage {
        rows: rows - 2,
        cols: out_cols,
        intensity: lines.concat(),
        nw: field.coord(1, 1),
        se: field.coord(rows - 2, cols - 2),
    })
}

/// Compass azimuth (clockwise from north) to math angle
/// (counterclockwise from east).
fn math_azimuth(compass_deg: C) -> C {
    let math = 360.0 - compass_deg + 90.0;
    if math >= 360.0 {
        math - 360.0
    } else {
        math
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn shade_cell(
    field: &impl ElevationField,
    row: usize,
    col: usize,
    cell: C,
    z_factor: C,
    zenith: C,
    azimuth: C,
) -> u8 {
    // 3×3 neighborhood, a..i west-to-east with a,b,c the northern row.
    let mut z = [0.0; 9];
    for (n, slot) in z.iter_mut().enumerate() {
        let sample = field.elevation(row + n / 3 - 1, col + n % 3 - 1);
        if sample == VOID {
            // No full neighborhood, no shade.
            return 0;
        }
        *slot = C::from(sample);
    }
    let [a, b, c, d, _, f, g, h, i] = z;

    let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * cell);
    let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * cell);
    let slope = (z_factor * dz_dx.hypot(dz_dy)).atan();
    // Zero gradient has no aspect; slope is zero so any value drops out
    // of the reflectance term.
    let aspect = if dz_dx == 0.0 && dz_dy == 0.0 {
        0.0
    } else {
        dz_dy.atan2(-dz_dx)
    };

    let reflectance =
        zenith.cos() * slope.cos() + zenith.sin() * slope.sin() * (azimuth - aspect).cos();
    (255.0 * reflectance).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::{hillshade, math_azimuth, HillshadeParams};
    use crate::{error::ReliefError, testutil::SynthField};
    use elevation::CancelToken;

    fn params(altitude: f64, azimuth: f64) -> HillshadeParams {
        HillshadeParams {
            altitude_deg: altitude,
            azimuth_deg: azimuth,
            z_factor: Some(1.0),
        }
    }

    #[test]
    fn test_flat_raster_shades_uniformly() {
        let field = SynthField::from_fn(5, 5, |_, _| 1000);
        let image = hillshade(&field, &params(45.0, 315.0), &CancelToken::new()).unwrap();
        assert_eq!((image.rows, image.cols), (3, 3));
        let expected = (255.0 * 45f64.to_radians().cos()).round() as u8;
        assert!(image.intensity.iter().all(|&v| v == expected));
    }

    #[test]
    fn test_interior_excludes_boundary_ring() {
        let field = SynthField::from_fn(4, 7, |_, _| 0);
        let image = hillshade(&field, &params(45.0, 315.0), &CancelToken::new()).unwrap();
        assert_eq!((image.rows, image.cols), (2, 5));
        assert_eq!(image.nw.x, 1.0);
        assert_eq!(image.nw.y, -1.0);
        assert_eq!(image.se.x, 5.0);
        assert_eq!(image.se.y, -2.0);
    }

    #[test]
    fn test_slope_facing_the_sun_is_brighter() {
        // Elevation climbs eastward, so slopes face west: a western sun
        // lights them, an eastern sun leaves them in shade.
        let field = SynthField::from_fn(5, 5, |_, col| i16::try_from(col * 100).unwrap());
        let west_sun = hillshade(&field, &params(45.0, 270.0), &CancelToken::new()).unwrap();
        let east_sun = hillshade(&field, &params(45.0, 90.0), &CancelToken::new()).unwrap();
        assert!(west_sun.get(1, 1).unwrap() > east_sun.get(1, 1).unwrap());
    }

    #[test]
    fn test_void_neighborhood_shades_dark() {
        let field = SynthField::from_fn(5, 5, |row, col| {
            if (row, col) == (0, 0) {
                srtm::VOID
            } else {
                500
            }
        });
        let image = hillshade(&field, &params(45.0, 315.0), &CancelToken::new()).unwrap();
        // The cell whose neighborhood touches the void is dark, the
        // rest are flat-lit.
        assert_eq!(image.get(0, 0), Some(0));
        let expected = (255.0 * 45f64.to_radians().cos()).round() as u8;
        assert_eq!(image.get(2, 2), Some(expected));
    }

    #[test]
    fn test_too_small_raster_is_rejected() {
        let field = SynthField::from_fn(2, 5, |_, _| 0);
        assert!(matches!(
            hillshade(&field, &params(45.0, 315.0), &CancelToken::new()),
            Err(ReliefError::TooSmall { rows: 2, cols: 5 })
        ));
    }

    #[test]
    fn test_cancellation_fails_the_whole_image() {
        let field = SynthField::from_fn(5, 5, |_, _| 0);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            hillshade(&field, &params(45.0, 315.0), &cancel),
            Err(ReliefError::Cancelled)
        ));
    }

    #[test]
    fn test_math_azimuth() {
        assert_eq!(math_azimuth(0.0), 90.0);
        assert_eq!(math_azimuth(90.0), 0.0);
        assert_eq!(math_azimuth(315.0), 135.0);
    }
}
