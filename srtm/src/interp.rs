//! Linear and bilinear interpolation over irregular axis-aligned
//! rectangles.

use crate::SrtmError;
use num_traits::Float;

/// Linearly interpolates the value at `x` between known values `v0` at
/// `x0` and `v1` at `x1`.
///
/// The axis points need not be evenly spaced or ordered. Querying
/// outside the span or with coincident axis points is an error.
pub fn linear<T: Float>(x: T, (x0, v0): (T, T), (x1, v1): (T, T)) -> Result<T, SrtmError> {
    if x0 == x1 {
        return Err(SrtmError::DegenerateRect);
    }
    if x < x0.min(x1) || x > x0.max(x1) {
        return Err(SrtmError::OutsideRect);
    }
    let t = (x - x0) / (x1 - x0);
    Ok(v0 + (v1 - v0) * t)
}

/// Bilinearly interpolates the value at `(x, y)` inside the rectangle
/// spanned by `(x0, y0)` and `(x1, y1)`.
///
/// Corner values are given in the order `(x0, y0)`, `(x1, y0)`,
/// `(x0, y1)`, `(x1, y1)`. Zero-area rectangles and query points
/// outside the rectangle are errors, not fallbacks.
pub fn bilinear<T: Float>(
    (x, y): (T, T),
    (x0, y0): (T, T),
    (x1, y1): (T, T),
    [v00, v10, v01, v11]: [T; 4],
) -> Result<T, SrtmError> {
    if x0 == x1 || y0 == y1 {
        return Err(SrtmError::DegenerateRect);
    }
    if x < x0.min(x1) || x > x0.max(x1) || y < y0.min(y1) || y > y0.max(y1) {
        return Err(SrtmError::OutsideRect);
    }
    let tx = (x - x0) / (x1 - x0);
    let lo = v00 + (v10 - v00) * tx;
    let hi = v01 + (v11 - v01) * tx;
    let ty = (y - y0) / (y1 - y0);
    Ok(lo + (hi - lo) * ty)
}

#[cfg(test)]
mod tests {
    use super::{bilinear, linear};
    use crate::SrtmError;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_linear() {
        assert_approx_eq!(linear(0.5_f64, (0.0, 10.0), (1.0, 20.0)).unwrap(), 15.0);
        // Irregular spacing.
        assert_approx_eq!(linear(3.0_f64, (1.0, 0.0), (5.0, 8.0)).unwrap(), 4.0);
        // Reversed axis order.
        assert_approx_eq!(linear(0.5_f64, (1.0, 20.0), (0.0, 10.0)).unwrap(), 15.0);
    }

    #[test]
    fn test_linear_rejects_bad_input() {
        assert!(matches!(
            linear(2.0, (0.0, 1.0), (1.0, 2.0)),
            Err(SrtmError::OutsideRect)
        ));
        assert!(matches!(
            linear(0.0, (1.0, 1.0), (1.0, 2.0)),
            Err(SrtmError::DegenerateRect)
        ));
    }

    #[test]
    fn test_bilinear() {
        let corners = [1.0, 2.0, 3.0, 4.0];
        // Corners reproduce exactly.
        assert_approx_eq!(
            bilinear((0.0_f64, 0.0), (0.0, 0.0), (1.0, 1.0), corners).unwrap(),
            1.0
        );
        assert_approx_eq!(
            bilinear((1.0, 1.0), (0.0, 0.0), (1.0, 1.0), corners).unwrap(),
            4.0
        );
        // Center averages all four.
        assert_approx_eq!(
            bilinear((0.5, 0.5), (0.0, 0.0), (1.0, 1.0), corners).unwrap(),
            2.5
        );
        // Irregular rectangle.
        assert_approx_eq!(
            bilinear((2.0, 1.0), (0.0, 0.0), (4.0, 2.0), corners).unwrap(),
            2.5
        );
    }

    #[test]
    fn test_bilinear_rejects_bad_input() {
        let corners = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            bilinear((2.0, 0.5), (0.0, 0.0), (1.0, 1.0), corners),
            Err(SrtmError::OutsideRect)
        ));
        assert!(matches!(
            bilinear((0.5, 0.5), (0.0, 0.0), (0.0, 1.0), corners),
            Err(SrtmError::DegenerateRect)
        ));
    }
}
