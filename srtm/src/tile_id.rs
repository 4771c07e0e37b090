use crate::{error::SrtmError, C};
use geo::geometry::Coord;
use std::{fmt, str::FromStr};

/// Identifier of one degree-square tile: the floored latitude and
/// longitude of its southwest corner.
///
/// Renders and parses as `[N|S]dd[E|W]ddd`, e.g. `N44W072`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    lat: i16,
    lon: i16,
}

impl TileId {
    pub fn new(lat: i16, lon: i16) -> Self {
        Self { lat, lon }
    }

    /// Returns the id of the tile containing `coord`.
    pub fn from_coord(coord: Coord<C>) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            lat: coord.y.floor() as i16,
            lon: coord.x.floor() as i16,
        }
    }

    /// Southwest-corner latitude in whole degrees.
    pub fn lat(self) -> i16 {
        self.lat
    }

    /// Southwest-corner longitude in whole degrees.
    pub fn lon(self) -> i16 {
        self.lon
    }

    /// Southwest corner of the tile.
    pub fn sw_corner(self) -> Coord<C> {
        Coord {
            x: C::from(self.lon),
            y: C::from(self.lat),
        }
    }

    /// Northeast corner of the tile.
    pub fn ne_corner(self) -> Coord<C> {
        Coord {
            x: C::from(self.lon) + 1.0,
            y: C::from(self.lat) + 1.0,
        }
    }

    /// Returns whether `coord` falls inside this tile's degree square.
    pub fn contains(self, coord: Coord<C>) -> bool {
        Self::from_coord(coord) == self
    }

    /// The 8 tiles surrounding this one.
    pub fn neighbors(self) -> [TileId; 8] {
        let mut out = [self; 8];
        let mut n = 0;
        for dlat in -1..=1 {
            for dlon in -1..=1 {
                if dlat == 0 && dlon == 0 {
                    continue;
                }
                out[n] = Self::new(self.lat + dlat, self.lon + dlon);
                n += 1;
            }
        }
        out
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_s = if self.lat.is_negative() { 'S' } else { 'N' };
        let e_w = if self.lon.is_negative() { 'W' } else { 'E' };
        write!(
            f,
            "{n_s}{:02}{e_w}{:03}",
            self.lat.abs(),
            self.lon.abs()
        )
    }
}

impl FromStr for TileId {
    type Err = SrtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mk_err = || SrtmError::TileId(s.to_owned());
        if s.len() != 7 {
            return Err(mk_err());
        }
        let lat_sign = match &s[0..1] {
            "N" => 1,
            "S" => -1,
            _ => return Err(mk_err()),
        };
        let lat = lat_sign * s[1..3].parse::<i16>().map_err(|_| mk_err())?;
        let lon_sign = match &s[3..4] {
            "E" => 1,
            "W" => -1,
            _ => return Err(mk_err()),
        };
        let lon = lon_sign * s[4..7].parse::<i16>().map_err(|_| mk_err())?;
        Ok(Self { lat, lon })
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, TileId};

    #[test]
    fn test_display() {
        assert_eq!(TileId::new(44, -72).to_string(), "N44W072");
        assert_eq!(TileId::new(-33, 151).to_string(), "S33E151");
        assert_eq!(TileId::new(0, 0).to_string(), "N00E000");
    }

    #[test]
    fn test_round_trip_all_quadrants() {
        for id in [
            TileId::new(44, -72),
            TileId::new(-34, 151),
            TileId::new(37, 14),
            TileId::new(-1, -91),
            TileId::new(0, 0),
        ] {
            let parsed: TileId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn test_from_coord_floors() {
        // A smidge into each quadrant lands in the tile whose SW corner
        // is the floor of both coordinates.
        let eps = f64::EPSILON;
        assert_eq!(
            TileId::from_coord(Coord { x: eps, y: eps }),
            TileId::new(0, 0)
        );
        assert_eq!(
            TileId::from_coord(Coord { x: -eps, y: eps }),
            TileId::new(0, -1)
        );
        assert_eq!(
            TileId::from_coord(Coord { x: -eps, y: -eps }),
            TileId::new(-1, -1)
        );
        assert_eq!(
            TileId::from_coord(Coord { x: eps, y: -eps }),
            TileId::new(-1, 0)
        );
        assert_eq!(
            TileId::from_coord(Coord {
                x: -71.30325,
                y: 44.2705,
            }),
            TileId::new(44, -72)
        );
    }

    #[test]
    fn test_reject_malformed() {
        assert!("N44W72".parse::<TileId>().is_err());
        assert!("X44W072".parse::<TileId>().is_err());
        assert!("N44Q072".parse::<TileId>().is_err());
        assert!("N4bW072".parse::<TileId>().is_err());
    }

    #[test]
    fn test_neighbors() {
        let neighbors = TileId::new(0, 0).neighbors();
        assert_eq!(neighbors.len(), 8);
        assert!(neighbors.contains(&TileId::new(-1, -1)));
        assert!(neighbors.contains(&TileId::new(1, 1)));
        assert!(!neighbors.contains(&TileId::new(0, 0)));
    }
}
