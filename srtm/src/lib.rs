//! SRTM elevation (`.hgt`) tile format: identifiers, raster decoding,
//! and coordinate math.
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;
mod interp;
mod raster;
mod tile_id;

pub use crate::{
    error::SrtmError,
    interp::{bilinear, linear},
    raster::Raster,
    tile_id::TileId,
};

/// Base floating point type used for all coordinates and calculations.
///
/// Note: this _could_ be a generic parameter, but doing so makes the
/// library more complicated, and `f32` loses precision at 1 arc-second
/// spacing.
pub type C = f64;

/// Sentinel elevation marking a sample as unknown.
pub const VOID: i16 = -32768;

pub(crate) const ARCSEC_PER_DEG: C = 3600.0;

/// The two fixed sampling densities tiles come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// 1 arc-second grid, 3601×3601 samples per tile.
    OneArcSec,
    /// 3 arc-second grid, 1201×1201 samples per tile.
    ThreeArcSec,
}

impl Resolution {
    /// Samples along one side of a tile.
    pub fn side(self) -> usize {
        match self {
            Self::OneArcSec => 3601,
            Self::ThreeArcSec => 1201,
        }
    }

    /// Arcseconds between adjacent samples.
    pub fn arcsec(self) -> u8 {
        match self {
            Self::OneArcSec => 1,
            Self::ThreeArcSec => 3,
        }
    }

    /// Degrees between adjacent samples.
    pub fn spacing_deg(self) -> C {
        C::from(self.arcsec()) / ARCSEC_PER_DEG
    }

    /// Total samples in a tile.
    pub fn samples(self) -> usize {
        self.side() * self.side()
    }

    /// Expected size in bytes of a raw tile: one big-endian `i16` per
    /// sample.
    pub fn byte_len(self) -> usize {
        self.samples() * std::mem::size_of::<i16>()
    }

    /// Determines the resolution class from a raw tile's byte length.
    pub fn from_byte_len(len: usize) -> Option<Self> {
        if len == Self::OneArcSec.byte_len() {
            Some(Self::OneArcSec)
        } else if len == Self::ThreeArcSec.byte_len() {
            Some(Self::ThreeArcSec)
        } else {
            None
        }
    }
}
