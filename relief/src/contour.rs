//! Isoline extraction by marching squares.
//!
//! Each 2×2 cell of the raster is classified into a 4-bit case by
//! comparing its corners against the isovalue; the case selects which
//! edge crossings to connect. Crossings on interior edges are computed
//! once and shared with the neighboring cell to the south and east, so
//! adjacent segments meet exactly.

use crate::{error::ReliefError, field::ElevationField};
use elevation::CancelToken;
use geo::geometry::Coord;
use rayon::prelude::*;
use srtm::{C, VOID};

/// One isoline piece: a pair of geographic endpoints at one threshold.
///
/// Segments come back unordered and unmerged; joining them into
/// polylines is the consumer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolineSegment {
    pub level: C,
    pub start: Coord<C>,
    pub end: Coord<C>,
}

/// Evenly spaced isovalues covering `[min, max]`, aligned to multiples
/// of `interval`.
pub fn contour_levels(min: C, max: C, interval: C) -> Vec<C> {
    if interval <= 0.0 || max < min {
        return Vec::new();
    }
    let mut levels = Vec::new();
    let mut level = (min / interval).ceil() * interval;
    while level <= max {
        levels.push(level);
        level += interval;
    }
    levels
}

/// Extracts isolines for every level; levels are independent and run in
/// parallel.
pub fn isolines(
    field: &impl ElevationField,
    levels: &[C],
    cancel: &CancelToken,
) -> Result<Vec<IsolineSegment>, ReliefError> {
    let per_level: Vec<Vec<IsolineSegment>> = levels
        .par_iter()
        .map(|&level| isolines_at(field, level, cancel))
        .collect::<Result<_, _>>()?;
    Ok(per_level.into_iter().flatten().collect())
}

/// Corner bit layout: NW=1, NE=2, SE=4, SW=8; a bit is set when the
/// corner is at or above the isovalue.
fn cell_case(nw: i16, ne: i16, se: i16, sw: i16, level: C) -> u8 {
    let mut case = 0u8;
    if C::from(nw) >= level {
        case |= 1;
    }
    if C::from(ne) >= level {
        case |= 2;
    }
    if C::from(se) >= level {
        case |= 4;
    }
    if C::from(sw) >= level {
        case |= 8;
    }
    case
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    North,
    East,
    South,
    West,
}

/// Which edge crossings each case connects. The two saddle cases carry
/// both pairings; `saddle_pairs` picks between them.
fn single_pairs(case: u8) -> &'static [(Edge, Edge)] {
    use Edge::{East, North, South, West};
    match case {
        1 | 14 => &[(North, West)],
        2 | 13 => &[(North, East)],
        4 | 11 => &[(East, South)],
        7 | 8 => &[(South, West)],
        3 | 12 => &[(West, East)],
        6 | 9 => &[(North, South)],
        _ => &[],
    }
}

/// Saddle disambiguation: the mean of the four corners decides which
/// diagonal stays connected. A mean at or above the isovalue keeps the
/// above-threshold diagonal contiguous through the cell center, so the
/// segments hug the two below-threshold corners; a lower mean isolates
/// the high corners instead.
fn saddle_pairs(case: u8, mean_above: bool) -> &'static [(Edge, Edge)] {
    use Edge::{East, North, South, West};
    match (case, mean_above) {
        // NW and SE above.
        (5, true) => &[(North, East), (South, West)],
        (5, false) => &[(North, West), (East, South)],
        // NE and SW above.
        (10, true) => &[(North, West), (East, South)],
        (10, false) => &[(North, East), (South, West)],
        _ => &[],
    }
}

/// Crossing point on the edge between two corner samples, when they
/// straddle the isovalue.
fn edge_crossing(c0: Coord<C>, e0: i16, c1: Coord<C>, e1: i16, level: C) -> Option<Coord<C>> {
    let above0 = C::from(e0) >= level;
    let above1 = C::from(e1) >= level;
    if above0 == above1 {
        return None;
    }
    let t = (level - C::from(e0)) / (C::from(e1) - C::from(e0));
    Some(Coord {
        x: c0.x + (c1.x - c0.x) * t,
        y: c0.y + (c1.y - c0.y) * t,
    })
}

/// Crossings on the horizontal edges along raster row `row`, one slot
/// per column pair.
fn row_crossings(field: &impl ElevationField, row: usize, level: C) -> Vec<Option<Coord<C>>> {
    let (_, cols) = field.dims();
    (0..cols - 1)
        .map(|col| {
            let e0 = field.elevation(row, col);
            let e1 = field.elevation(row, col + 1);
            if e0 == VOID || e1 == VOID {
                return None;
            }
            edge_crossing(field.coord(row, col), e0, field.coord(row, col + 1), e1, level)
        })
        .collect()
}

/// Extracts isoline segments for a single level.
pub fn isolines_at(
    field: &impl ElevationField,
    level: C,
    cancel: &CancelToken,
) -> Result<Vec<IsolineSegment>, ReliefError> {
    let (rows, cols) = field.dims();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 {
        return Ok(segments);
    }

    // Horizontal crossings of the cell row's north boundary; computed
    // for row 0 up front, then handed down from each row's south
    // boundary.
    let mut north_edges = row_crossings(field, 0, level);
    for row in 0..rows - 1 {
        if cancel.is_cancelled() {
            return Err(ReliefError::Cancelled);
        }
        let south_edges = row_crossings(field, row + 1, level);
        // East crossing of the previous cell, reused as this cell's
        // west. `None` means "not computed" (start of row or after a
        // void cell), the inner option is the crossing itself.
        let mut carried_west: Option<Option<Coord<C>>> = None;
        for col in 0..cols - 1 {
            let nw = field.elevation(row, col);
            let ne = field.elevation(row, col + 1);
            let se = field.elevation(row + 1, col + 1);
            let sw = field.elevation(row + 1, col);
            if nw == VOID || ne == VOID || se == VOID || sw == VOID {
                carried_west = None;
                continue;
            }

            let east = edge_crossing(
                field.coord(row, col + 1),
                ne,
                field.coord(row + 1, col + 1),
                se,
                level,
            );
            let west = match carried_west {
                Some(crossing) => crossing,
                None => edge_crossing(
                    field.coord(row, col),
                    nw,
                    field.coord(row + 1, col),
                    sw,
                    level,
                ),
            };
            carried_west = Some(east);

            let case = cell_case(nw, ne, se, sw, level);
            if case == 0 || case == 15 {
                continue;
            }
            let pairs = if case == 5 || case == 10 {
                let mean =
                    (C::from(nw) + C::from(ne) + C::from(se) + C::from(sw)) / 4.0;
                saddle_pairs(case, mean >= level)
            } else {
                single_pairs(case)
            };
            let crossing = |edge: Edge| match edge {
                Edge::North => north_edges[col],
                Edge::East => east,
                Edge::South => south_edges[col],
                Edge::West => west,
            };
            for &(from, to) in pairs {
                if let (Some(start), Some(end)) = (crossing(from), crossing(to)) {
                    segments.push(IsolineSegment { level, start, end });
                }
            }
        }
        north_edges = south_edges;
    }
    Ok(segments)
}
