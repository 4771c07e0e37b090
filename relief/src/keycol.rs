//! Key-col (saddle point) search between two peaks.
//!
//! The lowest point on the highest connecting path falls out of a
//! union-find over raster cells activated in descending elevation
//! order: the moment one component contains cells reachable from both
//! peaks, the cell whose activation merged them is the key col. This is
//! flood-fill-by-threshold phrased as incremental connectivity; it runs
//! once per tool invocation and checks for cancellation between cell
//! batches.

use crate::{error::ReliefError, field::ElevationField};
use elevation::CancelToken;
use geo::geometry::Coord;
use log::debug;
use srtm::{C, VOID};
use std::cmp::Reverse;

/// Cells processed between cancellation checks.
const CANCEL_BATCH: usize = 4096;

/// Neighborhood used when flooding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

impl Connectivity {
    fn deltas(self) -> &'static [(isize, isize)] {
        const ORTHOGONAL: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        const ALL: [(isize, isize); 8] = [
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (-1, 1),
            (1, -1),
            (1, 1),
        ];
        match self {
            Self::Four => &ORTHOGONAL,
            Self::Eight => &ALL,
        }
    }
}

/// The saddle found between two peaks.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCol {
    pub elevation: i16,
    pub location: Coord<C>,
}

/// Index-arena union-find with rank union, path halving, and
/// peak-reachability flags folded into the roots.
struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
    holds_a: Vec<bool>,
    holds_b: Vec<bool>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            parent: (0..len as u32).collect(),
            rank: vec![0; len],
            holds_a: vec![false; len],
            holds_b: vec![false; len],
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] as usize != index {
            let grandparent = self.parent[self.parent[index] as usize];
            self.parent[index] = grandparent;
            index = grandparent as usize;
        }
        index
    }

    fn union(&mut self, left: usize, right: usize) {
        let mut root_left = self.find(left);
        let mut root_right = self.find(right);
        if root_left == root_right {
            return;
        }
        if self.rank[root_left] < self.rank[root_right] {
            std::mem::swap(&mut root_left, &mut root_right);
        }
        #[allow(clippy::cast_possible_truncation)]
        {
            self.parent[root_right] = root_left as u32;
        }
        self.holds_a[root_left] |= self.holds_a[root_right];
        self.holds_b[root_left] |= self.holds_b[root_right];
        if self.rank[root_left] == self.rank[root_right] {
            self.rank[root_left] += 1;
        }
    }

    fn flag(&mut self, index: usize, is_a: bool, is_b: bool) {
        let root = self.find(index);
        self.holds_a[root] |= is_a;
        self.holds_b[root] |= is_b;
    }

    fn holds_both(&mut self, index: usize) -> bool {
        let root = self.find(index);
        self.holds_a[root] && self.holds_b[root]
    }
}

/// Finds the key col between `peak_a` and `peak_b` within `field`.
///
/// The field is the search bounds: snapshot a grid covering the area
/// the path may traverse. Connectivity is the caller's choice.
pub fn key_col(
    field: &impl ElevationField,
    peak_a: Coord<C>,
    peak_b: Coord<C>,
    connectivity: Connectivity,
    cancel: &CancelToken,
) -> Result<KeyCol, ReliefError> {
    let (rows, cols) = field.dims();
    let cell_index = |(row, col): (usize, usize)| row * cols + col;
    let index_a = cell_index(field.index_of(peak_a).ok_or(ReliefError::PeakOutOfBounds)?);
    let index_b = cell_index(field.index_of(peak_b).ok_or(ReliefError::PeakOutOfBounds)?);
    let elevation_at = |index: usize| field.elevation(index / cols, index % cols);
    if elevation_at(index_a) == VOID || elevation_at(index_b) == VOID {
        return Err(ReliefError::PeakVoid);
    }

    // Void cells never activate, so components can only grow across
    // real data.
    #[allow(clippy::cast_possible_truncation)]
    let mut order: Vec<u32> = (0..rows * cols)
        .filter(|&index| elevation_at(index) != VOID)
        .map(|index| index as u32)
        .collect();
    order.sort_unstable_by_key(|&index| Reverse(elevation_at(index as usize)));
    debug!("key col search over {} cells", order.len());

    let mut union_find = UnionFind::new(rows * cols);
    let mut active = vec![false; rows * cols];
    for (processed, &cell) in order.iter().enumerate() {
        if processed % CANCEL_BATCH == 0 && cancel.is_cancelled() {
            return Err(ReliefError::Cancelled);
        }
        let cell = cell as usize;
        active[cell] = true;
        union_find.flag(cell, cell == index_a, cell == index_b);

        let (row, col) = (cell / cols, cell % cols);
        for &(d_row, d_col) in connectivity.deltas() {
            #[allow(clippy::cast_possible_wrap)]
            let (neighbor_row, neighbor_col) = (row as isize + d_row, col as isize + d_col);
            if neighbor_row < 0
                || neighbor_col < 0
                || neighbor_row >= rows as isize
                || neighbor_col >= cols as isize
            {
                continue;
            }
            #[allow(clippy::cast_sign_loss)]
            let neighbor = neighbor_row as usize * cols + neighbor_col as usize;
            if active[neighbor] {
                union_find.union(cell, neighbor);
            }
        }

        // The activated cell is the lowest so far; if its component now
        // reaches both peaks, it is the col.
        if union_find.holds_both(cell) {
            return Ok(KeyCol {
                elevation: elevation_at(cell),
                location: field.coord(row, col),
            });
        }
    }
    Err(ReliefError::NotConnected)
}
