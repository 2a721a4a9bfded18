//! Core data types for the inference engine.
//!
//! All grid types use flat `Vec` storage in row-major layout:
//! `cells[row * cols + col]` maps to the gateway's `grid[row][col]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cell whose content is unknown to the player.
pub const COVERED: i8 = -1;
/// Cell marked as believed-to-contain-a-mine.
pub const FLAGGED: i8 = 9;
/// Neighbor position that falls outside the grid. Only appears in [`LocalState`].
pub const OUT_OF_BOUNDS: i8 = -2;

/// The 8-connected neighborhood, in the fixed order used for every tie-break.
pub const OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// True for a revealed cell showing its adjacent mine count (0-8).
#[inline(always)]
pub fn is_number(code: i8) -> bool {
    (0..=8).contains(&code)
}

/// A rectangular grid of cell codes: -1 = covered, 0-8 = revealed count, 9 = flagged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<i8>,
}

impl Grid {
    /// Create a grid with every cell covered.
    pub fn covered(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![COVERED; rows * cols],
        }
    }

    /// Build a grid from nested rows, rejecting empty, ragged or out-of-domain input.
    pub fn from_rows(rows: Vec<Vec<i8>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(Error::InvalidGrid("grid is empty".into()));
        }

        let mut cells = Vec::with_capacity(height * width);
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(Error::InvalidGrid(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    row.len(),
                    width
                )));
            }
            for (c, code) in row.into_iter().enumerate() {
                if !(COVERED..=FLAGGED).contains(&code) {
                    return Err(Error::InvalidGrid(format!(
                        "cell ({}, {}) has code {} outside -1..=9",
                        r, c, code
                    )));
                }
                cells.push(code);
            }
        }

        Ok(Self {
            rows: height,
            cols: width,
            cells,
        })
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> i8 {
        self.cells[row * self.cols + col]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, row: usize, col: usize, val: i8) {
        self.cells[row * self.cols + col] = val;
    }

    /// Covered cells in row-major order.
    pub fn covered_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &code)| code == COVERED)
            .map(move |(i, _)| (i / cols, i % cols))
    }

    pub fn has_covered(&self) -> bool {
        self.cells.contains(&COVERED)
    }

    /// Snapshot of the 3x3 window centred on `(row, col)`.
    pub fn local_state(&self, row: usize, col: usize) -> LocalState {
        let mut codes = [OUT_OF_BOUNDS; 9];
        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if r >= 0 && r < self.rows as i32 && c >= 0 && c < self.cols as i32 {
                    codes[((dr + 1) * 3 + (dc + 1)) as usize] = self.get(r as usize, c as usize);
                }
            }
        }
        LocalState(codes)
    }

    pub fn to_rows(&self) -> Vec<Vec<i8>> {
        self.cells.chunks(self.cols).map(<[i8]>::to_vec).collect()
    }
}

/// Fixed-size neighborhood snapshot used as the learning state key.
///
/// Codes are laid out row-major over the 3x3 window, so index 4 is the cell
/// itself. Positions outside the grid hold [`OUT_OF_BOUNDS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalState(pub [i8; 9]);

/// A recommended action on one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
    /// `true` to mark the cell as a mine, `false` to reveal it.
    pub flag: bool,
}

impl Move {
    /// Returned by the constraint solver when no rule fires. Carries no information
    /// about cell (0, 0).
    pub const NO_DEDUCTION: Move = Move {
        row: 0,
        col: 0,
        flag: false,
    };

    pub fn reveal(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            flag: false,
        }
    }

    pub fn flag(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            flag: true,
        }
    }
}

/// Boolean per-cell mask (mine layout, revealed cells).
/// Uses `Vec<u8>` (0/1) instead of `Vec<bool>` for simpler WASM interop.
#[derive(Clone, Debug)]
pub struct CellMask {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<u8>,
}

impl CellMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col] != 0
    }

    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, val: bool) {
        self.cells[row * self.cols + col] = val as u8;
    }

    /// Count set cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }
}

/// Pre-computed neighbor cache for all cells.
///
/// Stores the in-bounds 8-directional neighbors for every cell, in [`OFFSETS`] order.
/// Indexed by `row * cols + col`, each entry is a slice of `(nr, nc)` pairs.
#[derive(Clone, Debug)]
pub struct NeighborCache {
    pub rows: usize,
    pub cols: usize,
    /// Flat storage of all neighbor pairs.
    data: Vec<(usize, usize)>,
    /// offsets[i] = start index in `data` for cell i.
    /// offsets[i+1] - offsets[i] = number of neighbors for cell i.
    offsets: Vec<usize>,
}

impl NeighborCache {
    /// Build the neighbor cache for a grid of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        let total = rows * cols;
        let mut data = Vec::with_capacity(total * 8);
        let mut offsets = Vec::with_capacity(total + 1);

        for row in 0..rows {
            for col in 0..cols {
                offsets.push(data.len());
                for &(dr, dc) in &OFFSETS {
                    let nr = row as i32 + dr;
                    let nc = col as i32 + dc;
                    if nr >= 0 && nr < rows as i32 && nc >= 0 && nc < cols as i32 {
                        data.push((nr as usize, nc as usize));
                    }
                }
            }
        }
        offsets.push(data.len()); // sentinel

        Self {
            rows,
            cols,
            data,
            offsets,
        }
    }

    /// Build a cache matching the shape of `grid`.
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.rows, grid.cols)
    }

    /// Get the pre-computed neighbors for cell (row, col).
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> &[(usize, usize)] {
        let idx = row * self.cols + col;
        let start = self.offsets[idx];
        let end = self.offsets[idx + 1];
        &self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Grid::from_rows(vec![vec![-1, -1], vec![-1]]).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        assert!(matches!(Grid::from_rows(vec![]), Err(Error::InvalidGrid(_))));
        assert!(matches!(Grid::from_rows(vec![vec![]]), Err(Error::InvalidGrid(_))));
    }

    #[test]
    fn test_from_rows_rejects_out_of_domain() {
        assert!(matches!(
            Grid::from_rows(vec![vec![0, 10]]),
            Err(Error::InvalidGrid(_))
        ));
        assert!(matches!(
            Grid::from_rows(vec![vec![-2, 0]]),
            Err(Error::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_grid_get_and_rows() {
        let g = Grid::from_rows(vec![vec![1, -1, 9], vec![0, 2, -1]]).unwrap();
        assert_eq!((g.rows, g.cols), (2, 3));
        assert_eq!(g.get(0, 2), 9);
        assert_eq!(g.get(1, 1), 2);
        assert_eq!(g.to_rows(), vec![vec![1, -1, 9], vec![0, 2, -1]]);
    }

    #[test]
    fn test_covered_cells_row_major() {
        let g = Grid::from_rows(vec![vec![1, -1, 9], vec![-1, 2, -1]]).unwrap();
        let covered: Vec<_> = g.covered_cells().collect();
        assert_eq!(covered, vec![(0, 1), (1, 0), (1, 2)]);
        assert!(g.has_covered());
        assert!(!Grid::from_rows(vec![vec![0, 9]]).unwrap().has_covered());
    }

    #[test]
    fn test_local_state_corner_sentinels() {
        let g = Grid::covered(3, 3);
        let LocalState(codes) = g.local_state(0, 0);
        // Window rows -1 and column -1 fall outside the grid.
        for i in [0, 1, 2, 3, 6] {
            assert_eq!(codes[i], OUT_OF_BOUNDS, "index {}", i);
        }
        for i in [4, 5, 7, 8] {
            assert_eq!(codes[i], COVERED, "index {}", i);
        }
    }

    #[test]
    fn test_local_state_interior_has_no_sentinels() {
        let g = Grid::from_rows(vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]).unwrap();
        assert_eq!(g.local_state(1, 1), LocalState([0, 1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn test_local_state_edge_sentinels() {
        let g = Grid::covered(4, 4);
        let LocalState(codes) = g.local_state(3, 2);
        let oob: Vec<usize> = (0..9).filter(|&i| codes[i] == OUT_OF_BOUNDS).collect();
        assert_eq!(oob, vec![6, 7, 8]);
    }

    #[test]
    fn test_neighbor_cache_corners() {
        let nc = NeighborCache::new(5, 5);
        assert_eq!(nc.get(0, 0).len(), 3);
        assert_eq!(nc.get(0, 2).len(), 5);
        assert_eq!(nc.get(2, 2).len(), 8);
    }

    #[test]
    fn test_neighbor_cache_offset_order() {
        let nc = NeighborCache::new(3, 3);
        assert_eq!(
            nc.get(1, 1),
            &[(0, 0), (0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1), (2, 2)]
        );
        assert_eq!(nc.get(0, 0), &[(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_cell_mask_count() {
        let mut m = CellMask::new(5, 5);
        m.set(0, 0, true);
        m.set(2, 3, true);
        m.set(4, 4, true);
        assert_eq!(m.count(), 3);
        m.clear();
        assert_eq!(m.count(), 0);
    }
}
