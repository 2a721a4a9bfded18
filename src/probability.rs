//! Probability estimator: local mine-density approximation.
//!
//! Every revealed number spreads its remaining mine count evenly over its
//! covered neighbors. A covered cell's estimate is the mean of the shares it
//! received, or [`PRIOR`] when no number touches it. This ignores coupling
//! between overlapping constraints, so the values are heuristics rather than
//! exact marginals.

use crate::error::{Error, Result};
use crate::types::{is_number, Grid, Move, NeighborCache, COVERED, FLAGGED};

/// Estimate for a covered cell with no numbered neighbor.
pub const PRIOR: f64 = 0.5;

/// Per-cell mine probability. `None` marks cells that are not covered.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMap {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<Option<f64>>,
}

impl ProbabilityMap {
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells[row * self.cols + col]
    }

    /// Covered cell with the lowest estimate; the first one in row-major order on ties.
    pub fn safest(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.cells.iter().enumerate() {
            let Some(p) = *p else { continue };
            match best {
                Some((_, bp)) if p >= bp => {}
                _ => best = Some((i, p)),
            }
        }
        best.map(|(i, _)| (i / self.cols, i % self.cols))
    }

    /// Flat row-major values with `NaN` for non-covered cells.
    pub fn to_flat(&self) -> Vec<f64> {
        self.cells.iter().map(|p| p.unwrap_or(f64::NAN)).collect()
    }
}

/// Shares one numbered cell hands to its covered neighbors.
///
/// Returns `None` for cells that are not numbers, and for inconsistent numbers
/// that already touch more flags than their count. The shares sum to the
/// number's remaining mine count.
pub fn constraint_shares(
    grid: &Grid,
    nc: &NeighborCache,
    row: usize,
    col: usize,
) -> Option<Vec<((usize, usize), f64)>> {
    debug_assert_eq!(
        (nc.rows, nc.cols),
        (grid.rows, grid.cols),
        "neighbor cache shape does not match grid"
    );
    let code = grid.get(row, col);
    if !is_number(code) {
        return None;
    }

    let neighbors = nc.get(row, col);
    let flagged = neighbors
        .iter()
        .filter(|&&(nr, ncol)| grid.get(nr, ncol) == FLAGGED)
        .count() as i32;
    let remaining = code as i32 - flagged;
    if remaining < 0 {
        return None;
    }

    let covered: Vec<(usize, usize)> = neighbors
        .iter()
        .copied()
        .filter(|&(nr, ncol)| grid.get(nr, ncol) == COVERED)
        .collect();
    if covered.is_empty() {
        return Some(Vec::new());
    }

    let share = remaining as f64 / covered.len() as f64;
    Some(covered.into_iter().map(|cell| (cell, share)).collect())
}

/// Estimate the mine probability of every covered cell.
pub fn estimate(grid: &Grid, nc: &NeighborCache) -> ProbabilityMap {
    debug_assert_eq!(
        (nc.rows, nc.cols),
        (grid.rows, grid.cols),
        "neighbor cache shape does not match grid"
    );
    let total = grid.rows * grid.cols;
    let mut sums = vec![0.0f64; total];
    let mut counts = vec![0u32; total];

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let Some(shares) = constraint_shares(grid, nc, row, col) else {
                continue;
            };
            for ((nr, ncol), share) in shares {
                let idx = nr * grid.cols + ncol;
                sums[idx] += share;
                counts[idx] += 1;
            }
        }
    }

    let mut cells = vec![None; total];
    for (idx, cell) in cells.iter_mut().enumerate() {
        if grid.get(idx / grid.cols, idx % grid.cols) != COVERED {
            continue;
        }
        *cell = Some(if counts[idx] > 0 {
            sums[idx] / counts[idx] as f64
        } else {
            PRIOR
        });
    }

    ProbabilityMap {
        rows: grid.rows,
        cols: grid.cols,
        cells,
    }
}

/// Reveal the covered cell with the lowest estimated mine probability.
pub fn safest_move(grid: &Grid, nc: &NeighborCache) -> Result<Move> {
    estimate(grid, nc)
        .safest()
        .map(|(row, col)| Move::reveal(row, col))
        .ok_or(Error::NoCandidateMoves)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn grid(rows: Vec<Vec<i8>>) -> (Grid, NeighborCache) {
        let g = Grid::from_rows(rows).unwrap();
        let nc = NeighborCache::for_grid(&g);
        (g, nc)
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "neighbor cache shape does not match grid")]
    fn test_estimate_rejects_mismatched_cache() {
        let g = Grid::covered(2, 2);
        estimate(&g, &NeighborCache::new(3, 3));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "neighbor cache shape does not match grid")]
    fn test_shares_reject_mismatched_cache() {
        let g = Grid::from_rows(vec![vec![1, -1, -1]]).unwrap();
        constraint_shares(&g, &NeighborCache::new(1, 2), 0, 0);
    }

    #[test]
    fn test_unconstrained_cells_get_prior() {
        let g = Grid::covered(3, 4);
        let nc = NeighborCache::for_grid(&g);
        let map = estimate(&g, &nc);
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(map.get(row, col), Some(PRIOR));
            }
        }
    }

    #[test]
    fn test_far_cell_keeps_prior() {
        let (g, nc) = grid(vec![vec![1, -1, -1, -1], vec![-1, -1, -1, -1]]);
        let map = estimate(&g, &nc);
        assert_eq!(map.get(0, 3), Some(0.5));
        assert_eq!(map.get(1, 3), Some(0.5));
        assert_eq!(map.get(0, 0), None);
    }

    #[test]
    fn test_shares_sum_to_remaining() {
        let (g, nc) = grid(vec![vec![-1, 9, -1], vec![-1, 3, -1], vec![-1, -1, 0]]);
        let shares = constraint_shares(&g, &nc, 1, 1).unwrap();
        assert_eq!(shares.len(), 6);
        let total: f64 = shares.iter().map(|&(_, s)| s).sum();
        assert!((total - 2.0).abs() < EPS);
    }

    #[test]
    fn test_inconsistent_number_is_ignored() {
        // The 1 touches two flags; it must not contribute anything.
        let (g, nc) = grid(vec![vec![9, 1, 9], vec![-1, -1, -1]]);
        assert!(constraint_shares(&g, &nc, 0, 1).is_none());
        let map = estimate(&g, &nc);
        assert_eq!(map.get(1, 0), Some(PRIOR));
        assert_eq!(map.get(1, 1), Some(PRIOR));
    }

    #[test]
    fn test_zero_marks_neighbors_safe() {
        let (g, nc) = grid(vec![vec![0, -1], vec![-1, -1]]);
        let map = estimate(&g, &nc);
        assert_eq!(map.get(0, 1), Some(0.0));
        assert_eq!(map.get(1, 1), Some(0.0));
        assert_eq!(safest_move(&g, &nc).unwrap(), Move::reveal(0, 1));
    }

    #[test]
    fn test_contributions_are_averaged() {
        // (0,1) hears 1/2 from (0,0), 2/3 from (0,2) and 0 from (1,0).
        let (g, nc) = grid(vec![vec![1, -1, 2], vec![0, -1, -1]]);
        let map = estimate(&g, &nc);
        let p01 = map.get(0, 1).unwrap();
        assert!((p01 - (0.5 + 2.0 / 3.0 + 0.0) / 3.0).abs() < EPS);
        // (1,2) only hears from (0,2).
        assert!((map.get(1, 2).unwrap() - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_fixture_picks_first_neighbor_of_the_one() {
        let (g, nc) = grid(vec![vec![1, -1, -1], vec![-1, -1, -1], vec![-1, -1, -1]]);
        let map = estimate(&g, &nc);
        for (row, col) in [(0, 1), (1, 0), (1, 1)] {
            assert!((map.get(row, col).unwrap() - 1.0 / 3.0).abs() < EPS);
        }
        assert_eq!(map.get(2, 2), Some(PRIOR));
        assert_eq!(safest_move(&g, &nc).unwrap(), Move::reveal(0, 1));
    }

    #[test]
    fn test_ties_break_row_major() {
        let g = Grid::covered(2, 2);
        let nc = NeighborCache::for_grid(&g);
        assert_eq!(safest_move(&g, &nc).unwrap(), Move::reveal(0, 0));
    }

    #[test]
    fn test_no_covered_cells_is_error() {
        let (g, nc) = grid(vec![vec![0, 1], vec![1, 9]]);
        assert!(matches!(safest_move(&g, &nc), Err(Error::NoCandidateMoves)));
    }

    #[test]
    fn test_to_flat_marks_revealed_as_nan() {
        let (g, nc) = grid(vec![vec![0, -1]]);
        let flat = estimate(&g, &nc).to_flat();
        assert!(flat[0].is_nan());
        assert_eq!(flat[1], 0.0);
    }
}
