//! Board generation: mine placement and number calculation.
//!
//! Used by the training environment to build a fresh ground-truth board at
//! every episode reset.

use crate::error::{Error, Result};
use crate::rng::GameRng;
use crate::types::{CellMask, Grid, NeighborCache, FLAGGED};

/// Mine layout of a board.
pub type Mines = CellMask;

/// Number of cells in the 3x3 zone around `(row, col)` that lie on the board.
fn safe_zone_size(rows: usize, cols: usize, row: usize, col: usize) -> usize {
    let r = (row.saturating_sub(1)..=(row + 1).min(rows - 1)).count();
    let c = (col.saturating_sub(1)..=(col + 1).min(cols - 1)).count();
    r * c
}

/// Place `bomb_count` mines at distinct uniformly random cells.
///
/// Duplicate picks are rejected and redrawn. When `safe_start` is given, no
/// mine lands in the 3x3 zone around it, so the first reveal there is a zero.
pub fn place_mines(
    rows: usize,
    cols: usize,
    bomb_count: usize,
    safe_start: Option<(usize, usize)>,
    rng: &mut GameRng,
) -> Result<Mines> {
    let available = match safe_start {
        Some((sr, sc)) => rows * cols - safe_zone_size(rows, cols, sr, sc),
        None => rows * cols,
    };
    if bomb_count > available {
        return Err(Error::InvalidConfig(format!(
            "{} mines do not fit in {} free cells",
            bomb_count, available
        )));
    }

    let mut mines = CellMask::new(rows, cols);
    let mut placed = 0;

    while placed < bomb_count {
        let row = rng.gen_range(rows);
        let col = rng.gen_range(cols);

        if let Some((sr, sc)) = safe_start {
            if row.abs_diff(sr) <= 1 && col.abs_diff(sc) <= 1 {
                continue;
            }
        }

        if !mines.get(row, col) {
            mines.set(row, col, true);
            placed += 1;
        }
    }

    Ok(mines)
}

/// Calculate the ground-truth number grid.
///
/// Each non-mine cell holds the count of adjacent mines (0-8); mine cells hold 9.
pub fn calculate_numbers(mines: &Mines, neighbor_cache: &NeighborCache) -> Grid {
    let mut grid = Grid::covered(mines.rows, mines.cols);

    for row in 0..mines.rows {
        for col in 0..mines.cols {
            if mines.get(row, col) {
                grid.set(row, col, FLAGGED);
                continue;
            }

            let count = neighbor_cache
                .get(row, col)
                .iter()
                .filter(|&&(nr, nc)| mines.get(nr, nc))
                .count();
            grid.set(row, col, count as i8);
        }
    }

    grid
}
