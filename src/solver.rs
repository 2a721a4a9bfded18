//! Constraint solver: single-cell counting rules.
//!
//! Scans revealed numbers in row-major order and returns the first move that
//! local counting proves:
//! - Flag rule: every covered neighbor must be a mine.
//! - Safe rule: the number is already satisfied by flags, so every covered
//!   neighbor is safe.
//!
//! The chosen target is always the first covered neighbor in [`OFFSETS`] order.
//!
//! [`OFFSETS`]: crate::types::OFFSETS

use crate::error::{Error, Result};
use crate::types::{Grid, Move, NeighborCache, COVERED, FLAGGED};

/// Neighbor tally around one numbered cell.
struct Tally {
    covered: usize,
    flagged: usize,
    first_covered: Option<(usize, usize)>,
}

fn tally(grid: &Grid, nc: &NeighborCache, row: usize, col: usize) -> Tally {
    let mut t = Tally {
        covered: 0,
        flagged: 0,
        first_covered: None,
    };
    for &(nr, ncol) in nc.get(row, col) {
        match grid.get(nr, ncol) {
            COVERED => {
                t.covered += 1;
                t.first_covered.get_or_insert((nr, ncol));
            }
            FLAGGED => t.flagged += 1,
            _ => {}
        }
    }
    t
}

/// Find the first move justified by the counting rules, if any.
pub fn deduce(grid: &Grid, nc: &NeighborCache) -> Option<Move> {
    debug_assert_eq!(
        (nc.rows, nc.cols),
        (grid.rows, grid.cols),
        "neighbor cache shape does not match grid"
    );
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let code = grid.get(row, col);
            // Zeros never force a flag; covered and flagged cells carry no count.
            if !(1..=8).contains(&code) {
                continue;
            }
            let code = code as usize;

            let t = tally(grid, nc, row, col);
            let Some((tr, tc)) = t.first_covered else {
                continue;
            };

            // All non-revealed neighbors are needed to reach the count.
            if t.covered + t.flagged <= code {
                return Some(Move::flag(tr, tc));
            }
            if t.flagged == code {
                return Some(Move::reveal(tr, tc));
            }
        }
    }
    None
}

/// Deterministic move for `grid`.
///
/// Returns [`Move::NO_DEDUCTION`] when no rule fires anywhere. That value means
/// "no information", not "(0, 0) is safe"; use [`deduce`] to tell the two apart.
pub fn solve(grid: &Grid, nc: &NeighborCache) -> Result<Move> {
    if !grid.has_covered() {
        return Err(Error::NoCandidateMoves);
    }
    Ok(deduce(grid, nc).unwrap_or(Move::NO_DEDUCTION))
}
