//! Training environment: hidden board, reveal mechanics and rewards.
//!
//! Lifecycle: `Fresh` until the first reset, `InProgress` while playing,
//! `Terminated` after a mine or a cleared board. The ground truth is only
//! visible through the masked observation returned by `reset` and `step`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{self, Mines};
use crate::error::{Error, Result};
use crate::rng::GameRng;
use crate::types::{CellMask, Grid, NeighborCache};

/// Reward for stepping on an already revealed cell.
pub const REDUNDANT_PENALTY: f64 = -0.1;
/// Reward for revealing a mine.
pub const MINE_PENALTY: f64 = -10.0;
/// Reward for revealing a safe cell.
pub const REVEAL_REWARD: f64 = 1.0;
/// Extra reward for revealing the last safe cell.
pub const CLEAR_BONUS: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub rows: usize,
    pub cols: usize,
    pub bombs: usize,
    /// Revealing a zero also reveals its neighbors, recursively.
    pub cascade: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            rows: 9,
            cols: 9,
            bombs: 10,
            cascade: false,
        }
    }
}

impl EnvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidConfig(format!(
                "board must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.bombs >= self.rows * self.cols {
            return Err(Error::InvalidConfig(format!(
                "{} mines leave no safe cell on a {}x{} board",
                self.bombs, self.rows, self.cols
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeStatus {
    Fresh,
    InProgress,
    Terminated,
}

/// What a single step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Redundant,
    Safe,
    Mine,
    Cleared,
}

#[derive(Clone, Debug)]
pub struct Step {
    pub observation: Grid,
    pub reward: f64,
    pub terminal: bool,
    pub outcome: StepOutcome,
}

pub struct Environment {
    config: EnvConfig,
    nc: NeighborCache,
    mines: Mines,
    numbers: Grid,
    revealed: CellMask,
    revealed_count: usize,
    status: EpisodeStatus,
    rng: GameRng,
}

impl Environment {
    pub fn new(config: EnvConfig) -> Result<Self> {
        Self::with_rng(config, GameRng::new())
    }

    /// Deterministic boards for replay and tests.
    pub fn with_seed(config: EnvConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, GameRng::from_seed(seed))
    }

    fn with_rng(config: EnvConfig, rng: GameRng) -> Result<Self> {
        config.validate()?;
        let EnvConfig { rows, cols, .. } = config;
        Ok(Self {
            config,
            nc: NeighborCache::new(rows, cols),
            mines: Mines::new(rows, cols),
            numbers: Grid::covered(rows, cols),
            revealed: CellMask::new(rows, cols),
            revealed_count: 0,
            status: EpisodeStatus::Fresh,
            rng,
        })
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    /// Start a new episode on a freshly generated board and return the
    /// fully covered observation.
    pub fn reset(&mut self) -> Result<Grid> {
        let EnvConfig { rows, cols, bombs, .. } = self.config;
        let mines = board::place_mines(rows, cols, bombs, None, &mut self.rng)?;
        self.install_board(mines);
        Ok(self.observation())
    }

    /// Start a new episode whose first reveal at `(row, col)` is guaranteed safe.
    ///
    /// No mine is placed in the 3x3 zone around the start cell, which is then
    /// revealed as the episode's first step.
    pub fn reset_with_safe_start(&mut self, row: usize, col: usize) -> Result<Step> {
        self.check_bounds(row, col)?;
        let EnvConfig { rows, cols, bombs, .. } = self.config;
        let mines = board::place_mines(rows, cols, bombs, Some((row, col)), &mut self.rng)?;
        self.install_board(mines);
        self.step(row, col)
    }

    fn install_board(&mut self, mines: Mines) {
        self.mines = mines;
        self.numbers = board::calculate_numbers(&self.mines, &self.nc);
        self.revealed.clear();
        self.revealed_count = 0;
        self.status = EpisodeStatus::InProgress;
        debug!(mines = self.mines.count(), "board generated");
    }

    /// Current masked view: revealed cells show their value, covered cells show -1.
    pub fn observation(&self) -> Grid {
        let mut obs = Grid::covered(self.config.rows, self.config.cols);
        for row in 0..self.config.rows {
            for col in 0..self.config.cols {
                if self.revealed.get(row, col) {
                    obs.set(row, col, self.numbers.get(row, col));
                }
            }
        }
        obs
    }

    /// Reveal `(row, col)`.
    pub fn step(&mut self, row: usize, col: usize) -> Result<Step> {
        match self.status {
            EpisodeStatus::Fresh => return Err(Error::EpisodeNotStarted),
            EpisodeStatus::Terminated => return Err(Error::EpisodeFinished),
            EpisodeStatus::InProgress => {}
        }
        self.check_bounds(row, col)?;

        if self.revealed.get(row, col) {
            return Ok(self.finish_step(REDUNDANT_PENALTY, StepOutcome::Redundant));
        }

        if self.mines.get(row, col) {
            self.mark_revealed(row, col);
            self.status = EpisodeStatus::Terminated;
            return Ok(self.finish_step(MINE_PENALTY, StepOutcome::Mine));
        }

        if self.config.cascade {
            self.reveal_cascade(row, col);
        } else {
            self.mark_revealed(row, col);
        }

        let safe_cells = self.config.rows * self.config.cols - self.mines.count();
        if self.revealed_count == safe_cells {
            self.status = EpisodeStatus::Terminated;
            return Ok(self.finish_step(REVEAL_REWARD + CLEAR_BONUS, StepOutcome::Cleared));
        }
        Ok(self.finish_step(REVEAL_REWARD, StepOutcome::Safe))
    }

    fn finish_step(&self, reward: f64, outcome: StepOutcome) -> Step {
        Step {
            observation: self.observation(),
            reward,
            terminal: self.status == EpisodeStatus::Terminated,
            outcome,
        }
    }

    fn mark_revealed(&mut self, row: usize, col: usize) {
        if !self.revealed.get(row, col) {
            self.revealed.set(row, col, true);
            self.revealed_count += 1;
        }
    }

    /// Reveal with flood fill through zeros.
    fn reveal_cascade(&mut self, row: usize, col: usize) {
        let mut stack: Vec<(usize, usize)> = vec![(row, col)];

        while let Some((cr, cc)) = stack.pop() {
            if self.revealed.get(cr, cc) || self.mines.get(cr, cc) {
                continue;
            }
            self.mark_revealed(cr, cc);

            if self.numbers.get(cr, cc) == 0 {
                stack.extend(
                    self.nc
                        .get(cr, cc)
                        .iter()
                        .copied()
                        .filter(|&(nr, ncol)| !self.revealed.get(nr, ncol)),
                );
            }
        }
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if row < self.config.rows && col < self.config.cols {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                row,
                col,
                rows: self.config.rows,
                cols: self.config.cols,
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn install_mines(&mut self, positions: &[(usize, usize)]) {
        let mut mines = Mines::new(self.config.rows, self.config.cols);
        for &(row, col) in positions {
            mines.set(row, col, true);
        }
        self.install_board(mines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{COVERED, FLAGGED};

    fn env(rows: usize, cols: usize, mines: &[(usize, usize)]) -> Environment {
        let config = EnvConfig {
            rows,
            cols,
            bombs: mines.len(),
            cascade: false,
        };
        let mut env = Environment::with_seed(config, 9).unwrap();
        env.install_mines(mines);
        env
    }

    #[test]
    fn test_reset_returns_fully_covered() {
        let mut env = Environment::with_seed(EnvConfig::default(), 1).unwrap();
        assert_eq!(env.status(), EpisodeStatus::Fresh);
        let obs = env.reset().unwrap();
        assert_eq!(obs, Grid::covered(9, 9));
        assert_eq!(env.status(), EpisodeStatus::InProgress);
        assert_eq!(env.mines.count(), 10);
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = Environment::with_seed(EnvConfig::default(), 1).unwrap();
        assert!(matches!(env.step(0, 0), Err(Error::EpisodeNotStarted)));
    }

    #[test]
    fn test_redundant_step_is_penalized() {
        let mut env = env(3, 3, &[(2, 2)]);
        let first = env.step(0, 0).unwrap();
        assert_eq!(first.reward, REVEAL_REWARD);
        assert!(!first.terminal);

        let again = env.step(0, 0).unwrap();
        assert_eq!(again.reward, -0.1);
        assert!(!again.terminal);
        assert_eq!(again.outcome, StepOutcome::Redundant);
        assert_eq!(again.observation, first.observation);
        assert_eq!(env.status(), EpisodeStatus::InProgress);
    }

    #[test]
    fn test_mine_terminates() {
        let mut env = env(3, 3, &[(1, 1)]);
        let step = env.step(1, 1).unwrap();
        assert_eq!(step.reward, -10.0);
        assert!(step.terminal);
        assert_eq!(step.outcome, StepOutcome::Mine);
        assert_eq!(step.observation.get(1, 1), FLAGGED);
        assert!(matches!(env.step(0, 0), Err(Error::EpisodeFinished)));
    }

    #[test]
    fn test_last_safe_cell_gets_bonus() {
        let mut env = env(2, 2, &[(0, 0)]);
        assert_eq!(env.step(0, 1).unwrap().reward, 1.0);
        assert_eq!(env.step(1, 0).unwrap().reward, 1.0);
        let last = env.step(1, 1).unwrap();
        assert_eq!(last.reward, 51.0);
        assert!(last.terminal);
        assert_eq!(last.outcome, StepOutcome::Cleared);
        assert_eq!(env.status(), EpisodeStatus::Terminated);
    }

    #[test]
    fn test_observation_masks_hidden_cells() {
        let mut env = env(3, 3, &[(0, 0)]);
        let step = env.step(2, 2).unwrap();
        let obs = step.observation;
        assert_eq!(obs.get(2, 2), 0);
        assert_eq!(obs.get(0, 0), COVERED);
        assert_eq!(obs.covered_cells().count(), 8);
    }

    #[test]
    fn test_cascade_reveals_zero_region() {
        let config = EnvConfig {
            rows: 3,
            cols: 3,
            bombs: 1,
            cascade: true,
        };
        let mut env = Environment::with_seed(config, 3).unwrap();
        env.install_mines(&[(0, 0)]);
        let step = env.step(2, 2).unwrap();
        // Every safe cell is reachable from the zero at (2,2).
        assert_eq!(step.reward, 51.0);
        assert!(step.terminal);
        assert_eq!(step.observation.get(0, 0), COVERED);
        assert_eq!(step.observation.get(1, 1), 1);
    }

    #[test]
    fn test_out_of_bounds_step() {
        let mut env = env(3, 3, &[(0, 0)]);
        assert!(matches!(env.step(3, 0), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_safe_start_reveals_zero() {
        let config = EnvConfig {
            rows: 9,
            cols: 9,
            bombs: 10,
            cascade: true,
        };
        let mut env = Environment::with_seed(config, 11).unwrap();
        let step = env.reset_with_safe_start(4, 4).unwrap();
        assert_eq!(step.observation.get(4, 4), 0);
        assert!(step.reward >= REVEAL_REWARD);
        assert!(step.observation.covered_cells().count() <= 81 - 9);
    }

    #[test]
    fn test_invalid_config() {
        let config = EnvConfig {
            rows: 2,
            cols: 2,
            bombs: 4,
            cascade: false,
        };
        assert!(matches!(Environment::new(config), Err(Error::InvalidConfig(_))));
        let empty = EnvConfig {
            rows: 0,
            ..EnvConfig::default()
        };
        assert!(matches!(empty.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_seeded_boards_repeat() {
        let mut a = Environment::with_seed(EnvConfig::default(), 5).unwrap();
        let mut b = Environment::with_seed(EnvConfig::default(), 5).unwrap();
        a.reset().unwrap();
        b.reset().unwrap();
        assert_eq!(a.mines.cells, b.mines.cells);
    }
}
