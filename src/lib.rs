//! Minesweeper move inference.
//!
//! Three strategies recommend a move for a partially revealed grid:
//! - [`solver`]: deterministic single-cell counting rules
//! - [`probability`]: local mine-probability estimate, lowest risk wins
//! - [`agent`]: tabular Q-learning trained against the [`environment`] simulator
//!
//! Grids use codes -1 = covered, 0-8 = revealed count, 9 = flagged. Raw client
//! input goes through [`gateway::normalize_grid`] first.
//!
//! ```
//! use sweep_engine::{probability, solver, Grid, Move, NeighborCache};
//!
//! let rows = vec![vec![1, -1, -1], vec![-1, -1, -1], vec![-1, -1, -1]];
//! let grid = Grid::from_rows(rows).unwrap();
//! let nc = NeighborCache::for_grid(&grid);
//! assert_eq!(solver::solve(&grid, &nc).unwrap(), Move::NO_DEDUCTION);
//! assert_eq!(probability::safest_move(&grid, &nc).unwrap(), Move::reveal(0, 1));
//! ```

pub mod agent;
pub mod board;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod probability;
pub mod rng;
pub mod solver;
pub mod table;
pub mod types;

pub use agent::{Agent, CancelToken, TrainingConfig, TrainingHooks, TrainingSummary};
pub use environment::{EnvConfig, Environment, Step};
pub use error::{Error, Result};
pub use table::{SharedValueTable, ValueTable};
pub use types::{Grid, LocalState, Move, NeighborCache};

// ─── WASM Exports (only compiled for wasm32 target) ─────────────────────────

#[cfg(target_arch = "wasm32")]
mod wasm_exports {
    use wasm_bindgen::prelude::*;

    use crate::gateway::{normalize_grid, CellInput, MoveResponse};
    use crate::rng::GameRng;
    use crate::types::{Grid, Move, NeighborCache};
    use crate::{agent, probability, solver, ValueTable};

    fn grid_from_js(grid: JsValue) -> Result<Grid, JsError> {
        let rows: Vec<Vec<CellInput>> = serde_wasm_bindgen::from_value(grid)?;
        Ok(normalize_grid(rows)?)
    }

    fn move_to_js(m: Move) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&MoveResponse::from(m))?)
    }

    /// Deterministic move from the counting rules.
    /// Returns `{ move: [row, col], flag }`; `[0, 0]` with `flag: false` means no deduction.
    #[wasm_bindgen(js_name = "solveMove")]
    pub fn wasm_solve_move(grid: JsValue) -> Result<JsValue, JsError> {
        let grid = grid_from_js(grid)?;
        let nc = NeighborCache::for_grid(&grid);
        move_to_js(solver::solve(&grid, &nc)?)
    }

    /// Reveal the covered cell with the lowest estimated mine probability.
    #[wasm_bindgen(js_name = "estimateMove")]
    pub fn wasm_estimate_move(grid: JsValue) -> Result<JsValue, JsError> {
        let grid = grid_from_js(grid)?;
        let nc = NeighborCache::for_grid(&grid);
        move_to_js(probability::safest_move(&grid, &nc)?)
    }

    /// Row-major mine probabilities; `NaN` for cells that are not covered.
    #[wasm_bindgen(js_name = "estimateProbabilities")]
    pub fn wasm_estimate_probabilities(grid: JsValue) -> Result<js_sys::Float64Array, JsError> {
        let grid = grid_from_js(grid)?;
        let nc = NeighborCache::for_grid(&grid);
        let flat = probability::estimate(&grid, &nc).to_flat();

        let arr = js_sys::Float64Array::new_with_length(flat.len() as u32);
        arr.copy_from(&flat);
        Ok(arr)
    }

    /// Greedy move from a learned value table given as JSON Lines text.
    #[wasm_bindgen(js_name = "recommendMove")]
    pub fn wasm_recommend_move(grid: JsValue, table_jsonl: &str) -> Result<JsValue, JsError> {
        let grid = grid_from_js(grid)?;
        let table = ValueTable::read_jsonl(table_jsonl.as_bytes())?;
        let mut rng = GameRng::new();
        move_to_js(agent::recommend_with(&table, &grid, &mut rng)?)
    }

    /// Ping function to verify WASM is loaded.
    #[wasm_bindgen(js_name = "ping")]
    pub fn wasm_ping() -> String {
        "WASM engine ready".to_string()
    }
}
