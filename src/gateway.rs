//! Boundary types shared by the CLI and the WASM exports.
//!
//! Incoming grids may mix integer and string cell codes; they are normalized
//! once here into a strict [`Grid`] before any engine call.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Grid, Move, COVERED, FLAGGED};

/// One raw cell as sent by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellInput {
    Code(i64),
    Text(String),
}

impl CellInput {
    /// Map a raw cell to its code.
    ///
    /// Empty strings are covered tiles and `"F"` is a flag; digit strings parse
    /// as their value. The result is range-checked by [`Grid::from_rows`].
    pub fn to_code(&self) -> Result<i8> {
        let value = match self {
            CellInput::Code(v) => *v,
            CellInput::Text(s) => match s.trim() {
                "" => return Ok(COVERED),
                "F" | "f" => return Ok(FLAGGED),
                t => t
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidGrid(format!("unrecognised cell {:?}", s)))?,
            },
        };
        i8::try_from(value)
            .map_err(|_| Error::InvalidGrid(format!("cell code {} out of range", value)))
    }
}

/// Normalize raw rows into a validated grid.
pub fn normalize_grid(rows: Vec<Vec<CellInput>>) -> Result<Grid> {
    let codes = rows
        .into_iter()
        .map(|row| row.iter().map(CellInput::to_code).collect::<Result<Vec<i8>>>())
        .collect::<Result<Vec<_>>>()?;
    Grid::from_rows(codes)
}

/// Parse a JSON array of rows and normalize it.
pub fn parse_grid_json(text: &str) -> Result<Grid> {
    let rows: Vec<Vec<CellInput>> = serde_json::from_str(text)
        .map_err(|e| Error::InvalidGrid(format!("not a JSON array of rows: {}", e)))?;
    normalize_grid(rows)
}

/// `{"move": [row, col], "flag": bool}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    #[serde(rename = "move")]
    pub position: [usize; 2],
    pub flag: bool,
}

impl From<Move> for MoveResponse {
    fn from(m: Move) -> Self {
        Self {
            position: [m.row, m.col],
            flag: m.flag,
        }
    }
}

/// `{"message": "..."}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
