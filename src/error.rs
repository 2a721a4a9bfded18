//! Error type shared by every engine operation.

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("no covered cells left to choose from")]
    NoCandidateMoves,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} board")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("episode has not been started, call reset first")]
    EpisodeNotStarted,
    #[error("episode already finished, call reset to start a new one")]
    EpisodeFinished,
    #[error("persistence error: {0}")]
    Persistence(#[from] io::Error),
    #[error("malformed snapshot record on line {line}: {source}")]
    MalformedSnapshot {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
