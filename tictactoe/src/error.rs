use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("position {position} is out of bounds")]
    InvalidPosition { position: usize },

    #[error("cell {position} is already taken")]
    CellOccupied { position: usize },

    #[error("the game is already over")]
    GameOver,

    #[error("invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("player quit the game")]
    Quit,

    #[error("failed to read player input: {0}")]
    Input(#[source] std::io::Error),

    #[error("no valid moves available")]
    NoValidMoves,

    #[error("{player} failed to produce a valid move after {attempts} attempts")]
    TooManyAttempts { player: String, attempts: usize },

    #[error("invalid parameter {name} = {value}: {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },

    #[error("invalid state key '{key}'")]
    InvalidStateKey { key: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Errors after which a game cannot continue; everything else is retried.
    /// A failed read of player input is retried like a bad answer, bounded
    /// by the orchestrator's attempt limit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Quit | Error::TooManyAttempts { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
