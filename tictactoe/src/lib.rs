//! Tic-Tac-Toe with a minimax search engine and a Q-learning agent.
//!
//! [`game::Game`] alternates any two [`players::Player`]s on a
//! [`board::Board`]. A [`agent::QAgent`] can play, or watch a game it is not
//! part of and learn from every move once the game is decided.

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod persist;
pub mod players;
pub mod q_table;
pub mod search;
pub mod tournament;
pub mod training;

pub use agent::{AgentParams, QAgent};
pub use board::{Board, Marker, Outcome, Position};
pub use config::Config;
pub use error::{Error, Result};
pub use game::{Game, GameConfig, GameView, Silent};
pub use players::{
    AgentPlayer, HumanPlayer, LineSource, MoveChoice, Player, RandomPlayer, SearchPlayer,
};
pub use q_table::QTable;
pub use search::{SearchConfig, SearchEngine};
