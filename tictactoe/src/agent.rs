//! Tabular Q-learning agent with an epsilon-greedy policy.

use crate::board::{Board, Position, EMPTY};
use crate::error::{Error, Result};
use crate::persist::{self, SavedAgent};
use crate::q_table::QTable;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// α, in (0, 1].
    pub learning_rate: f32,
    /// γ, in [0, 1].
    pub discount_factor: f32,
    /// ε, probability of a random move, in [0, 1].
    pub epsilon: f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        AgentParams {
            learning_rate: 0.1,
            discount_factor: 0.95,
            epsilon: 0.1,
        }
    }
}

impl AgentParams {
    pub fn validate(&self) -> Result<()> {
        let check = |name, value: f32, ok: bool, expected| {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidParameter {
                    name,
                    value,
                    expected,
                })
            }
        };
        let AgentParams {
            learning_rate: alpha,
            discount_factor: gamma,
            epsilon,
        } = *self;
        check("learning_rate", alpha, alpha > 0.0 && alpha <= 1.0, "must be in (0, 1]")?;
        check("discount_factor", gamma, (0.0..=1.0).contains(&gamma), "must be in [0, 1]")?;
        check("epsilon", epsilon, (0.0..=1.0).contains(&epsilon), "must be in [0, 1]")
    }
}

#[derive(Debug, Clone)]
struct Checkpoint {
    path: PathBuf,
    every: usize,
}

#[derive(Debug, Clone)]
pub struct QAgent {
    q_table: QTable,
    params: AgentParams,
    updates: usize,
    checkpoint: Option<Checkpoint>,
    rng: StdRng,
}

/// Cells left empty in a serialized board.
fn open_cells(state: &str) -> Vec<Position> {
    state
        .chars()
        .enumerate()
        .filter(|(_, c)| *c == EMPTY)
        .filter_map(|(index, _)| Position::new(index).ok())
        .collect()
}

/// Whether `file` exists and was modified after `other`, or `other` is missing.
fn newer_than(file: &Path, other: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(file), modified(other)) {
        (Some(file), Some(other)) => file > other,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

impl QAgent {
    pub fn new(params: AgentParams) -> Result<Self> {
        Self::with_table(params, QTable::new())
    }

    pub fn with_table(params: AgentParams, q_table: QTable) -> Result<Self> {
        params.validate()?;
        Ok(QAgent {
            q_table,
            params,
            updates: 0,
            checkpoint: None,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Saves the table to `path` after every `every` updates.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, every: usize) -> Self {
        self.updates = 0;
        self.checkpoint = (every > 0).then(|| Checkpoint {
            path: path.into(),
            every,
        });
        self
    }

    /// Restores an agent saved with [`QAgent::save`]. A missing or unreadable
    /// file is not an error: the agent starts from an empty table with `params`.
    pub fn load_or_default(path: &Path, params: AgentParams) -> Result<Self> {
        params.validate()?;
        if !path.exists() {
            info!("No saved agent at {}. Starting fresh.", path.display());
            return Self::new(params);
        }
        match persist::load_agent(path) {
            Ok(saved) => {
                let restored = AgentParams {
                    learning_rate: saved.learning_rate,
                    discount_factor: saved.discount_factor,
                    epsilon: saved.epsilon,
                };
                let params = match restored.validate() {
                    Ok(()) => restored,
                    Err(e) => {
                        warn!("Ignoring saved parameters in {}: {}", path.display(), e);
                        params
                    }
                };
                info!(
                    "Agent loaded from {} with {} learned state-action pairs",
                    path.display(),
                    saved.q_table.len()
                );
                Self::with_table(params, saved.q_table)
            }
            Err(e) => {
                warn!("Error loading agent from {}: {}. Starting fresh.", path.display(), e);
                Self::new(params)
            }
        }
    }

    /// Like [`QAgent::load_or_default`], then keeps checkpointing the table to
    /// `checkpoint` every `every` updates. A checkpoint written after the full
    /// save at `path` holds the newer table and replaces the saved one.
    pub fn restore(
        path: &Path,
        checkpoint: &Path,
        every: usize,
        params: AgentParams,
    ) -> Result<Self> {
        let agent = Self::load_or_default(path, params)?;
        let agent = if !newer_than(checkpoint, path) {
            agent
        } else if !path.exists() {
            Self::with_table(agent.params, persist::load_table_or_empty(checkpoint))?
        } else {
            match persist::load_table(checkpoint) {
                Ok(table) => {
                    info!(
                        "Checkpoint {} is newer than {}; using its {} state-action pairs",
                        checkpoint.display(),
                        path.display(),
                        table.len()
                    );
                    Self::with_table(agent.params, table)?
                }
                Err(e) => {
                    warn!(
                        "Error loading checkpoint {}: {}. Keeping the saved table.",
                        checkpoint.display(),
                        e
                    );
                    agent
                }
            }
        };
        Ok(agent.with_checkpoint(checkpoint, every))
    }

    pub fn params(&self) -> AgentParams {
        self.params
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn into_table(self) -> QTable {
        self.q_table
    }

    /// Epsilon-greedy move for the side to play on `board`.
    pub fn choose_action(&mut self, board: &Board) -> Option<Position> {
        let moves = board.valid_moves();
        if moves.is_empty() {
            return None;
        }
        if self.rng.gen::<f32>() < self.params.epsilon {
            return moves.choose(&mut self.rng).copied();
        }
        self.best_action(&board.state_key(), &moves)
    }

    /// Highest-valued action among `moves`; ties are broken uniformly at random.
    pub fn best_action(&mut self, state: &str, moves: &[Position]) -> Option<Position> {
        self.q_table
            .best_actions(state, moves)
            .choose(&mut self.rng)
            .copied()
    }

    /// One-step Q-learning update of `(state, action)`.
    ///
    /// For non-terminal transitions the continuation is the best value over
    /// the cells still empty in `next_state`.
    pub fn learn(&mut self, state: &str, action: Position, reward: f32, next_state: &str, done: bool) {
        let current = self.q_table.value(state, action);
        let target = if done {
            reward
        } else {
            let next_max = self.q_table.max_value(next_state, &open_cells(next_state));
            reward + self.params.discount_factor * next_max
        };
        let updated = current + self.params.learning_rate * (target - current);
        self.q_table.set(state, action, updated);

        self.updates += 1;
        if let Some(checkpoint) = &self.checkpoint {
            if self.updates >= checkpoint.every {
                self.updates = 0;
                if let Err(e) = persist::save_table(&checkpoint.path, &self.q_table) {
                    warn!("Error saving Q-table checkpoint: {}", e);
                }
            }
        }
    }

    /// Saves the table together with the hyperparameters.
    pub fn save(&self, path: &Path) -> Result<()> {
        let saved = SavedAgent {
            q_table: self.q_table.clone(),
            learning_rate: self.params.learning_rate,
            discount_factor: self.params.discount_factor,
            epsilon: self.params.epsilon,
        };
        persist::save_agent(path, &saved)
    }

    pub fn save_table(&self, path: &Path) -> Result<()> {
        persist::save_table(path, &self.q_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Marker;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn pos(index: usize) -> Position {
        Position::new(index).unwrap()
    }

    fn greedy() -> QAgent {
        QAgent::new(AgentParams {
            epsilon: 0.0,
            ..AgentParams::default()
        })
        .unwrap()
        .with_seed(7)
    }

    #[test]
    fn rejects_out_of_range_params() {
        for params in [
            AgentParams { learning_rate: 0.0, ..Default::default() },
            AgentParams { learning_rate: 1.5, ..Default::default() },
            AgentParams { discount_factor: -0.1, ..Default::default() },
            AgentParams { epsilon: 1.1, ..Default::default() },
        ] {
            assert!(matches!(QAgent::new(params), Err(Error::InvalidParameter { .. })));
        }
        assert!(QAgent::new(AgentParams { learning_rate: 1.0, discount_factor: 0.0, epsilon: 1.0 }).is_ok());
    }

    #[test]
    fn terminal_update_moves_towards_reward() {
        let mut agent = greedy();
        agent.learn("---------", pos(4), 1.0, "----X----", true);
        assert!((agent.q_table().value("---------", pos(4)) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn non_terminal_update_uses_best_open_cell() {
        let mut agent = greedy();
        let next = "X---O----";
        agent.q_table.set(next, pos(8), 0.5);
        // Occupied cell: ignored even though its value is higher.
        agent.q_table.set(next, pos(0), 9.0);
        agent.learn("X--------", pos(4), 0.0, next, false);
        let expected = 0.1 * (0.95 * 0.5);
        assert!((agent.q_table().value("X--------", pos(4)) - expected).abs() < 1e-6);
    }

    #[test]
    fn full_next_state_has_no_continuation() {
        let mut agent = greedy();
        agent.learn("XOXXOOOX-", pos(8), 0.5, "XOXXOOOXX", false);
        assert!((agent.q_table().value("XOXXOOOX-", pos(8)) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn greedy_choice_takes_highest_value() {
        let mut agent = greedy();
        let board = Board::from_state_key("X---O----").unwrap();
        agent.q_table.set("X---O----", pos(8), 0.3);
        agent.q_table.set("X---O----", pos(2), -0.3);
        for _ in 0..20 {
            assert_eq!(agent.choose_action(&board), Some(pos(8)));
        }
    }

    #[test]
    fn full_exploration_stays_on_valid_moves() {
        let mut agent = QAgent::new(AgentParams { epsilon: 1.0, ..Default::default() })
            .unwrap()
            .with_seed(3);
        let mut board = Board::new();
        board.make_move(pos(0), Marker::X).unwrap();
        board.make_move(pos(4), Marker::O).unwrap();
        for _ in 0..100 {
            let chosen = agent.choose_action(&board).unwrap();
            assert!(board.is_valid_move(chosen.index()));
        }
        let full = Board::from_state_key("XOXXOOOXX").unwrap();
        assert_eq!(agent.choose_action(&full), None);
    }

    #[test]
    fn checkpoint_saves_after_every_n_updates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latest.pkl");
        let mut agent = greedy().with_checkpoint(&path, 3);
        agent.learn("---------", pos(0), 1.0, "X--------", true);
        agent.learn("---------", pos(1), 1.0, "-X-------", true);
        assert!(!path.exists());
        agent.learn("---------", pos(2), 1.0, "--X------", true);
        assert_eq!(persist::load_table(&path).unwrap(), *agent.q_table());
    }

    #[test]
    fn save_and_load_restore_params_and_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.pkl");
        let params = AgentParams { learning_rate: 0.3, discount_factor: 0.8, epsilon: 0.05 };
        let mut agent = QAgent::new(params).unwrap();
        agent.learn("---------", pos(4), 1.0, "----X----", true);
        agent.save(&path).unwrap();

        let loaded = QAgent::load_or_default(&path, AgentParams::default()).unwrap();
        assert_eq!(loaded.params(), params);
        assert_eq!(loaded.q_table(), agent.q_table());
    }

    fn age(path: &Path, seconds: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
            .unwrap();
    }

    #[test]
    fn restore_prefers_a_newer_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rl_observer.pkl");
        let checkpoint = dir.path().join("q_table.pkl");

        let mut saved = QAgent::new(AgentParams::default()).unwrap();
        saved.learn("---------", pos(4), 1.0, "----X----", true);
        saved.save(&path).unwrap();
        age(&path, 3600);

        // Updates made after the full save, written only by a checkpoint.
        let mut later = saved.clone().with_checkpoint(&checkpoint, 2);
        later.learn("---------", pos(0), 1.0, "X--------", true);
        later.learn("X--------", pos(8), -1.0, "X-------O", true);
        assert!(checkpoint.exists());

        let restored = QAgent::restore(&path, &checkpoint, 2, AgentParams::default()).unwrap();
        assert_eq!(restored.q_table(), later.q_table());
        assert_eq!(restored.params(), saved.params());
    }

    #[test]
    fn restore_keeps_the_full_save_over_an_older_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rl_observer.pkl");
        let checkpoint = dir.path().join("q_table.pkl");

        persist::save_table(&checkpoint, &QTable::new()).unwrap();
        age(&checkpoint, 3600);
        let mut saved = QAgent::new(AgentParams::default()).unwrap();
        saved.learn("---------", pos(4), 1.0, "----X----", true);
        saved.save(&path).unwrap();

        let restored = QAgent::restore(&path, &checkpoint, 5000, AgentParams::default()).unwrap();
        assert_eq!(restored.q_table(), saved.q_table());
    }

    #[test]
    fn restore_from_checkpoint_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rl_observer.pkl");
        let checkpoint = dir.path().join("q_table.pkl");
        let mut agent = greedy().with_checkpoint(&checkpoint, 1);
        agent.learn("---------", pos(2), 1.0, "--X------", true);

        let restored = QAgent::restore(&path, &checkpoint, 1, AgentParams::default()).unwrap();
        assert_eq!(restored.q_table(), agent.q_table());
        assert_eq!(restored.params(), AgentParams::default());
    }

    #[test]
    fn corrupt_agent_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.pkl");
        std::fs::write(&path, b"garbage").unwrap();
        let agent = QAgent::load_or_default(&path, AgentParams::default()).unwrap();
        assert!(agent.q_table().is_empty());
        assert_eq!(agent.params(), AgentParams::default());
    }
}
