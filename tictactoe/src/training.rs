//! Self-play training: the agent plays both sides and learns after every move.

use crate::agent::QAgent;
use crate::board::{Board, Marker, Outcome, Position};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reward shaping used during self-play.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
    /// Reward for a move that does not end the game.
    pub step: f32,
}

impl Default for Rewards {
    fn default() -> Self {
        Rewards {
            win: 1.0,
            loss: -1.0,
            draw: 0.2,
            step: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Episodes between checkpoints of the table.
    pub save_interval: usize,
    /// Exploration rate of the agent being trained.
    pub epsilon: f32,
    pub rewards: Rewards,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            episodes: 1000,
            save_interval: 500,
            epsilon: 0.2,
            rewards: Rewards::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub x_wins: usize,
    pub o_wins: usize,
    pub draws: usize,
    /// State-action pairs known when training finished.
    pub table_size: usize,
}

impl TrainingSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::XWins => self.x_wins += 1,
            Outcome::OWins => self.o_wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Ongoing => {}
        }
    }
}

/// Plays `config.episodes` games of `agent` against itself.
///
/// Each move is learned once the opponent has replied, towards the position
/// the reply was made from. A winning move earns `win` and the loser's last
/// move `loss`; the last move of a drawn game earns `draw`. The table is
/// written to `checkpoint` every `save_interval` episodes when given.
pub fn train(agent: &mut QAgent, config: &TrainingConfig, checkpoint: Option<&Path>) -> TrainingSummary {
    info!("Starting training for {} episodes...", config.episodes);
    let mut summary = TrainingSummary::default();
    for episode in 1..=config.episodes {
        let outcome = play_episode(agent, &config.rewards);
        summary.record(outcome);
        summary.episodes = episode;

        if config.save_interval > 0 && episode % config.save_interval == 0 {
            info!(
                "Completed {}/{} training episodes ({} X wins, {} O wins, {} draws)",
                episode, config.episodes, summary.x_wins, summary.o_wins, summary.draws
            );
            if let Some(path) = checkpoint {
                if let Err(e) = agent.save_table(path) {
                    warn!("Error saving training checkpoint: {}", e);
                }
            }
        }
    }
    summary.table_size = agent.q_table().len();
    info!(
        "Training completed. Agent trained on {} games, {} state-action pairs known.",
        summary.episodes, summary.table_size
    );
    summary
}

fn play_episode(agent: &mut QAgent, rewards: &Rewards) -> Outcome {
    let mut board = Board::new();
    let mut marker = Marker::X;
    let mut previous: Option<(String, Position)> = None;
    loop {
        let state = board.state_key();
        let Some(action) = agent.choose_action(&board) else {
            return board.check_outcome();
        };
        if let Some((prev_state, prev_action)) = &previous {
            agent.learn(prev_state, *prev_action, rewards.step, &state, false);
        }
        if let Err(e) = board.make_move(action, marker) {
            warn!("Agent chose an invalid move during training: {}", e);
            return board.check_outcome();
        }

        let outcome = board.check_outcome();
        let next = board.state_key();
        match outcome {
            Outcome::Ongoing => {
                previous = Some((state, action));
                marker = marker.other();
            }
            Outcome::Draw => {
                agent.learn(&state, action, rewards.draw, &next, true);
                return outcome;
            }
            Outcome::XWins | Outcome::OWins => {
                agent.learn(&state, action, rewards.win, &next, true);
                if let Some((prev_state, prev_action)) = previous {
                    agent.learn(&prev_state, prev_action, rewards.loss, &next, true);
                }
                return outcome;
            }
        }
    }
}
