//! Minimax search with alpha-beta pruning.
//!
//! Scores are from the maximizing marker's point of view. A completed line is
//! worth `100 + remaining depth`, so a quicker win outranks a slower one and a
//! slower loss outranks a quicker one. Nodes where the depth runs out are
//! scored by [`evaluate`].

use crate::board::{Board, Marker, Outcome, Position};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

pub const WIN_SCORE: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum plies searched from the root.
    pub depth: u32,
    /// Take an immediate win, or block the opponent's, without searching.
    pub shortcuts: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: 6,
            shortcuts: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: usize,
    pub cutoffs: usize,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    config: SearchConfig,
    stats: SearchStats,
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new(SearchConfig::default())
    }
}

/// Positional score: cell weights of `maximizer` minus those of its opponent.
pub fn evaluate(board: &Board, maximizer: Marker) -> i32 {
    Position::all()
        .map(|position| match board.cell(position) {
            Some(marker) if marker == maximizer => position.weight(),
            Some(_) => -position.weight(),
            None => 0,
        })
        .sum()
}

fn terminal_score(winner: Marker, maximizer: Marker, remaining: i32) -> i32 {
    if winner == maximizer {
        WIN_SCORE + remaining
    } else {
        -(WIN_SCORE + remaining)
    }
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        SearchEngine {
            config,
            stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters from the most recent [`SearchEngine::best_move`] call.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Best move for `maximizer`, or `None` when the board is already decided
    /// or has no empty cell.
    pub fn best_move(&mut self, board: &Board, maximizer: Marker) -> Option<Position> {
        self.search(board, maximizer).map(|(_, position)| position)
    }

    /// Like [`SearchEngine::best_move`] but also returns the minimax score.
    pub fn search(&mut self, board: &Board, maximizer: Marker) -> Option<(i32, Position)> {
        self.stats = SearchStats::default();
        if board.check_outcome().is_terminal() {
            return None;
        }
        let empty = board.valid_moves().len() as u32;
        let depth = self.config.depth.min(empty);
        let mut scratch = board.clone();
        let (score, best) = self.minimax(
            &mut scratch,
            depth,
            i32::MIN,
            i32::MAX,
            true,
            maximizer,
        );
        debug_assert_eq!(&scratch, board, "search left the board modified");
        debug!(
            "search for {} at depth {}: score {} move {:?} ({} nodes, {} cutoffs)",
            maximizer,
            depth,
            score,
            best.map(Position::one_based),
            self.stats.nodes,
            self.stats.cutoffs
        );
        best.map(|position| (score, position))
    }

    fn minimax(
        &mut self,
        board: &mut Board,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        maximizer: Marker,
    ) -> (i32, Option<Position>) {
        self.stats.nodes += 1;
        let remaining = depth as i32;
        match board.check_outcome() {
            Outcome::Ongoing => {}
            Outcome::Draw => return (0, None),
            outcome => {
                if let Some(winner) = outcome.winner() {
                    return (terminal_score(winner, maximizer, remaining), None);
                }
            }
        }
        if depth == 0 {
            return (evaluate(board, maximizer), None);
        }

        let mover = if maximizing {
            maximizer
        } else {
            maximizer.other()
        };
        let mut candidates = board.valid_moves();
        if self.config.shortcuts {
            if let Some(win) = board.winning_move(mover) {
                return (terminal_score(mover, maximizer, remaining - 1), Some(win));
            }
            if let Some(block) = board.winning_move(mover.other()) {
                candidates = vec![block];
            }
        }
        if maximizing {
            candidates.sort_by_key(|position| Reverse(position.weight()));
        } else {
            candidates.sort_by_key(|position| position.weight());
        }

        let mut best: Option<(i32, Position)> = None;
        for position in candidates {
            let (score, _) = {
                let mut trial = board.try_move(position, mover);
                self.minimax(&mut trial, depth - 1, alpha, beta, !maximizing, maximizer)
            };
            let improves = match best {
                None => true,
                Some((best_score, _)) if maximizing => score > best_score,
                Some((best_score, _)) => score < best_score,
            };
            if improves {
                best = Some((score, position));
            }
            let best_score = best.map_or(score, |(s, _)| s);
            if maximizing {
                alpha = alpha.max(best_score);
            } else {
                beta = beta.min(best_score);
            }
            if beta <= alpha {
                self.stats.cutoffs += 1;
                break;
            }
        }
        match best {
            Some((score, position)) => (score, Some(position)),
            None => (0, None),
        }
    }
}
