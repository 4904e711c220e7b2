use crate::board::Position;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;

/// Action values recorded for one state, keyed by 0-based cell index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Moves {
    pub moves: HashMap<usize, f32>,
}

impl Deref for Moves {
    type Target = HashMap<usize, f32>;
    fn deref(&self) -> &Self::Target {
        &self.moves
    }
}

/// Sparse state-action value table.
///
/// Lookups never insert: a pair that was never written reads as
/// [`QTable::DEFAULT_VALUE`]. Entries are only created by [`QTable::set`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    qtable: HashMap<String, Moves>,
}

impl QTable {
    pub const DEFAULT_VALUE: f32 = 0.0;

    pub fn new() -> Self {
        QTable {
            qtable: HashMap::with_capacity(11000),
        }
    }

    /// Number of stored state-action pairs.
    pub fn len(&self) -> usize {
        self.qtable.values().map(|moves| moves.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.qtable.is_empty()
    }

    pub fn states(&self) -> usize {
        self.qtable.len()
    }

    pub fn get(&self, state: &str, action: Position) -> Option<f32> {
        self.qtable
            .get(state)
            .and_then(|moves| moves.get(&action.index()))
            .copied()
    }

    pub fn value(&self, state: &str, action: Position) -> f32 {
        self.get(state, action).unwrap_or(Self::DEFAULT_VALUE)
    }

    pub fn set(&mut self, state: &str, action: Position, value: f32) {
        self.qtable
            .entry(state.to_owned())
            .or_default()
            .moves
            .insert(action.index(), value);
    }

    /// Highest value among `actions`, or the default when `actions` is empty.
    pub fn max_value(&self, state: &str, actions: &[Position]) -> f32 {
        actions
            .iter()
            .map(|action| self.value(state, *action))
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or(Self::DEFAULT_VALUE)
    }

    /// Every action in `actions` that shares the highest value, in input order.
    pub fn best_actions(&self, state: &str, actions: &[Position]) -> Vec<Position> {
        actions
            .iter()
            .map(|action| (*action, self.value(state, *action)))
            .max_set_by(|(_, value1), (_, value2)| value1.total_cmp(value2))
            .into_iter()
            .map(|(action, _)| action)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, f32)> {
        self.qtable.iter().flat_map(|(state, moves)| {
            moves
                .iter()
                .map(move |(action, value)| (state.as_str(), *action, *value))
        })
    }
}
