#![allow(dead_code)]

use std::collections::HashSet;
use tictactoe::{Board, Marker, Position};

pub fn board(key: &str) -> Board {
    Board::from_state_key(key).expect("valid state key")
}

pub fn pos(index: usize) -> Position {
    Position::new(index).expect("index in range")
}

/// Every board reachable from the empty board with X moving first, terminal
/// ones included.
pub fn reachable_boards() -> Vec<Board> {
    fn walk(board: &mut Board, to_move: Marker, seen: &mut HashSet<String>, out: &mut Vec<Board>) {
        if !seen.insert(board.state_key()) {
            return;
        }
        out.push(board.clone());
        if board.check_outcome().is_terminal() {
            return;
        }
        for position in board.valid_moves() {
            let mut trial = board.try_move(position, to_move);
            walk(&mut trial, to_move.other(), seen, out);
        }
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    walk(&mut Board::new(), Marker::X, &mut seen, &mut out);
    out
}

/// Cells that complete a line for `marker`.
pub fn winning_cells(board: &Board, marker: Marker) -> Vec<Position> {
    board
        .valid_moves()
        .into_iter()
        .filter(|position| {
            let mut probe = board.clone();
            probe.make_move(*position, marker).is_ok() && probe.is_winner(marker)
        })
        .collect()
}
