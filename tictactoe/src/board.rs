use crate::error::{Error, Result};
use itertools::Itertools;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Deref, DerefMut},
};

pub const CELLS: usize = 9;
pub const EMPTY: char = '-';

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Marker {
    X,
    O,
}

impl Marker {
    pub fn other(self) -> Self {
        match self {
            Self::X => Marker::O,
            Self::O => Marker::X,
        }
    }
    pub fn as_char(self) -> char {
        match self {
            Self::X => 'X',
            Self::O => 'O',
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Outcome {
    Ongoing,
    XWins,
    OWins,
    Draw,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Ongoing
    }
    pub fn winner(self) -> Option<Marker> {
        match self {
            Outcome::XWins => Some(Marker::X),
            Outcome::OWins => Some(Marker::O),
            _ => None,
        }
    }
    fn won_by(marker: Marker) -> Self {
        match marker {
            Marker::X => Outcome::XWins,
            Marker::O => Outcome::OWins,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Ongoing => write!(f, "game in progress"),
            Outcome::XWins => write!(f, "X wins"),
            Outcome::OWins => write!(f, "O wins"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// A 0-based cell index, `row * 3 + column`.
///
/// Players talk in 1-based numbers (1-9); convert with [`Position::from_one_based`]
/// and [`Position::one_based`] at that boundary only.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Position(usize);

impl Position {
    pub fn new(index: usize) -> Result<Self> {
        if index < CELLS {
            Ok(Position(index))
        } else {
            Err(Error::InvalidPosition { position: index })
        }
    }
    pub fn from_one_based(number: usize) -> Result<Self> {
        number
            .checked_sub(1)
            .filter(|index| *index < CELLS)
            .map(Position)
            .ok_or(Error::InvalidPosition { position: number })
    }
    pub fn all() -> impl Iterator<Item = Position> {
        (0..CELLS).map(Position)
    }
    pub fn index(self) -> usize {
        self.0
    }
    pub fn one_based(self) -> usize {
        self.0 + 1
    }
    fn coords(self) -> [usize; 2] {
        [self.0 / 3, self.0 % 3]
    }
    /// Positional value of the cell: centre 4, corners 3, edges 2.
    pub fn weight(self) -> i32 {
        match self.0 {
            4 => 4,
            0 | 2 | 6 | 8 => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.one_based())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: Array2<Option<Marker>>,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Board {
            cells: Array::from_elem((3, 3), None),
        }
    }

    /// Rebuilds a board from a string produced by [`Board::state_key`].
    pub fn from_state_key(key: &str) -> Result<Self> {
        let invalid = || Error::InvalidStateKey {
            key: key.to_owned(),
        };
        let cells = key
            .chars()
            .map(|c| match c {
                'X' => Ok(Some(Marker::X)),
                'O' => Ok(Some(Marker::O)),
                EMPTY => Ok(None),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>>>()?;
        let cells = Array::from_shape_vec((3, 3), cells).map_err(|_| invalid())?;
        Ok(Board { cells })
    }

    pub fn cell(&self, position: Position) -> Option<Marker> {
        self.cells[position.coords()]
    }

    /// Deterministic serialization of all nine cells in index order.
    pub fn state_key(&self) -> String {
        self.cells
            .iter()
            .map(|cell| cell.map_or(EMPTY, Marker::as_char))
            .collect()
    }

    pub fn is_valid_move(&self, index: usize) -> bool {
        Position::new(index).is_ok_and(|position| self.cell(position).is_none())
    }

    pub fn valid_moves(&self) -> Vec<Position> {
        Position::all()
            .filter(|position| self.cell(*position).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Marker whose turn it is, assuming X moved first.
    pub fn side_to_move(&self) -> Marker {
        let count = |m: Marker| self.cells.iter().filter(|c| **c == Some(m)).count();
        if count(Marker::X) > count(Marker::O) {
            Marker::O
        } else {
            Marker::X
        }
    }

    pub fn make_move(&mut self, position: Position, marker: Marker) -> Result<()> {
        if self.check_outcome().is_terminal() {
            return Err(Error::GameOver);
        }
        if self.cell(position).is_some() {
            return Err(Error::CellOccupied {
                position: position.one_based(),
            });
        }
        self.cells[position.coords()] = Some(marker);
        Ok(())
    }

    /// Places `marker` for the lifetime of the returned guard; the cell gets
    /// its previous content back when the guard drops.
    pub fn try_move(&mut self, position: Position, marker: Marker) -> TrialMove<'_> {
        let previous = self.cells[position.coords()].replace(marker);
        TrialMove {
            board: self,
            position,
            previous,
        }
    }

    pub fn is_winner(&self, marker: Marker) -> bool {
        self.lines().any(|line| line == [Some(marker); 3])
    }

    pub fn check_outcome(&self) -> Outcome {
        let winner = self.lines().find_map(|line| match line {
            [Some(a), Some(b), Some(c)] if a == b && b == c => Some(a),
            _ => None,
        });
        match winner {
            Some(marker) => Outcome::won_by(marker),
            None if self.is_full() => Outcome::Draw,
            None => Outcome::Ongoing,
        }
    }

    /// First empty cell (ascending) that completes a line for `marker`.
    pub fn winning_move(&self, marker: Marker) -> Option<Position> {
        self.valid_moves().into_iter().find(|position| {
            let mut probe = self.clone();
            probe.cells[position.coords()] = Some(marker);
            probe.is_winner(marker)
        })
    }

    /// Rows, columns, then both diagonals.
    fn lines(&self) -> impl Iterator<Item = [Option<Marker>; 3]> + '_ {
        let as_line = |lane: ArrayView1<Option<Marker>>| [lane[0], lane[1], lane[2]];
        let flipped = self.cells.slice(s![..;-1, ..]);
        self.cells
            .rows()
            .into_iter()
            .chain(self.cells.columns())
            .map(as_line)
            .chain([as_line(self.cells.diag()), as_line(flipped.diag())])
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let labels = Position::all().map(|position| match self.cell(position) {
            Some(marker) => marker.as_char(),
            None => char::from_digit(position.one_based() as u32, 10).unwrap_or(EMPTY),
        });
        let rows = labels
            .tuples::<(_, _, _)>()
            .map(|(a, b, c)| format!(" {} | {} | {}", a, b, c))
            .join("\n---+---+---\n");
        write!(f, "{}", rows)
    }
}

/// A marker placed on the board for look-ahead. Derefs to the board; the
/// placement is undone on drop.
pub struct TrialMove<'a> {
    board: &'a mut Board,
    position: Position,
    previous: Option<Marker>,
}

impl Deref for TrialMove<'_> {
    type Target = Board;
    fn deref(&self) -> &Board {
        &*self.board
    }
}

impl DerefMut for TrialMove<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        &mut *self.board
    }
}

impl Drop for TrialMove<'_> {
    fn drop(&mut self) {
        self.board.cells[self.position.coords()] = self.previous;
    }
}
