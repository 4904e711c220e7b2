use crate::agent::QAgent;
use crate::board::{Board, Marker, Position};
use crate::error::{Error, Result};
use crate::search::SearchEngine;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};

/// What a player answers when asked for a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveChoice {
    Move(Position),
    /// The player sees nothing to play.
    NoMove,
}

impl From<Option<Position>> for MoveChoice {
    fn from(position: Option<Position>) -> Self {
        position.map_or(MoveChoice::NoMove, MoveChoice::Move)
    }
}

/// A source of moves. An `Err` means the player failed to decide; the game
/// loop reports it and asks again unless the error is fatal.
pub trait Player {
    fn name(&self) -> &str;
    fn choose_move(&mut self, board: &Board, marker: Marker) -> Result<MoveChoice>;
}

/// Where a [`HumanPlayer`] reads its lines from.
///
/// Stdin takes its lock per line, so several players and the menu can share
/// the terminal.
pub trait LineSource {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl LineSource for io::Stdin {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        io::Stdin::read_line(self, buf)
    }
}

impl<T: AsRef<[u8]>> LineSource for Cursor<T> {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

impl<R: Read> LineSource for BufReader<R> {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

/// Reads 1-based cell numbers, one per line.
pub struct HumanPlayer<R, W> {
    name: String,
    input: R,
    output: W,
}

impl<R: LineSource, W: Write> HumanPlayer<R, W> {
    pub fn new(name: impl Into<String>, input: R, output: W) -> Self {
        HumanPlayer {
            name: name.into(),
            input,
            output,
        }
    }
}

impl HumanPlayer<io::Stdin, io::Stdout> {
    pub fn stdio(name: impl Into<String>) -> Self {
        HumanPlayer::new(name, io::stdin(), io::stdout())
    }
}

impl<R: LineSource, W: Write> Player for HumanPlayer<R, W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, board: &Board, marker: Marker) -> Result<MoveChoice> {
        let valid: Vec<usize> = board.valid_moves().iter().map(|p| p.one_based()).collect();
        if valid.is_empty() {
            return Ok(MoveChoice::NoMove);
        }
        write!(
            self.output,
            "{} ({}), enter your move {:?} (or 'q' to quit): ",
            self.name, marker, valid
        )
        .and_then(|()| self.output.flush())
        .map_err(Error::Input)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(Error::Input)? == 0 {
            return Err(Error::Quit);
        }
        let text = line.trim();
        if text.eq_ignore_ascii_case("q") || text.eq_ignore_ascii_case("z") {
            return Err(Error::Quit);
        }
        let number: usize = text.parse().map_err(|_| Error::InvalidInput {
            input: text.to_owned(),
            reason: "please enter a number".to_owned(),
        })?;
        Ok(MoveChoice::Move(Position::from_one_based(number)?))
    }
}

#[derive(Debug, Clone)]
pub struct SearchPlayer {
    name: String,
    engine: SearchEngine,
}

impl SearchPlayer {
    pub fn new(name: impl Into<String>, engine: SearchEngine) -> Self {
        SearchPlayer {
            name: name.into(),
            engine,
        }
    }
}

impl Player for SearchPlayer {
    fn name(&self) -> &str {
        &self.name
    }
    fn choose_move(&mut self, board: &Board, marker: Marker) -> Result<MoveChoice> {
        Ok(self.engine.best_move(board, marker).into())
    }
}

/// Plays with a borrowed agent, so the caller keeps ownership of what it
/// learns.
#[derive(Debug)]
pub struct AgentPlayer<'a> {
    name: String,
    agent: &'a mut QAgent,
}

impl<'a> AgentPlayer<'a> {
    pub fn new(name: impl Into<String>, agent: &'a mut QAgent) -> Self {
        AgentPlayer {
            name: name.into(),
            agent,
        }
    }
}

impl Player for AgentPlayer<'_> {
    fn name(&self) -> &str {
        &self.name
    }
    fn choose_move(&mut self, board: &Board, _marker: Marker) -> Result<MoveChoice> {
        Ok(self.agent.choose_action(board).into())
    }
}

#[derive(Debug, Clone)]
pub struct RandomPlayer {
    name: String,
    rng: StdRng,
}

impl RandomPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        RandomPlayer {
            name: name.into(),
            rng: StdRng::from_entropy(),
        }
    }
    pub fn seeded(name: impl Into<String>, seed: u64) -> Self {
        RandomPlayer {
            name: name.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Player for RandomPlayer {
    fn name(&self) -> &str {
        &self.name
    }
    fn choose_move(&mut self, board: &Board, _marker: Marker) -> Result<MoveChoice> {
        Ok(board.valid_moves().choose(&mut self.rng).copied().into())
    }
}
