//! The game loop: alternates two players on one board until the game ends.

use crate::agent::QAgent;
use crate::board::{Board, Marker, Outcome, Position};
use crate::error::{Error, Result};
use crate::players::{MoveChoice, Player};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Failed attempts allowed for a single turn before the game is abandoned.
    pub max_attempts: usize,
    /// Reward an observer receives for every move of a won game.
    pub win_reward: f32,
    /// Reward an observer receives for every move of a drawn game.
    pub draw_reward: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            max_attempts: 10,
            win_reward: 1.0,
            draw_reward: 0.0,
        }
    }
}

/// Receives what happens during a game. Every method defaults to doing nothing.
pub trait GameView {
    fn show_board(&mut self, _board: &Board, _to_move: Marker) {}
    fn show_error(&mut self, _player: &str, _error: &Error, _board: &Board) {}
    fn show_result(&mut self, _board: &Board, _outcome: Outcome) {}
}

pub struct Silent;

impl GameView for Silent {}

pub struct Game {
    pub board: Board,
    config: GameConfig,
    to_move: Marker,
    history: Vec<(String, Position)>,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::with_board(Board::new(), config)
    }

    /// Resumes from `board`; the side to move is inferred from the marker counts.
    pub fn with_board(board: Board, config: GameConfig) -> Self {
        let to_move = board.side_to_move();
        Game {
            board,
            config,
            to_move,
            history: Vec::new(),
        }
    }

    pub fn to_move(&self) -> Marker {
        self.to_move
    }

    /// Plays until the board is decided. `x` moves first.
    ///
    /// Invalid moves and player failures are reported to `view` and the same
    /// player is asked again. When the game ends, `observer` learns from every
    /// move of both sides in the order they were played. Each move is keyed by
    /// the state the board was in before it was made.
    pub fn play(
        &mut self,
        x: &mut dyn Player,
        o: &mut dyn Player,
        mut observer: Option<&mut QAgent>,
        view: &mut dyn GameView,
    ) -> Result<Outcome> {
        self.history.clear();
        loop {
            let outcome = self.board.check_outcome();
            if outcome.is_terminal() {
                view.show_result(&self.board, outcome);
                if let Some(agent) = observer.as_deref_mut() {
                    self.teach(agent, outcome);
                }
                info!("Game over: {}", outcome);
                return Ok(outcome);
            }

            view.show_board(&self.board, self.to_move);
            let marker = self.to_move;
            let player: &mut dyn Player = match marker {
                Marker::X => &mut *x,
                Marker::O => &mut *o,
            };
            let state = self.board.state_key();
            let position = self.take_turn(player, marker, view)?;
            debug!("{} ({}) plays {}", player.name(), marker, position);
            if observer.is_some() {
                self.history.push((state, position));
            }
            self.to_move = marker.other();
        }
    }

    fn take_turn(
        &mut self,
        player: &mut dyn Player,
        marker: Marker,
        view: &mut dyn GameView,
    ) -> Result<Position> {
        for _ in 0..self.config.max_attempts {
            let attempt = player
                .choose_move(&self.board, marker)
                .and_then(|choice| match choice {
                    MoveChoice::Move(position) => {
                        self.board.make_move(position, marker).map(|()| position)
                    }
                    MoveChoice::NoMove => Err(Error::NoValidMoves),
                });
            match attempt {
                Ok(position) => return Ok(position),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("{} made an invalid move: {}", player.name(), e);
                    view.show_error(player.name(), &e, &self.board);
                }
            }
        }
        Err(Error::TooManyAttempts {
            player: player.name().to_owned(),
            attempts: self.config.max_attempts,
        })
    }

    fn teach(&mut self, agent: &mut QAgent, outcome: Outcome) {
        let reward = match outcome {
            Outcome::Draw => self.config.draw_reward,
            _ => self.config.win_reward,
        };
        let final_state = self.board.state_key();
        for (state, action) in self.history.drain(..) {
            agent.learn(&state, action, reward, &final_state, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentParams;
    use crate::players::{HumanPlayer, RandomPlayer};
    use std::io::Cursor;

    /// Plays a fixed list of 1-based cell numbers, wrong ones included.
    struct Scripted {
        moves: Vec<usize>,
        asked: usize,
    }

    impl Scripted {
        fn new(moves: &[usize]) -> Self {
            Scripted {
                moves: moves.to_vec(),
                asked: 0,
            }
        }
    }

    impl Player for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn choose_move(&mut self, _board: &Board, _marker: Marker) -> Result<MoveChoice> {
            let number = self.moves.get(self.asked).copied().ok_or(Error::Quit)?;
            self.asked += 1;
            Position::from_one_based(number).map(MoveChoice::Move)
        }
    }

    struct Failing;

    impl Player for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn choose_move(&mut self, _board: &Board, _marker: Marker) -> Result<MoveChoice> {
            Err(Error::NoValidMoves)
        }
    }

    #[derive(Default)]
    struct Recorder {
        boards: usize,
        errors: Vec<String>,
        result: Option<Outcome>,
    }

    impl GameView for Recorder {
        fn show_board(&mut self, _board: &Board, _to_move: Marker) {
            self.boards += 1;
        }
        fn show_error(&mut self, player: &str, _error: &Error, _board: &Board) {
            self.errors.push(player.to_owned());
        }
        fn show_result(&mut self, _board: &Board, outcome: Outcome) {
            self.result = Some(outcome);
        }
    }

    #[test]
    fn x_wins_top_row() {
        let mut x = Scripted::new(&[1, 2, 3]);
        let mut o = Scripted::new(&[4, 5]);
        let mut view = Recorder::default();
        let mut game = Game::new(GameConfig::default());
        let outcome = game.play(&mut x, &mut o, None, &mut view).unwrap();
        assert_eq!(outcome, Outcome::XWins);
        assert_eq!(view.result, Some(Outcome::XWins));
        assert_eq!(game.board.state_key(), "XXXOO----");
        assert_eq!(view.boards, 5);
    }

    #[test]
    fn invalid_moves_retry_the_same_side() {
        // O tries the taken corner and an out-of-range cell before playing 4.
        let mut x = Scripted::new(&[1, 2, 3]);
        let mut o = Scripted::new(&[1, 10, 4, 5]);
        let mut view = Recorder::default();
        let mut game = Game::new(GameConfig::default());
        let outcome = game.play(&mut x, &mut o, None, &mut view).unwrap();
        assert_eq!(outcome, Outcome::XWins);
        assert_eq!(game.board.state_key(), "XXXOO----");
        assert_eq!(view.errors, vec!["scripted", "scripted"]);
    }

    #[test]
    fn unreadable_input_is_asked_again() {
        // The first line is not UTF-8; it is consumed and X is asked again.
        let garbled = Cursor::new(b"\xff\xfe\n1\n2\n3\n".to_vec());
        let mut x = HumanPlayer::new("User 1", garbled, Vec::new());
        let mut o = HumanPlayer::new("User 2", Cursor::new(b"4\n5\n".to_vec()), Vec::new());
        let mut view = Recorder::default();
        let mut game = Game::new(GameConfig::default());
        let outcome = game.play(&mut x, &mut o, None, &mut view).unwrap();
        assert_eq!(outcome, Outcome::XWins);
        assert_eq!(game.board.state_key(), "XXXOO----");
        assert_eq!(view.errors, vec!["User 1"]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut x = Failing;
        let mut o = RandomPlayer::seeded("random", 1);
        let config = GameConfig {
            max_attempts: 3,
            ..GameConfig::default()
        };
        let mut game = Game::new(config);
        let err = game.play(&mut x, &mut o, None, &mut Silent).unwrap_err();
        assert!(matches!(err, Error::TooManyAttempts { attempts: 3, .. }));
        assert!(game.board.is_empty());
    }

    #[test]
    fn quit_aborts_the_game() {
        let mut x = Scripted::new(&[1]);
        let mut o = Scripted::new(&[]);
        let mut game = Game::new(GameConfig::default());
        assert!(matches!(
            game.play(&mut x, &mut o, None, &mut Silent),
            Err(Error::Quit)
        ));
        assert_eq!(game.board.state_key(), "X--------");
    }

    #[test]
    fn observer_learns_every_move_with_outcome_reward() {
        let mut x = Scripted::new(&[1, 2, 3]);
        let mut o = Scripted::new(&[4, 5]);
        let mut observer = QAgent::new(AgentParams {
            learning_rate: 0.5,
            ..AgentParams::default()
        })
        .unwrap();
        let mut game = Game::new(GameConfig::default());
        game.play(&mut x, &mut o, Some(&mut observer), &mut Silent)
            .unwrap();

        let q = observer.q_table();
        assert_eq!(q.len(), 5);
        let pos = |n| Position::from_one_based(n).unwrap();
        assert_eq!(q.value("---------", pos(1)), 0.5);
        assert_eq!(q.value("X--------", pos(4)), 0.5);
        assert_eq!(q.value("XX-O-----", pos(5)), 0.5);
        assert_eq!(q.value("XX-OO----", pos(3)), 0.5);
    }

    #[test]
    fn draw_teaches_draw_reward() {
        // X: 1 3 4 8 9, O: 2 5 6 7 -> XOX / XOO / OXX
        let mut x = Scripted::new(&[1, 3, 4, 8, 9]);
        let mut o = Scripted::new(&[2, 5, 6, 7]);
        let mut observer = QAgent::new(AgentParams::default()).unwrap();
        let config = GameConfig {
            draw_reward: 0.2,
            ..GameConfig::default()
        };
        let mut game = Game::new(config);
        let outcome = game
            .play(&mut x, &mut o, Some(&mut observer), &mut Silent)
            .unwrap();
        assert_eq!(outcome, Outcome::Draw);
        assert_eq!(game.board.state_key(), "XOXXOOOXX");
        let first = Position::from_one_based(1).unwrap();
        assert!((observer.q_table().value("---------", first) - 0.02).abs() < 1e-6);
        assert_eq!(observer.q_table().len(), 9);
    }

    #[test]
    fn decided_board_returns_immediately() {
        let board = Board::from_state_key("XXXOO----").unwrap();
        let mut game = Game::with_board(board, GameConfig::default());
        let mut x = Failing;
        let mut o = Failing;
        assert_eq!(
            game.play(&mut x, &mut o, None, &mut Silent).unwrap(),
            Outcome::XWins
        );
    }
}
