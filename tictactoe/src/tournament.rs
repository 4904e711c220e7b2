//! A series of games between the Q-learning agent and the search engine.

use crate::agent::QAgent;
use crate::board::{Marker, Outcome};
use crate::error::{Error, Result};
use crate::game::{Game, GameConfig, GameView};
use crate::players::{AgentPlayer, SearchPlayer};
use crate::search::SearchEngine;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

pub const AGENT_NAME: &str = "RL Agent";
pub const ENGINE_NAME: &str = "TicToc";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub games: usize,
    /// Pause between games, in seconds.
    pub delay: f32,
    /// Games between saves of the agents.
    pub save_every: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            games: 10,
            delay: 0.5,
            save_every: 10,
        }
    }
}

impl TournamentConfig {
    /// The pause between games; fails for a negative, NaN or overflowing delay.
    pub fn pause(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(self.delay).map_err(|_| Error::InvalidParameter {
            name: "tournament.delay",
            value: self.delay,
            expected: "must be a non-negative number of seconds",
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.pause().map(|_| ())
    }
}

/// Where the agents are saved during a tournament.
#[derive(Clone, Debug)]
pub struct SavePaths {
    pub agent: PathBuf,
    pub observer: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub games: usize,
    pub agent_wins: usize,
    pub engine_wins: usize,
    pub draws: usize,
    pub agent_wins_as_x: usize,
    pub agent_wins_as_o: usize,
}

impl Scoreboard {
    fn record(&mut self, outcome: Outcome, agent_marker: Marker) {
        self.games += 1;
        match outcome.winner() {
            Some(winner) if winner == agent_marker => {
                self.agent_wins += 1;
                match agent_marker {
                    Marker::X => self.agent_wins_as_x += 1,
                    Marker::O => self.agent_wins_as_o += 1,
                }
            }
            Some(_) => self.engine_wins += 1,
            None => self.draws += 1,
        }
    }

    fn percent(&self, count: usize) -> f32 {
        if self.games == 0 {
            0.0
        } else {
            count as f32 * 100.0 / self.games as f32
        }
    }
}

pub struct Tournament<'a> {
    pub agent: &'a mut QAgent,
    pub observer: Option<&'a mut QAgent>,
    pub engine: SearchEngine,
    pub config: TournamentConfig,
    pub game: GameConfig,
    pub save: Option<SavePaths>,
}

impl Tournament<'_> {
    /// Plays `config.games` games. The agent takes X in odd-numbered games and
    /// O in even-numbered ones.
    pub fn run(&mut self, view: &mut dyn GameView) -> Result<Scoreboard> {
        let pause = self.config.pause()?;
        info!("Starting tournament of {} games...", self.config.games);
        let mut scores = Scoreboard::default();
        for number in 1..=self.config.games {
            let agent_marker = if number % 2 == 1 { Marker::X } else { Marker::O };
            info!("Game {}: {} plays {}", number, AGENT_NAME, agent_marker);

            let mut agent = AgentPlayer::new(AGENT_NAME, &mut *self.agent);
            let mut engine = SearchPlayer::new(ENGINE_NAME, self.engine.clone());
            let mut game = Game::new(self.game);
            let observer = self.observer.as_deref_mut();
            let outcome = match agent_marker {
                Marker::X => game.play(&mut agent, &mut engine, observer, view)?,
                Marker::O => game.play(&mut engine, &mut agent, observer, view)?,
            };
            scores.record(outcome, agent_marker);
            info!(
                "Current score (game {}/{}): {}: {} ({:.1}%), {}: {} ({:.1}%), draws: {} ({:.1}%)",
                number,
                self.config.games,
                AGENT_NAME,
                scores.agent_wins,
                scores.percent(scores.agent_wins),
                ENGINE_NAME,
                scores.engine_wins,
                scores.percent(scores.engine_wins),
                scores.draws,
                scores.percent(scores.draws)
            );

            if self.config.save_every > 0 && number % self.config.save_every == 0 {
                self.save_agents();
            }
            if !pause.is_zero() && number < self.config.games {
                thread::sleep(pause);
            }
        }
        Ok(scores)
    }

    fn save_agents(&self) {
        let Some(paths) = &self.save else {
            return;
        };
        if let Err(e) = self.agent.save(&paths.agent) {
            warn!("Error saving agent: {}", e);
        }
        if let Some(observer) = &self.observer {
            if let Err(e) = observer.save(&paths.observer) {
                warn!("Error saving observer: {}", e);
            }
        }
        info!("Progress saved!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentParams;
    use crate::game::Silent;
    use tempfile::tempdir;

    #[test]
    fn scoreboard_attributes_wins_by_marker() {
        let mut scores = Scoreboard::default();
        scores.record(Outcome::XWins, Marker::X);
        scores.record(Outcome::XWins, Marker::O);
        scores.record(Outcome::OWins, Marker::O);
        scores.record(Outcome::Draw, Marker::X);
        assert_eq!(scores.games, 4);
        assert_eq!(scores.agent_wins, 2);
        assert_eq!(scores.agent_wins_as_x, 1);
        assert_eq!(scores.agent_wins_as_o, 1);
        assert_eq!(scores.engine_wins, 1);
        assert_eq!(scores.draws, 1);
        assert_eq!(scores.percent(scores.draws), 25.0);
    }

    #[test]
    fn unrepresentable_delay_is_rejected_before_playing() {
        let mut agent = QAgent::new(AgentParams::default()).unwrap();
        for delay in [1e20, f32::INFINITY, f32::NAN, -1.0] {
            let mut tournament = Tournament {
                agent: &mut agent,
                observer: None,
                engine: SearchEngine::default(),
                config: TournamentConfig {
                    games: 2,
                    delay,
                    save_every: 0,
                },
                game: GameConfig::default(),
                save: None,
            };
            assert!(matches!(
                tournament.run(&mut Silent),
                Err(Error::InvalidParameter { name: "tournament.delay", .. })
            ));
        }
        assert!(agent.q_table().is_empty());
    }

    #[test]
    fn untrained_agent_never_beats_the_engine() {
        let dir = tempdir().unwrap();
        let mut agent = QAgent::new(AgentParams::default()).unwrap().with_seed(5);
        let mut observer = QAgent::new(AgentParams::default()).unwrap();
        let save = SavePaths {
            agent: dir.path().join("rl_player.pkl"),
            observer: dir.path().join("rl_observer.pkl"),
        };
        let mut tournament = Tournament {
            agent: &mut agent,
            observer: Some(&mut observer),
            engine: SearchEngine::default(),
            config: TournamentConfig {
                games: 4,
                delay: 0.0,
                save_every: 2,
            },
            game: GameConfig::default(),
            save: Some(save.clone()),
        };
        let scores = tournament.run(&mut Silent).unwrap();
        assert_eq!(scores.games, 4);
        assert_eq!(scores.agent_wins, 0);
        assert_eq!(scores.engine_wins + scores.draws, 4);
        assert!(!observer.q_table().is_empty());
        assert!(save.agent.exists());
        assert!(save.observer.exists());
    }
}
