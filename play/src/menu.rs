//! The interactive menu and the modes behind it.

use crate::view::ConsoleView;
use anyhow::{Context, Result};
use log::warn;
use rand::Rng;
use std::io::{self, Write};
use std::str::FromStr;
use tictactoe::config::Config;
use tictactoe::persist;
use tictactoe::tournament::{SavePaths, Scoreboard, Tournament, AGENT_NAME, ENGINE_NAME};
use tictactoe::training::{self, TrainingSummary};
use tictactoe::{
    AgentParams, AgentPlayer, Error, Game, GameConfig, HumanPlayer, Player, QAgent,
    SearchEngine, SearchPlayer,
};

/// Prints `text` and reads one trimmed line. `None` on end of input.
fn prompt(text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

fn play_again() -> Result<bool> {
    let answer = prompt("\nPlay again in this mode? (y/n): ")?;
    Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y")))
}

/// Reads a value, falling back to `default` on an empty or unparsable answer.
fn ask_or<T: FromStr + Copy>(text: &str, default: T) -> Result<T> {
    let answer = prompt(text)?.unwrap_or_default();
    if answer.is_empty() {
        return Ok(default);
    }
    Ok(answer.parse().unwrap_or_else(|_| {
        println!("Not understood, using the default.");
        default
    }))
}

/// Plays one game. Returns `false` when the game was abandoned.
fn play_one(
    config: GameConfig,
    x: &mut dyn Player,
    o: &mut dyn Player,
    observer: Option<&mut QAgent>,
    view: &mut ConsoleView,
) -> bool {
    match Game::new(config).play(x, o, observer, view) {
        Ok(_) => true,
        Err(Error::Quit) => {
            println!("Game abandoned.");
            false
        }
        Err(e) => {
            warn!("Game aborted: {}", e);
            println!("Game abandoned: {}", e);
            false
        }
    }
}

/// State shared by the menu modes: the configuration, the agent that plays
/// and the one that learns by watching.
pub struct Session {
    config: Config,
    agent: Option<QAgent>,
    observer: QAgent,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let observer = QAgent::restore(
            &config.paths.observer,
            &config.paths.table,
            config.agent.save_every,
            config.agent.params(),
        )?;
        Ok(Session {
            config,
            agent: None,
            observer,
        })
    }

    /// Runs the menu until the user exits. The observer is saved on the way
    /// out, also when a mode failed.
    pub fn run_menu(&mut self) -> Result<()> {
        println!("Welcome to Tic-Tac-Toe Game!");
        let result = self.menu_loop();
        self.save_observer();
        println!("Thank you for playing! Goodbye!");
        result
    }

    fn menu_loop(&mut self) -> Result<()> {
        loop {
            println!("\n{}", "=".repeat(40));
            println!("TIC-TAC-TOE GAME MENU");
            println!("{}", "=".repeat(40));
            println!("1. Human vs Human");
            println!("2. Human vs RL Agent");
            println!("3. Human vs {}", ENGINE_NAME);
            println!("4. RL Agent vs {}", ENGINE_NAME);
            println!("5. Train RL Agent");
            println!("6. Exit");
            println!("{}", "=".repeat(40));

            let Some(choice) = prompt("Select an option (1-6): ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => self.human_vs_human()?,
                "2" => self.human_vs_agent()?,
                "3" => self.human_vs_engine()?,
                "4" => {
                    let games = ask_or("How many games to play? (default: 10): ", 10)?;
                    let delay = ask_or("Delay between games in seconds (default: 0.5): ", 0.5)?;
                    if let Err(e) = self.tournament(Some(games), Some(delay)) {
                        println!("Tournament not played: {:#}", e);
                    }
                }
                "5" => {
                    let default = self.config.training.episodes;
                    let text = format!("Number of training episodes (default: {}): ", default);
                    let episodes = ask_or(&text, default)?;
                    self.train(Some(episodes))?;
                }
                "6" => return Ok(()),
                _ => println!("Invalid choice. Please select a valid option (1-6)."),
            }
        }
    }

    fn human_vs_human(&mut self) -> Result<()> {
        let mut view = ConsoleView::new("User 1", "User 2");
        loop {
            let mut x = HumanPlayer::stdio("User 1");
            let mut o = HumanPlayer::stdio("User 2");
            let finished = play_one(
                self.config.game,
                &mut x,
                &mut o,
                Some(&mut self.observer),
                &mut view,
            );
            if !finished || !play_again()? {
                break;
            }
        }
        self.save_observer();
        Ok(())
    }

    fn human_vs_agent(&mut self) -> Result<()> {
        let mut agent = self.take_agent()?;
        let result = self.human_vs_agent_games(&mut agent);
        self.agent = Some(agent);
        result
    }

    fn human_vs_agent_games(&mut self, agent: &mut QAgent) -> Result<()> {
        loop {
            let mut human = HumanPlayer::stdio("User");
            let mut player = AgentPlayer::new(AGENT_NAME, &mut *agent);
            let finished = if rand::thread_rng().gen_bool(0.5) {
                println!("You play as X (first)");
                let mut view = ConsoleView::new("User", AGENT_NAME);
                play_one(self.config.game, &mut human, &mut player, None, &mut view)
            } else {
                println!("{} plays as X (first)", AGENT_NAME);
                let mut view = ConsoleView::new(AGENT_NAME, "User");
                play_one(self.config.game, &mut player, &mut human, None, &mut view)
            };
            if !finished || !play_again()? {
                return Ok(());
            }
        }
    }

    fn human_vs_engine(&mut self) -> Result<()> {
        let mut view = ConsoleView::new("User", ENGINE_NAME);
        let mut engine = SearchPlayer::new(ENGINE_NAME, SearchEngine::new(self.config.search));
        loop {
            let mut human = HumanPlayer::stdio("User");
            let finished = play_one(
                self.config.game,
                &mut human,
                &mut engine,
                Some(&mut self.observer),
                &mut view,
            );
            if !finished || !play_again()? {
                break;
            }
        }
        self.save_observer();
        Ok(())
    }

    /// Agent against the search engine. `None` keeps the configured value.
    pub fn tournament(&mut self, games: Option<usize>, delay: Option<f32>) -> Result<Scoreboard> {
        let mut config = self.config.tournament;
        config.games = games.unwrap_or(config.games);
        config.delay = delay.unwrap_or(config.delay);
        config.validate()?;

        let mut agent = self.take_agent()?;
        let mut tournament = Tournament {
            agent: &mut agent,
            observer: Some(&mut self.observer),
            engine: SearchEngine::new(self.config.search),
            config,
            game: self.config.game,
            save: Some(SavePaths {
                agent: self.config.paths.agent.clone(),
                observer: self.config.paths.observer.clone(),
            }),
        };
        let mut view = ConsoleView::new(AGENT_NAME, ENGINE_NAME).quiet();
        let result = tournament.run(&mut view);
        self.agent = Some(agent);
        let scores = result?;

        println!("\n{}", "=".repeat(40));
        println!("FINAL RESULTS AFTER {} GAMES", scores.games);
        println!(
            "{} wins: {} (as X: {}, as O: {})",
            AGENT_NAME, scores.agent_wins, scores.agent_wins_as_x, scores.agent_wins_as_o
        );
        println!("{} wins: {}", ENGINE_NAME, scores.engine_wins);
        println!("Draws: {}", scores.draws);
        println!("{}", "=".repeat(40));
        Ok(scores)
    }

    /// Trains a fresh agent by self-play and saves it. It replaces the agent
    /// of this session.
    pub fn train(&mut self, episodes: Option<usize>) -> Result<TrainingSummary> {
        let mut config = self.config.training;
        config.episodes = episodes.unwrap_or(config.episodes);
        let params = AgentParams {
            epsilon: config.epsilon,
            ..self.config.agent.params()
        };
        let mut agent = QAgent::new(params)?
            .with_checkpoint(self.config.paths.latest_table.clone(), self.config.agent.save_every);

        let summary = training::train(&mut agent, &config, Some(&self.config.paths.latest_table));
        let path = &self.config.paths.agent;
        agent
            .save(path)
            .with_context(|| format!("saving trained agent to {}", path.display()))?;
        println!(
            "Training finished: {} games, {} X wins, {} O wins, {} draws, {} state-action pairs.",
            summary.episodes, summary.x_wins, summary.o_wins, summary.draws, summary.table_size
        );
        self.agent = Some(agent);
        Ok(summary)
    }

    /// Writes a date-stamped JSON copy of the observer's table.
    pub fn export(&self) -> Result<()> {
        let dir = &self.config.paths.archive;
        let path = persist::export_json(dir, self.observer.q_table())
            .with_context(|| format!("exporting Q-table to {}", dir.display()))?;
        println!("Q-table exported to {}", path.display());
        Ok(())
    }

    /// The playing agent, trained first when none has been saved yet.
    fn take_agent(&mut self) -> Result<QAgent> {
        if let Some(agent) = self.agent.take() {
            return Ok(agent);
        }
        let path = &self.config.paths.agent;
        if path.exists() {
            return Ok(QAgent::load_or_default(path, self.config.agent.params())?);
        }
        println!("No trained agent found. Training new agent...");
        self.train(None)?;
        println!("Training complete. Starting game...");
        self.agent.take().context("training produced no agent")
    }

    pub fn save_observer(&self) {
        if let Err(e) = self.observer.save(&self.config.paths.observer) {
            warn!("Error saving observer: {}", e);
        }
    }
}
