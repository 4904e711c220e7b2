mod menu;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use menu::Session;
use std::path::PathBuf;
use tictactoe::Config;

/// Tic-Tac-Toe against people, a minimax engine and a Q-learning agent.
#[derive(Parser)]
#[command(name = "play", about = "Play and train Tic-Tac-Toe agents")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "tictactoe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive menu (the default)
    Menu,
    /// Train a new agent by self-play
    Train {
        /// Override number of training episodes
        #[arg(long)]
        episodes: Option<usize>,
    },
    /// Trained agent against the search engine
    Tournament {
        #[arg(long)]
        games: Option<usize>,
        /// Seconds to wait between games
        #[arg(long)]
        delay: Option<f32>,
    },
    /// Write a JSON copy of the observer's Q-table to the archive directory
    Export,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let mut session = Session::new(config)?;

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => session.run_menu()?,
        Command::Train { episodes } => {
            session.train(episodes)?;
        }
        Command::Tournament { games, delay } => {
            session.tournament(games, delay)?;
            session.save_observer();
        }
        Command::Export => session.export()?,
    }
    Ok(())
}
