use crate::agent::AgentParams;
use crate::error::{Error, Result};
use crate::game::GameConfig;
use crate::search::SearchConfig;
use crate::tournament::TournamentConfig;
use crate::training::TrainingConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
    /// Learning updates between automatic saves of the table.
    pub save_every: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let params = AgentParams::default();
        AgentConfig {
            learning_rate: params.learning_rate,
            discount_factor: params.discount_factor,
            epsilon: params.epsilon,
            save_every: 5000,
        }
    }
}

impl AgentConfig {
    pub fn params(&self) -> AgentParams {
        AgentParams {
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            epsilon: self.epsilon,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Trained agent: table plus hyperparameters.
    pub agent: PathBuf,
    /// Checkpoints of the observer's table, read back on start when newer
    /// than `observer`.
    pub table: PathBuf,
    /// Checkpoints of the table being trained.
    pub latest_table: PathBuf,
    /// Agent that learns by watching games.
    pub observer: PathBuf,
    /// Directory for JSON exports.
    pub archive: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            agent: PathBuf::from("trained_agent.pkl"),
            table: PathBuf::from("q_table.pkl"),
            latest_table: PathBuf::from("q_table_latest.pkl"),
            observer: PathBuf::from("rl_observer.pkl"),
            archive: PathBuf::from("q_table_archive"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub search: SearchConfig,
    pub game: GameConfig,
    pub training: TrainingConfig,
    pub tournament: TournamentConfig,
    pub paths: PathsConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.agent.params().validate()?;
        AgentParams {
            epsilon: self.training.epsilon,
            ..self.agent.params()
        }
        .validate()?;
        if self.search.depth == 0 {
            return Err(Error::InvalidParameter {
                name: "search.depth",
                value: 0.0,
                expected: "must be at least 1",
            });
        }
        if self.game.max_attempts == 0 {
            return Err(Error::InvalidParameter {
                name: "game.max_attempts",
                value: 0.0,
                expected: "must be at least 1",
            });
        }
        self.tournament.validate()
    }
}
