//! On-disk formats for Q-tables and agents.
//!
//! Both are written as pickles. A JSON copy of a table can be exported for
//! inspection; it is never read back on the normal load path.

use crate::error::{Error, Result};
use crate::q_table::QTable;
use chrono::offset::Local;
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything needed to restore a trained agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedAgent {
    pub q_table: QTable,
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    Ok(BufWriter::new(file))
}

fn write_pickle<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = create(path)?;
    serde_pickle::to_writer(&mut writer, value, serde_pickle::SerOptions::new())?;
    writer.flush().map_err(|e| Error::io(path, e))
}

fn read_pickle<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let decoded = serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())?;
    Ok(decoded)
}

pub fn save_table(path: &Path, table: &QTable) -> Result<()> {
    write_pickle(path, table)?;
    info!("Saved Q-table with {} state-action pairs to {}", table.len(), path.display());
    Ok(())
}

pub fn load_table(path: &Path) -> Result<QTable> {
    read_pickle(path)
}

/// Loads a table, falling back to an empty one when the file is missing or
/// unreadable.
pub fn load_table_or_empty(path: &Path) -> QTable {
    if !path.exists() {
        info!("No existing Q-table at {}. Starting fresh.", path.display());
        return QTable::new();
    }
    match load_table(path) {
        Ok(table) => {
            info!("Loaded Q-table with {} state-action pairs", table.len());
            table
        }
        Err(e) => {
            warn!("Error loading Q-table from {}: {}. Starting fresh.", path.display(), e);
            QTable::new()
        }
    }
}

pub fn save_agent(path: &Path, agent: &SavedAgent) -> Result<()> {
    write_pickle(path, agent)?;
    info!(
        "Agent saved to {} with {} learned state-action pairs",
        path.display(),
        agent.q_table.len()
    );
    Ok(())
}

pub fn load_agent(path: &Path) -> Result<SavedAgent> {
    read_pickle(path)
}

/// Writes a date-stamped JSON copy of `table` into `dir` and returns its path.
pub fn export_json(dir: &Path, table: &QTable) -> Result<PathBuf> {
    let today = Local::now().date_naive();
    let path = dir.join(format!("qtable-{}.json", today));
    let mut writer = create(&path)?;
    serde_json::to_writer(&mut writer, table)?;
    writer.flush().map_err(|e| Error::io(&path, e))?;
    info!("Exported Q-table to {}", path.display());
    Ok(path)
}

pub fn import_json(path: &Path) -> Result<QTable> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
