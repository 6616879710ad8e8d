//! Client position log.
//!
//! One `x, y, z` line per client in client-index order, written so observed
//! performance can later be correlated with where each client stood.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::ScenarioError;
use super::planner::Placement;

/// Write every client position of `placement` to `path`, replacing any
/// previous log of the same run
pub fn write_position_log(path: &Path, placement: &Placement) -> Result<usize, ScenarioError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScenarioError::io(parent, e))?;
    }

    let file = File::create(path).map_err(|e| ScenarioError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    for entry in placement.clients() {
        writeln!(writer, "{}", entry.position).map_err(|e| ScenarioError::io(path, e))?;
        written += 1;
    }
    writer.flush().map_err(|e| ScenarioError::io(path, e))?;

    info!("Logged {} client positions to {:?}", written, path);
    Ok(written)
}
