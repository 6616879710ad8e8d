//! Output path layout.
//!
//! Every artifact of a run lives under `{output_dir}/{policy}/{clients}/`
//! and is prefixed with `sim{run_id}_`. Paths are resolved here without
//! touching the filesystem.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    pub output_dir: PathBuf,
    pub policy: String,
    pub clients: usize,
    pub run_id: u32,
}

impl OutputDescriptor {
    pub fn new(output_dir: impl Into<PathBuf>, policy: &str, clients: usize, run_id: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy: policy.to_string(),
            clients,
            run_id,
        }
    }

    /// Directory all run artifacts go into
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir
            .join(&self.policy)
            .join(self.clients.to_string())
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.run_dir().join(format!("sim{}_{}", self.run_id, suffix))
    }

    pub fn position_log(&self) -> PathBuf {
        self.file("clientPos.txt")
    }

    /// CSV trace of the given collector kind
    pub fn trace(&self, kind: &str) -> PathBuf {
        self.file(&format!("{}.csv", kind))
    }

    pub fn scenario_document(&self) -> PathBuf {
        self.file("scenario.yaml")
    }

    pub fn summary(&self) -> PathBuf {
        self.file("summary.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let out = OutputDescriptor::new("dash-log-files", "panda", 3, 7);
        assert_eq!(out.run_dir(), PathBuf::from("dash-log-files/panda/3"));
        assert_eq!(
            out.position_log(),
            PathBuf::from("dash-log-files/panda/3/sim7_clientPos.txt")
        );
        assert_eq!(
            out.trace("playback"),
            PathBuf::from("dash-log-files/panda/3/sim7_playback.csv")
        );
        assert_eq!(
            out.scenario_document(),
            PathBuf::from("dash-log-files/panda/3/sim7_scenario.yaml")
        );
        assert_eq!(out.summary(), PathBuf::from("dash-log-files/panda/3/sim7_summary.json"));
    }

    #[test]
    fn test_runs_do_not_share_files() {
        let a = OutputDescriptor::new("/tmp/out", "festive", 10, 1);
        let b = OutputDescriptor::new("/tmp/out", "festive", 10, 2);
        assert_eq!(a.run_dir(), b.run_dir());
        assert_ne!(a.position_log(), b.position_log());
    }
}
