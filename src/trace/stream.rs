//! Append-only trace files.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ScenarioError;

/// Buffered, append-mode writer for one trace file.
///
/// The header is written only when the file is new, so repeated runs with
/// the same run id keep appending rows under a single header.
#[derive(Debug)]
pub struct TraceStream {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl TraceStream {
    pub fn open(path: &Path, header: &str) -> Result<Self, ScenarioError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ScenarioError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ScenarioError::io(path, e))?;
        let is_new = file
            .metadata()
            .map_err(|e| ScenarioError::io(path, e))?
            .len()
            == 0;

        let mut stream = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            rows: 0,
        };
        if is_new {
            writeln!(stream.writer, "{}", header).map_err(|e| ScenarioError::io(path, e))?;
        }
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append(&mut self, row: &str) -> Result<(), ScenarioError> {
        writeln!(self.writer, "{}", row).map_err(|e| ScenarioError::io(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered rows and release the file
    pub fn close(mut self) -> Result<(), ScenarioError> {
        self.writer.flush().map_err(|e| ScenarioError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/sim1_playback.csv");

        let mut first = TraceStream::open(&path, "time,node,event").unwrap();
        first.append("2.0,ue0,start").unwrap();
        first.close().unwrap();

        let mut second = TraceStream::open(&path, "time,node,event").unwrap();
        second.append("2.5,ue0,stall").unwrap();
        assert_eq!(second.rows(), 1);
        second.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "time,node,event\n2.0,ue0,start\n2.5,ue0,stall\n");
    }
}
