//! Append-only watering log.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Durable, line-oriented event log.
pub trait LogSink {
    /// Append one line. A failure must leave the sink usable for the next
    /// call.
    fn append(&mut self, line: &str) -> Result<()>;
}

/// Text file on local storage. The file is opened per line so a removed and
/// re-inserted card is picked up on the next write.
pub struct FileLog {
    path: PathBuf,
    /// Lines written since the last [`FileLog::take_recent`], successful or not.
    recent: Vec<String>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recent: Vec::new(),
        }
    }

    pub fn take_recent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.recent)
    }
}

impl LogSink for FileLog {
    fn append(&mut self, line: &str) -> Result<()> {
        tracing::info!(target: "garden", "{line}");
        self.recent.push(line.to_string());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open log: {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to write log: {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("failed to sync log: {}", self.path.display()))?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
