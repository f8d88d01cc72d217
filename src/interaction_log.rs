//! Append-only log of queries and model responses.
//!
//! The log is write-only: nothing in the program reads it back. Entries look
//! like
//!
//! ```text
//! [2024-05-01T10:00:00.000000+02:00] Query: list files
//! [2024-05-01T10:00:00.000000+02:00] Response: ls -la
//! [2024-05-01T10:00:00.000000+02:00] Success: true
//! ```
//!
//! followed by a blank line.

use crate::providers::{SystemTimeProvider, TimeProvider};
use anyhow::{anyhow, Result};
use chrono::SecondsFormat;
use dirs::home_dir;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOG_FILE: &str = ".ai-terminal-history.log";

pub struct InteractionLog {
    path: PathBuf,
    time_provider: Box<dyn TimeProvider>,
}

impl InteractionLog {
    /// Log at the default per-user location.
    pub fn open_default() -> Result<Self> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(Self::new(home.join(LOG_FILE)))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_time_provider(path, Box::new(SystemTimeProvider))
    }

    /// Creates a log with a custom time provider (for testing).
    pub fn with_time_provider(path: impl Into<PathBuf>, time_provider: Box<dyn TimeProvider>) -> Self {
        Self {
            path: path.into(),
            time_provider,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry.
    pub fn append(&self, query: &str, response: &str, success: bool) -> Result<()> {
        let timestamp = self
            .time_provider
            .now()
            .to_rfc3339_opts(SecondsFormat::Micros, false);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let entry = format!(
            "[{ts}] Query: {query}\n[{ts}] Response: {response}\n[{ts}] Success: {success}\n\n",
            ts = timestamp,
        );
        file.write_all(entry.as_bytes())?;
        debug!("Logged interaction to {}", self.path.display());
        Ok(())
    }

    /// Appends one entry, reporting failures as warnings only.
    pub fn record(&self, query: &str, response: &str, success: bool) {
        if let Err(e) = self.append(query, response, success) {
            warn!("Failed to write interaction log {}: {}", self.path.display(), e);
        }
    }
}
