use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const RECORDING_HEADER: &str = "// This file has been autogenerated.\n\nexports.scopes = [";
pub const RECORDING_FOOTER: &str = "];";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    Idle,
    Open,
    Closed,
}

/// Opens and closes a recording fixture file.
///
/// The sink writes exactly twice: the header when a recording suite starts, the footer
/// when it ends. The entries in between come from the recording transport.
#[derive(Debug)]
pub struct RecordingSink {
    path: PathBuf,
    state: SinkState,
}

impl RecordingSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: SinkState::Idle,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the fixture and write the header. No-op while already open.
    pub fn begin(&mut self) -> Result<()> {
        if self.state == SinkState::Open {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, RECORDING_HEADER)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.state = SinkState::Open;
        tracing::info!(path = %self.path.display(), "recording started");
        Ok(())
    }

    /// Append the footer. No-op unless a recording is open.
    pub fn finish(&mut self) -> Result<()> {
        if self.state != SinkState::Open {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(RECORDING_FOOTER.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.state = SinkState::Closed;
        tracing::info!(path = %self.path.display(), "recording finished");
        Ok(())
    }
}
