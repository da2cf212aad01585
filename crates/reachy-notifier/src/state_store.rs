//! Optional on-disk copy of the detector state, so a restart keeps its anchor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::detector::DetectorState;
use crate::error::NotifierResult;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    #[serde(flatten)]
    state: DetectorState,
    saved_at: DateTime<Utc>,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state. A missing file yields an empty state.
    pub fn load(&self) -> NotifierResult<DetectorState> {
        if !self.path.exists() {
            return Ok(DetectorState::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let file: StateFile = serde_json::from_str(&content)?;
        Ok(file.state)
    }

    /// Like [`StateStore::load`], but an unreadable file only logs and starts over.
    pub fn load_or_default(&self) -> DetectorState {
        match self.load() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable state file {}: {}",
                    self.path.display(),
                    e
                );
                DetectorState::new()
            }
        }
    }

    /// Write `state` via a sibling temp file and rename.
    pub fn save(&self, state: &DetectorState) -> NotifierResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = StateFile {
            state: state.clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Saved detector state to {}", self.path.display());
        Ok(())
    }
}
