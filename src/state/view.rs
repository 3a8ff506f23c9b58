//! Persisted view state for the batch board.
//!
//! Only display state lives here: the set of batch numbers the user has
//! collapsed. It is read at startup and written on toggle, and has no
//! bearing on the scheduling algorithm itself.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::{tlog_debug, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    collapsed: BTreeSet<u32>,
}

impl ViewState {
    /// Load from the default location; a missing file yields the default
    /// state.
    pub fn load() -> Result<Self> {
        Self::load_from(&Config::view_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tlog_debug!("view state not found at {}, using default", path.display());
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        Config::ensure_dirs()?;
        self.save_to(&Config::view_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_collapsed(&self, batch: u32) -> bool {
        self.collapsed.contains(&batch)
    }

    /// Flip a batch's collapsed state. Returns the new state.
    pub fn toggle(&mut self, batch: u32) -> bool {
        if !self.collapsed.remove(&batch) {
            self.collapsed.insert(batch);
            true
        } else {
            false
        }
    }

    pub fn collapsed_batches(&self) -> impl Iterator<Item = u32> + '_ {
        self.collapsed.iter().copied()
    }
}
