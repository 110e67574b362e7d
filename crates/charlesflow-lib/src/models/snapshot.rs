// Configuration snapshot models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Manifest describing the backup currently held in the backup root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    /// Live config file that was copied
    pub config_file_path: PathBuf,
    /// Live profiles directory, if one existed when the snapshot was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir_path: Option<PathBuf>,
    pub backup_root: PathBuf,
    pub taken_at: DateTime<Utc>,
}

/// Result of a snapshot attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Taken(ConfigSnapshot),
    /// No live config file, so there was nothing to protect
    NothingToProtect,
}

/// Result of a restore attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub config_restored: bool,
    pub profiles_restored: bool,
}

impl RestoreOutcome {
    pub fn is_noop(&self) -> bool {
        !self.config_restored && !self.profiles_restored
    }
}
