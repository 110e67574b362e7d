// Config Vault Service
// Snapshots Charles' config file and profiles before a session and puts them
// back afterwards
//
// Neither operation panics or aborts its caller: failures are logged here and
// handed back as values so the lifecycle can report them.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{ConfigSnapshot, PathsConfig, RestoreOutcome, SnapshotOutcome};
use crate::utils::fs_ops;

const CONFIG_SUBDIR: &str = "config";
const PROFILES_SUBDIR: &str = "profiles";
const CONFIG_FILE_NAME: &str = "charles.config";
const MANIFEST_FILE_NAME: &str = "snapshot.json";

/// Vault errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot manifest is unreadable: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl VaultError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        VaultError::Io {
            action,
            path: path.display().to_string(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Io { .. } => "VAULT_IO_ERROR",
            VaultError::Manifest(_) => "VAULT_MANIFEST_ERROR",
        }
    }
}

impl From<VaultError> for String {
    fn from(err: VaultError) -> Self {
        err.to_string()
    }
}

/// Snapshot/restore of the live Charles configuration
#[derive(Debug, Clone)]
pub struct ConfigVault {
    config_file: Option<PathBuf>,
    profiles_dir: Option<PathBuf>,
    backup_root: PathBuf,
}

impl ConfigVault {
    pub fn new(
        config_file: Option<PathBuf>,
        profiles_dir: Option<PathBuf>,
        backup_root: PathBuf,
    ) -> Self {
        Self {
            config_file,
            profiles_dir,
            backup_root,
        }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(
            paths.config_file.clone(),
            paths.profiles_dir.clone(),
            paths.backup_dir.clone(),
        )
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    fn backed_up_config(&self) -> PathBuf {
        self.backup_root.join(CONFIG_SUBDIR).join(CONFIG_FILE_NAME)
    }

    fn backed_up_profiles(&self) -> PathBuf {
        self.backup_root.join(PROFILES_SUBDIR)
    }

    /// Copy the live config (and profiles) into the backup root
    ///
    /// A missing live config is not an error. The new snapshot is assembled in
    /// a staging directory and swapped in, so the previous backup is either
    /// replaced entirely or left as it was.
    pub fn snapshot(&self) -> Result<SnapshotOutcome, VaultError> {
        let config_file = match &self.config_file {
            Some(path) if path.is_file() => path,
            other => {
                log::warn!(
                    "[ConfigVault] Live config not found ({}), nothing to snapshot",
                    other
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "path unknown".to_string())
                );
                return Ok(SnapshotOutcome::NothingToProtect);
            }
        };

        match self.write_snapshot(config_file) {
            Ok(snapshot) => {
                log::info!(
                    "[ConfigVault] Configuration backed up to {}",
                    self.backup_root.display()
                );
                Ok(SnapshotOutcome::Taken(snapshot))
            }
            Err(e) => {
                log::error!("[ConfigVault] Snapshot failed: {}", e);
                Err(e)
            }
        }
    }

    fn write_snapshot(&self, config_file: &Path) -> Result<ConfigSnapshot, VaultError> {
        let staging = self.staging_root();
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| VaultError::io("clear", &staging, e))?;
        }

        let result = self.stage_snapshot(config_file, &staging);
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        fs_ops::swap_dir_into_place(&staging, &self.backup_root)
            .map_err(|e| VaultError::io("replace", &self.backup_root, e))?;
        Ok(snapshot)
    }

    fn stage_snapshot(
        &self,
        config_file: &Path,
        staging: &Path,
    ) -> Result<ConfigSnapshot, VaultError> {
        let config_dir = staging.join(CONFIG_SUBDIR);
        fs::create_dir_all(&config_dir).map_err(|e| VaultError::io("create", &config_dir, e))?;
        fs::copy(config_file, config_dir.join(CONFIG_FILE_NAME))
            .map_err(|e| VaultError::io("copy", config_file, e))?;

        let profiles_dir = self.profiles_dir.as_ref().filter(|p| p.is_dir());
        if let Some(profiles) = profiles_dir {
            fs_ops::copy_dir_recursive(profiles, &staging.join(PROFILES_SUBDIR))
                .map_err(|e| VaultError::io("copy", profiles, e))?;
        }

        let snapshot = ConfigSnapshot {
            config_file_path: config_file.to_path_buf(),
            profiles_dir_path: profiles_dir.cloned(),
            backup_root: self.backup_root.clone(),
            taken_at: Utc::now(),
        };
        let manifest = serde_json::to_vec_pretty(&snapshot)?;
        let manifest_path = staging.join(MANIFEST_FILE_NAME);
        fs::write(&manifest_path, manifest)
            .map_err(|e| VaultError::io("write", &manifest_path, e))?;

        Ok(snapshot)
    }

    fn staging_root(&self) -> PathBuf {
        let name = self
            .backup_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "back".to_string());
        let staging_name = format!(".{}.snapshot", name);
        match self.backup_root.parent() {
            Some(parent) => parent.join(staging_name),
            None => PathBuf::from(staging_name),
        }
    }

    /// Manifest of the snapshot currently on disk, if any
    pub fn current_snapshot(&self) -> Result<Option<ConfigSnapshot>, VaultError> {
        let manifest_path = self.backup_root.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Ok(None);
        }
        let content = fs::read(&manifest_path)
            .map_err(|e| VaultError::io("read", &manifest_path, e))?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Put the backed-up config and profiles back over the live locations
    ///
    /// Steps without a backup or without a known live path are skipped.
    /// Running it twice leaves the same state as running it once.
    pub fn restore(&self) -> Result<RestoreOutcome, VaultError> {
        match self.current_snapshot() {
            Ok(Some(snapshot)) => log::info!(
                "[ConfigVault] Restoring snapshot taken at {}",
                snapshot.taken_at
            ),
            Ok(None) => {}
            Err(e) => log::warn!("[ConfigVault] Snapshot manifest unreadable: {}", e),
        }

        match self.restore_inner() {
            Ok(outcome) => {
                if outcome.is_noop() {
                    log::info!("[ConfigVault] No snapshot to restore");
                } else {
                    log::info!("[ConfigVault] Configuration restored to original state");
                }
                Ok(outcome)
            }
            Err(e) => {
                log::error!("[ConfigVault] Restore failed: {}", e);
                Err(e)
            }
        }
    }

    fn restore_inner(&self) -> Result<RestoreOutcome, VaultError> {
        let mut outcome = RestoreOutcome::default();

        let backed_up_config = self.backed_up_config();
        if let (true, Some(live_config)) = (backed_up_config.is_file(), &self.config_file) {
            fs_ops::copy_file_atomic(&backed_up_config, live_config)
                .map_err(|e| VaultError::io("restore", live_config, e))?;
            outcome.config_restored = true;
        }

        let backed_up_profiles = self.backed_up_profiles();
        if let (true, Some(live_profiles)) = (backed_up_profiles.is_dir(), &self.profiles_dir) {
            fs_ops::replace_dir(&backed_up_profiles, live_profiles)
                .map_err(|e| VaultError::io("restore", live_profiles, e))?;
            outcome.profiles_restored = true;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ConfigVault, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let paths = PathsConfig::rooted_at(tmp.path());
        let config = paths.config_file.clone().unwrap();
        let profiles = paths.profiles_dir.clone().unwrap();
        fs::create_dir_all(&profiles).unwrap();
        fs::write(&config, b"<config original=\"yes\"/>").unwrap();
        fs::write(profiles.join("default.xml"), b"profile-a").unwrap();
        fs::create_dir_all(profiles.join("nested")).unwrap();
        fs::write(profiles.join("nested/extra.xml"), b"profile-b").unwrap();
        (tmp, ConfigVault::from_paths(&paths), config, profiles)
    }

    fn tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            for entry in fs::read_dir(&current).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(dir).unwrap().to_path_buf();
                    files.insert(rel, fs::read(&path).unwrap());
                }
            }
        }
        files
    }

    #[test]
    fn test_snapshot_mutate_restore_round_trip() {
        let (_tmp, vault, config, profiles) = setup();
        let original_config = fs::read(&config).unwrap();
        let original_tree = tree(&profiles);

        assert!(matches!(vault.snapshot().unwrap(), SnapshotOutcome::Taken(_)));

        fs::write(&config, b"mutated").unwrap();
        fs::write(profiles.join("default.xml"), b"changed").unwrap();
        fs::write(profiles.join("added.xml"), b"new").unwrap();
        fs::remove_dir_all(profiles.join("nested")).unwrap();

        let outcome = vault.restore().unwrap();
        assert!(outcome.config_restored);
        assert!(outcome.profiles_restored);
        assert_eq!(fs::read(&config).unwrap(), original_config);
        assert_eq!(tree(&profiles), original_tree);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let (_tmp, vault, config, profiles) = setup();
        vault.snapshot().unwrap();
        fs::write(&config, b"mutated").unwrap();

        vault.restore().unwrap();
        let once = (fs::read(&config).unwrap(), tree(&profiles));
        vault.restore().unwrap();
        let twice = (fs::read(&config).unwrap(), tree(&profiles));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snapshot_without_live_config_is_noop() {
        let tmp = TempDir::new().unwrap();
        let paths = PathsConfig::rooted_at(tmp.path());
        let vault = ConfigVault::from_paths(&paths);

        assert_eq!(vault.snapshot().unwrap(), SnapshotOutcome::NothingToProtect);
        assert!(!paths.backup_dir.exists());
    }

    #[test]
    fn test_snapshot_with_unknown_paths_is_noop() {
        let tmp = TempDir::new().unwrap();
        let vault = ConfigVault::new(None, None, tmp.path().join("back"));
        assert_eq!(vault.snapshot().unwrap(), SnapshotOutcome::NothingToProtect);
        assert!(vault.restore().unwrap().is_noop());
    }

    #[test]
    fn test_restore_without_snapshot_is_noop() {
        let (_tmp, vault, config, _profiles) = setup();
        fs::write(&config, b"live").unwrap();

        assert!(vault.restore().unwrap().is_noop());
        assert_eq!(fs::read(&config).unwrap(), b"live");
    }

    #[test]
    fn test_new_snapshot_replaces_old_profiles() {
        let (_tmp, vault, _config, profiles) = setup();
        vault.snapshot().unwrap();

        fs::remove_file(profiles.join("default.xml")).unwrap();
        vault.snapshot().unwrap();

        let backed_up = vault.backup_root().join(PROFILES_SUBDIR);
        assert!(!backed_up.join("default.xml").exists());
        assert!(backed_up.join("nested/extra.xml").exists());
    }

    #[test]
    fn test_snapshot_writes_manifest() {
        let (_tmp, vault, config, profiles) = setup();
        vault.snapshot().unwrap();

        let manifest = vault.current_snapshot().unwrap().unwrap();
        assert_eq!(manifest.config_file_path, config);
        assert_eq!(manifest.profiles_dir_path, Some(profiles));
        assert_eq!(manifest.backup_root, vault.backup_root());
    }

    #[test]
    fn test_restore_recreates_deleted_profiles_dir() {
        let (_tmp, vault, _config, profiles) = setup();
        vault.snapshot().unwrap();
        fs::remove_dir_all(&profiles).unwrap();

        vault.restore().unwrap();
        assert_eq!(fs::read(profiles.join("default.xml")).unwrap(), b"profile-a");
    }
}
