// Session Cache
// Directory of exported sessions, one `<YYYYMMDDHHMMSS>.chlsj` file per capture
//
// Files are written under a temporary name and renamed into place, so
// readers only ever see complete sessions.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::CapturedSession;
use crate::utils::fs_ops;

/// Extension of cached session files
pub const SESSION_EXTENSION: &str = "chlsj";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session file name '{0}': expected a bare *.chlsj file name")]
    InvalidName(String),

    #[error("Cached session not found: {0}")]
    NotFound(String),

    #[error("Cached session {file} is not valid JSON: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            action,
            path: path.display().to_string(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CacheError::Io { .. } => "CACHE_IO_ERROR",
            CacheError::InvalidName(_) => "CACHE_INVALID_NAME",
            CacheError::NotFound(_) => "CACHE_NOT_FOUND",
            CacheError::Parse { .. } => "CACHE_PARSE_ERROR",
        }
    }
}

impl From<CacheError> for String {
    fn from(err: CacheError) -> Self {
        err.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SessionCache {
    dir: PathBuf,
}

impl SessionCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io("create", &self.dir, e))
    }

    fn is_session_file(name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|ext| ext == SESSION_EXTENSION)
            .unwrap_or(false)
            && !name.starts_with('.')
    }

    /// Cached session file names, oldest first
    pub fn list(&self) -> Result<Vec<String>, CacheError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| CacheError::io("read", &self.dir, e))? {
            let entry = entry.map_err(|e| CacheError::io("read", &self.dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if Self::is_session_file(&name) && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Most recent session (lexicographically last file name)
    pub fn latest(&self) -> Result<Option<PathBuf>, CacheError> {
        Ok(self.list()?.pop().map(|name| self.dir.join(name)))
    }

    /// Path of an explicitly named session; rejects anything but a bare file name
    pub fn resolve(&self, name: &str) -> Result<PathBuf, CacheError> {
        let bare = Path::new(name)
            .file_name()
            .map(|n| n == name)
            .unwrap_or(false);
        if !bare || !Self::is_session_file(name) {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(CacheError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<CapturedSession, CacheError> {
        let raw = fs::read_to_string(path).map_err(|e| CacheError::io("read", path, e))?;
        CapturedSession::from_json(&raw).map_err(|e| CacheError::Parse {
            file: path.display().to_string(),
            source: e,
        })
    }

    /// Store raw export text verbatim under a name derived from `completed_at`
    pub fn store(&self, raw: &str, completed_at: DateTime<Local>) -> Result<PathBuf, CacheError> {
        self.ensure()?;
        let path = self.unique_path(completed_at);
        fs_ops::write_atomic(&path, raw.as_bytes()).map_err(|e| CacheError::io("write", &path, e))?;
        Ok(path)
    }

    /// `<timestamp>.chlsj`, or `<timestamp>_<n>.chlsj` when the second is taken
    fn unique_path(&self, completed_at: DateTime<Local>) -> PathBuf {
        let stem = completed_at.format(TIMESTAMP_FORMAT).to_string();
        let mut path = self.dir.join(format!("{}.{}", stem, SESSION_EXTENSION));
        let mut counter = 1u32;
        while path.exists() {
            path = self
                .dir
                .join(format!("{}_{}.{}", stem, counter, SESSION_EXTENSION));
            counter += 1;
        }
        path
    }

    /// Delete every cached session and leave an empty directory
    pub fn purge(&self) -> Result<(), CacheError> {
        fs_ops::recreate_dir(&self.dir).map_err(|e| CacheError::io("purge", &self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn cache() -> (TempDir, SessionCache) {
        let tmp = TempDir::new().unwrap();
        let cache = SessionCache::new(tmp.path().join("package"));
        (tmp, cache)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_latest_is_lexicographically_last() {
        let (_tmp, cache) = cache();
        cache.store("[1]", at(10, 0, 0)).unwrap();
        cache.store("[3]", at(12, 0, 0)).unwrap();
        cache.store("[2]", at(11, 0, 0)).unwrap();

        let latest = cache.latest().unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "20240501120000.chlsj");
        assert_eq!(fs::read_to_string(latest).unwrap(), "[3]");
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let (_tmp, cache) = cache();
        assert!(cache.list().unwrap().is_empty());
        assert!(cache.latest().unwrap().is_none());
    }

    #[test]
    fn test_ignores_other_files() {
        let (_tmp, cache) = cache();
        cache.ensure().unwrap();
        fs::write(cache.dir().join("notes.txt"), "x").unwrap();
        fs::write(cache.dir().join(".20990101000000.chlsj.tmp"), "partial").unwrap();
        assert!(cache.list().unwrap().is_empty());
    }

    #[test]
    fn test_same_second_gets_suffix_and_sorts_after() {
        let (_tmp, cache) = cache();
        let first = cache.store("[\"a\"]", at(9, 30, 0)).unwrap();
        let second = cache.store("[\"b\"]", at(9, 30, 0)).unwrap();

        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "20240501093000_1.chlsj");
        assert_eq!(cache.latest().unwrap().unwrap(), second);
    }

    #[test]
    fn test_store_keeps_raw_text() {
        let (_tmp, cache) = cache();
        let raw = "[ {\"host\": \"x\"} ]\n";
        let path = cache.store(raw, at(8, 0, 0)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
        assert_eq!(cache.load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_rejects_paths() {
        let (_tmp, cache) = cache();
        assert!(matches!(
            cache.resolve("../secret.chlsj"),
            Err(CacheError::InvalidName(_))
        ));
        assert!(matches!(
            cache.resolve("session.json"),
            Err(CacheError::InvalidName(_))
        ));
        assert!(matches!(
            cache.resolve("20240101000000.chlsj"),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_purge_leaves_empty_dir() {
        let (_tmp, cache) = cache();
        cache.store("[]", at(7, 0, 0)).unwrap();
        cache.purge().unwrap();
        assert!(cache.dir().is_dir());
        assert!(cache.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let (_tmp, cache) = cache();
        let path = cache.store("not json", at(6, 0, 0)).unwrap();
        assert_eq!(cache.load(&path).unwrap_err().code(), "CACHE_PARSE_ERROR");
    }
}
