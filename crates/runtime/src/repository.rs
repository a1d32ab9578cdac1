//! Replay log storage.
//!
//! One pretty-printed JSON file per session, `{name}.json`, under a base
//! directory. Logs are write-once.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::RepositoryError;
use crate::replay::ReplayLog;

type Result<T> = std::result::Result<T, RepositoryError>;

pub struct ReplayStore {
    base_dir: PathBuf,
}

impl ReplayStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.json"))
    }

    /// Writes a new log. Refuses to overwrite an existing one.
    pub fn save(&self, name: &str, log: &ReplayLog) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.base_dir)?;
        let path = self.path(name);
        if path.exists() {
            return Err(RepositoryError::LogAlreadyExists(path.display().to_string()));
        }

        let text = log
            .to_json()
            .map_err(|e| RepositoryError::Json(e.to_string()))?;
        let mut file = OpenOptions::new().create_new(true).write(true).open(&path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), entries = log.entries.len(), "replay log saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<ReplayLog> {
        let path = self.path(name);
        if !path.exists() {
            return Err(RepositoryError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(&path)?;
        ReplayLog::from_json(&text).map_err(|e| RepositoryError::Json(e.to_string()))
    }

    /// Names of the stored logs, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> ReplayLog {
        ReplayLog::new("duel", 7, 2, "00".repeat(32))
    }

    #[test]
    fn saved_logs_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path().join("logs"));

        store.save("first", &log()).unwrap();
        assert_eq!(store.load("first").unwrap(), log());
        assert_eq!(store.list().unwrap(), ["first"]);
    }

    #[test]
    fn logs_are_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());

        store.save("game", &log()).unwrap();
        assert!(matches!(
            store.save("game", &log()),
            Err(RepositoryError::LogAlreadyExists(_))
        ));
    }

    #[test]
    fn missing_log_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());
        assert!(matches!(store.load("nope"), Err(RepositoryError::NotFound(_))));
        assert!(ReplayStore::new(dir.path().join("absent")).list().unwrap().is_empty());
    }
}
