use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::app_dirs::AppDirs;
use crate::error::StorageError;

/// Durable storage for the single best score.
pub trait HighScoreStore: Send + Sync {
    fn load(&self) -> Result<u64, StorageError>;
    fn save(&self, value: u64) -> Result<(), StorageError>;
}

/// Renders the canonical file content for `value`.
pub fn format_highscore(value: u64) -> String {
    format!("Highscore = {value}\n")
}

/// Parses the last whitespace-delimited token of `content`; anything before it is ignored.
pub fn parse_highscore(content: &str) -> Option<u64> {
    content.split_whitespace().last()?.parse().ok()
}

/// Text-file store holding one `Highscore = <n>` line.
#[derive(Debug, Clone)]
pub struct FileHighScoreStore {
    path: PathBuf,
}

impl FileHighScoreStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_path(AppDirs::highscore_path())
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for FileHighScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HighScoreStore for FileHighScoreStore {
    fn load(&self) -> Result<u64, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let value = parse_highscore(&content).ok_or_else(|| StorageError::Corrupt {
            path: self.path.clone(),
            content: content.clone(),
        })?;
        log::debug!("loaded high score {value} from {}", self.path.display());
        Ok(value)
    }

    fn save(&self, value: u64) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        // write-then-rename so a crash never leaves a half-written file behind
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, format_highscore(value)).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }
        log::debug!("saved high score {value} to {}", self.path.display());
        Ok(())
    }
}

/// In-process store; starts empty so the first `load` reports `Missing`.
#[derive(Debug, Default)]
pub struct MemoryHighScoreStore {
    value: Mutex<Option<u64>>,
}

impl MemoryHighScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: u64) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<u64>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn load(&self) -> Result<u64, StorageError> {
        self.slot().ok_or_else(|| StorageError::Missing {
            path: PathBuf::from("<memory>"),
        })
    }

    fn save(&self, value: u64) -> Result<(), StorageError> {
        *self.slot() = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn writer_emits_canonical_line() {
        assert_eq!(format_highscore(17), "Highscore = 17\n");
    }

    #[test]
    fn parser_takes_last_token() {
        assert_eq!(parse_highscore("Highscore = 42\n"), Some(42));
        assert_eq!(parse_highscore("garbage text Highscore = 42\n"), Some(42));
        assert_eq!(parse_highscore("7"), Some(7));
        assert_eq!(parse_highscore(""), None);
        assert_eq!(parse_highscore("Highscore = \n"), None);
        assert_eq!(parse_highscore("Highscore = -3\n"), None);
        assert_eq!(parse_highscore("Highscore = 4.5\n"), None);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileHighScoreStore::with_path(dir.path().join("vale.cfg"));
        assert_matches!(store.load(), Err(StorageError::Missing { .. }));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vale.cfg");
        fs::write(&path, "Highscore = lots\n").unwrap();
        let store = FileHighScoreStore::with_path(&path);
        assert_matches!(store.load(), Err(StorageError::Corrupt { content, .. }) if content.contains("lots"));
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = tempdir().unwrap();
        // a directory cannot be read as a file
        let store = FileHighScoreStore::with_path(dir.path());
        assert_matches!(store.load(), Err(StorageError::Io { .. }));
    }

    #[test]
    fn save_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("vale.cfg");
        let store = FileHighScoreStore::with_path(&path);
        store.save(5).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Highscore = 5\n");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        // a non-empty directory in the way makes the final rename fail
        let path = dir.path().join("vale.cfg");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();

        let store = FileHighScoreStore::with_path(&path);
        assert_matches!(store.save(5), Err(StorageError::Io { .. }));
        assert!(!dir.path().join("vale.cfg.tmp").exists());
    }

    #[test]
    fn memory_store_starts_missing() {
        let store = MemoryHighScoreStore::new();
        assert_matches!(store.load(), Err(StorageError::Missing { .. }));
        store.save(9).unwrap();
        assert_eq!(store.load().unwrap(), 9);
        assert_eq!(MemoryHighScoreStore::with_value(3).load().unwrap(), 3);
    }
}
