use directories::ProjectDirs;
use std::path::PathBuf;

const HIGHSCORE_FILE: &str = "vale.cfg";
const LOG_FILE: &str = "vale.log";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// State directory under $HOME/.local/state/vale, or the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("vale"))
        } else {
            ProjectDirs::from("", "", "vale").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn highscore_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join(HIGHSCORE_FILE))
            .unwrap_or_else(|| PathBuf::from(HIGHSCORE_FILE))
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join(LOG_FILE))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_share_the_state_dir() {
        let hs = AppDirs::highscore_path();
        let log = AppDirs::log_path();
        assert_eq!(hs.file_name().unwrap(), HIGHSCORE_FILE);
        assert_eq!(log.file_name().unwrap(), LOG_FILE);
        assert_eq!(hs.parent(), log.parent());
    }
}
