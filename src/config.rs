use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::SessionConfig;

/// The two game variants that ship with vale; they differ only in numbers.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Classic,
    Quick,
}

impl Variant {
    pub fn playtime_secs(&self) -> f64 {
        match self {
            Variant::Classic => 14.0,
            Variant::Quick => 10.0,
        }
    }

    pub fn avatar_size(&self) -> (u16, u16) {
        match self {
            Variant::Classic => (128, 128),
            Variant::Quick => (96, 96),
        }
    }
}

/// User preferences persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub variant: Variant,
    pub playtime_secs: Option<f64>,
    pub highscore_file: Option<PathBuf>,
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::for_variant(self.variant);
        match self.playtime_secs {
            Some(secs) => config.with_playtime(secs),
            None => config,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "vale") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("vale_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!(
                    "ignoring malformed preferences in {}: {e}",
                    self.path.display()
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("cannot read preferences {}: {e}", self.path.display()),
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
