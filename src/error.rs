use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no high score stored at {path}")]
    Missing { path: PathBuf },
    #[error("cannot access high score file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("high score file {path} does not end in a number: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session is running")]
    NotRunning,
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to persist high score")]
    Storage {
        #[from]
        source: StorageError,
    },
}
