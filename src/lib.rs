// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod controller;
pub mod error;
pub mod highscore;
pub mod runtime;
pub mod session;
pub mod ui;

pub use controller::{EventSink, SessionController};
pub use error::{SessionError, StorageError};
pub use highscore::{FileHighScoreStore, HighScoreStore, MemoryHighScoreStore};
pub use session::{SessionConfig, SessionEvent, SessionSnapshot};
