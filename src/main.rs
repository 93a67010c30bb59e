use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use vale::{
    app,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Variant},
    runtime::{CrosstermEventSource, FixedTicker, Runner, ValeEvent},
    FileHighScoreStore, HighScoreStore, SessionConfig, SessionController, SessionEvent,
};

const TICK_RATE_MS: u64 = 100;

/// click the avatar before the clock runs out
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A reflex clicker for the terminal: the avatar hops around the playfield, every click on it scores a point, and it gets faster and smaller as the clock runs down."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    /// game variant (classic: 14s, quick: 10s)
    #[clap(long, global = true, value_enum)]
    variant: Option<Variant>,

    /// number of seconds a session lasts, overrides the variant
    #[clap(short = 's', long, global = true, value_parser = parse_playtime)]
    playtime: Option<f64>,

    /// file holding the high score
    #[clap(long, global = true)]
    highscore_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// play a session (default)
    Play,
    /// inspect or edit the stored high score
    Highscore {
        #[clap(subcommand)]
        action: HighscoreAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum HighscoreAction {
    /// print the stored high score
    Show,
    /// overwrite the stored high score
    Set { value: u64 },
    /// set the stored high score back to 0
    Reset,
}

fn parse_playtime(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err("playtime must be a positive number of seconds".to_string())
    }
}

impl Cli {
    /// Flags win over saved preferences, which win over variant defaults.
    fn merge(&self, saved: Config) -> Config {
        Config {
            variant: self.variant.unwrap_or(saved.variant),
            playtime_secs: self.playtime.or(if self.variant.is_some() {
                None
            } else {
                saved.playtime_secs
            }),
            highscore_file: self.highscore_file.clone().or(saved.highscore_file),
        }
    }
}

fn highscore_store(cfg: &Config) -> FileHighScoreStore {
    match &cfg.highscore_file {
        Some(path) => FileHighScoreStore::with_path(path),
        None => FileHighScoreStore::new(),
    }
}

fn init_logging(to_file: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Warn).parse_default_env();

    if to_file {
        // the game owns the terminal, so log lines go to a file
        let path = AppDirs::log_path();
        let opened = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));
        match opened {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                // still on the normal screen, so the player sees this
                eprintln!("vale: logging disabled, cannot open {}: {e}", path.display());
                return;
            }
        }
    }

    let _ = builder.try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Play);
    init_logging(matches!(command, Command::Play));

    let prefs = FileConfigStore::new();
    let cfg = cli.merge(prefs.load());
    let store = highscore_store(&cfg);

    match command {
        Command::Highscore { action } => run_highscore(action, &store),
        Command::Play => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            if let Err(e) = prefs.save(&cfg) {
                log::warn!("could not save preferences to {}: {e}", prefs.path().display());
            }
            play(cfg.session_config(), Arc::new(store))
        }
    }
}

fn run_highscore(action: HighscoreAction, store: &FileHighScoreStore) -> Result<(), Box<dyn Error>> {
    match action {
        HighscoreAction::Show => {
            println!("Highscore: {}", store.load()?);
        }
        HighscoreAction::Set { value } => {
            store.save(value)?;
            println!("Highscore changed: {value}");
        }
        HighscoreAction::Reset => {
            store.save(0)?;
            println!("Highscore changed: 0");
        }
    }
    Ok(())
}

fn play(session: SessionConfig, store: Arc<dyn HighScoreStore>) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let tx = events.sender();
    let result = SessionController::new(session, store, move |event: SessionEvent| {
        let _ = tx.send(ValeEvent::Session(event));
    })
    .map_err(Box::<dyn Error>::from)
    .and_then(|controller| {
        let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));
        app::run(&mut terminal, &controller, &runner).map_err(Box::<dyn Error>::from)
    });

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vale").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn default_command_is_play() {
        assert!(cli(&[]).command.is_none());
        assert!(matches!(cli(&["play"]).command, Some(Command::Play)));
    }

    #[test]
    fn highscore_subcommands_parse() {
        assert!(matches!(
            cli(&["highscore", "set", "42"]).command,
            Some(Command::Highscore {
                action: HighscoreAction::Set { value: 42 }
            })
        ));
        assert!(matches!(
            cli(&["highscore", "show"]).command,
            Some(Command::Highscore {
                action: HighscoreAction::Show
            })
        ));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let c = cli(&["play", "--variant", "quick", "-s", "20"]);
        assert_eq!(c.variant, Some(Variant::Quick));
        assert_eq!(c.playtime, Some(20.0));
    }

    #[test]
    fn playtime_must_be_positive() {
        let args = ["vale", "--playtime", "0"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["vale", "--playtime", "soon"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn negative_highscore_is_rejected() {
        let args = ["vale", "highscore", "set", "-1"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn flags_override_saved_preferences() {
        let saved = Config {
            variant: Variant::Quick,
            playtime_secs: Some(25.0),
            highscore_file: Some(PathBuf::from("saved.cfg")),
        };

        let merged = cli(&[]).merge(saved.clone());
        assert_eq!(merged, saved);

        let merged = cli(&["--highscore-file", "flag.cfg", "-s", "12"]).merge(saved.clone());
        assert_eq!(merged.playtime_secs, Some(12.0));
        assert_eq!(merged.highscore_file, Some(PathBuf::from("flag.cfg")));

        // picking a variant drops the saved playtime override
        let merged = cli(&["--variant", "classic"]).merge(saved);
        assert_eq!(merged.variant, Variant::Classic);
        assert_eq!(merged.playtime_secs, None);
        assert_eq!(merged.session_config().playtime_secs, 14.0);
    }
}
