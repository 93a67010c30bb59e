use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::error::{SessionError, StorageError};
use crate::highscore::HighScoreStore;
use crate::runtime::{Clock, SystemClock, Wait};
use crate::session::{
    DifficultyTier, SessionConfig, SessionEvent, SessionOutcome, SessionSnapshot, SessionState,
};

/// Receiver of session events.
///
/// Events are delivered while the session lock is held, so a sink must not
/// call back into the controller; forward to a queue instead.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: SessionEvent);
}

impl<F> EventSink for F
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    fn emit(&self, event: SessionEvent) {
        self(event)
    }
}

struct Inner {
    state: SessionState,
    last_outcome: Option<SessionOutcome>,
    /// Bumped on every start; a countdown only acts for its own generation.
    generation: u64,
    /// Dropping this sender cancels the live countdown.
    cancel: Option<Sender<()>>,
    rng: StdRng,
    ticks: u64,
}

struct Shared {
    config: SessionConfig,
    inner: Mutex<Inner>,
    store: Arc<dyn HighScoreStore>,
    sink: Box<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        self.sink.emit(event);
    }

    /// Ends the running session: cancel, persist, then notify.
    fn finish(&self, inner: &mut Inner, outcome: SessionOutcome) -> Result<(), StorageError> {
        inner.state.running = false;
        inner.cancel = None;
        inner.last_outcome = Some(outcome);

        let score = inner.state.score;
        let high_score = inner.state.high_score;
        log::info!("session {outcome:?} with score {score} (record {high_score})");
        let saved = self.store.save(high_score);

        self.emit(SessionEvent::SessionEnded {
            outcome,
            score,
            high_score,
        });
        self.emit(SessionEvent::PlayStateChanged { playing: false });
        saved
    }
}

/// Loads the stored record, falling back to 0 when it cannot be read.
pub fn load_high_score(store: &dyn HighScoreStore) -> u64 {
    match store.load() {
        Ok(value) => value,
        Err(StorageError::Missing { path }) => {
            log::info!("no high score at {}, starting from 0", path.display());
            0
        }
        Err(e) => {
            log::warn!("{e}; starting from 0");
            0
        }
    }
}

/// Owns the session state and runs the countdown on its own thread.
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new<S: EventSink>(
        config: SessionConfig,
        store: Arc<dyn HighScoreStore>,
        sink: S,
    ) -> Result<Self, SessionError> {
        Self::with_clock(config, store, sink, SystemClock)
    }

    pub fn with_clock<S: EventSink, C: Clock>(
        config: SessionConfig,
        store: Arc<dyn HighScoreStore>,
        sink: S,
        clock: C,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let high_score = load_high_score(store.as_ref());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let inner = Inner {
            state: SessionState::idle(&config, high_score),
            last_outcome: None,
            generation: 0,
            cancel: None,
            rng,
            ticks: 0,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(inner),
                store,
                sink: Box::new(sink),
                clock: Arc::new(clock),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Starts a new session. A session that is still running is stopped
    /// first, exactly as if `stop` had been called.
    pub fn start(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.state.running {
            log::debug!("start while running, stopping the previous session");
            if let Err(e) = shared.finish(&mut inner, SessionOutcome::Stopped) {
                log::error!("could not persist high score of the replaced session: {e}");
            }
        }

        inner.generation += 1;
        let generation = inner.generation;
        let Inner { state, rng, .. } = &mut *inner;
        *state = SessionState::fresh(&shared.config, state.high_score, rng);
        inner.last_outcome = None;

        let (cancel_tx, cancel_rx) = mpsc::channel();
        inner.cancel = Some(cancel_tx);

        let state = &inner.state;
        log::info!("session started ({}s)", state.playtime_secs);
        shared.emit(SessionEvent::PlayStateChanged { playing: true });
        shared.emit(SessionEvent::ScoreChanged {
            score: state.score,
            high_score: state.high_score,
        });
        shared.emit(SessionEvent::TimerChanged(state.whole_seconds_remaining()));
        shared.emit(SessionEvent::AvatarScaleChanged {
            shrunk: state.shrunk,
        });
        shared.emit(SessionEvent::PositionChanged(state.position));

        let countdown = Arc::clone(shared);
        thread::spawn(move || run_countdown(countdown, generation, cancel_rx));
        Ok(())
    }

    pub fn register_hit(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        if !inner.state.running {
            return Err(SessionError::NotRunning);
        }

        let Inner { state, rng, .. } = &mut *inner;
        if state.register_hit(rng) {
            log::debug!("new record {}", state.high_score);
        }
        self.shared.emit(SessionEvent::ScoreChanged {
            score: state.score,
            high_score: state.high_score,
        });
        self.shared.emit(SessionEvent::PositionChanged(state.position));
        Ok(())
    }

    /// Stops the running session and persists the high score before
    /// returning. Does nothing when idle.
    pub fn stop(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        if !inner.state.running {
            return Ok(());
        }
        self.shared.finish(&mut inner, SessionOutcome::Stopped)?;
        Ok(())
    }

    pub fn current_state(&self) -> SessionSnapshot {
        let inner = self.shared.lock();
        SessionSnapshot {
            state: inner.state.clone(),
            last_outcome: inner.last_outcome,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().state.running
    }

    /// Countdown steps applied over the controller's lifetime.
    pub fn ticks(&self) -> u64 {
        self.shared.lock().ticks
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if inner.state.running {
            log::debug!("controller dropped with a running session, stopping it");
            if let Err(e) = self.shared.finish(&mut inner, SessionOutcome::Stopped) {
                log::error!("could not persist high score on shutdown: {e}");
            }
        }
    }
}

fn run_countdown(shared: Arc<Shared>, generation: u64, cancel: Receiver<()>) {
    loop {
        let delay = {
            let inner = shared.lock();
            if inner.generation != generation || !inner.state.running {
                return;
            }
            inner.state.tick_secs
        };

        if shared.clock.wait(Duration::from_secs_f64(delay), &cancel) == Wait::Cancelled {
            return;
        }

        let mut inner = shared.lock();
        // a stop may have landed between the wait and the lock
        if inner.generation != generation || !inner.state.running {
            return;
        }

        let Inner { state, rng, .. } = &mut *inner;
        let report = state.tick(rng);

        if report.became_hard {
            log::debug!("hard tier at {}s", state.remaining_secs);
            shared.emit(SessionEvent::DifficultyChanged(DifficultyTier::Hard));
        }
        if report.sped_up {
            log::debug!("speed up at {}s, tick now {}s", state.remaining_secs, state.tick_secs);
            shared.emit(SessionEvent::SpeedUp);
        }
        if report.repositioned {
            shared.emit(SessionEvent::PositionChanged(state.position));
        }
        shared.emit(SessionEvent::TimerChanged(state.whole_seconds_remaining()));
        shared.emit(SessionEvent::AvatarScaleChanged {
            shrunk: state.shrunk,
        });
        inner.ticks += 1;

        if report.expired {
            if let Err(e) = shared.finish(&mut inner, SessionOutcome::Expired) {
                log::error!("could not persist high score: {e}");
            }
            return;
        }
    }
}
