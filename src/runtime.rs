use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent};

use crate::session::SessionEvent;

/// Result of a countdown wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Cancelled,
}

/// Time source for the countdown activity.
///
/// `cancel` is the session's cancellation channel: a message or a dropped
/// sender means the session is over and the wait must return `Cancelled`.
pub trait Clock: Send + Sync + 'static {
    fn wait(&self, delay: Duration, cancel: &Receiver<()>) -> Wait;
}

/// Wall-clock time; a stop wakes the countdown immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wait(&self, delay: Duration, cancel: &Receiver<()>) -> Wait {
        match cancel.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => Wait::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Wait::Cancelled,
        }
    }
}

fn is_cancelled(cancel: &Receiver<()>) -> bool {
    !matches!(cancel.try_recv(), Err(TryRecvError::Empty))
}

/// Simulated time: every wait elapses at once and is added to a running total.
#[derive(Clone, Debug, Default)]
pub struct SimulatedClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total simulated time handed out so far.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Clock for SimulatedClock {
    fn wait(&self, delay: Duration, cancel: &Receiver<()>) -> Wait {
        if is_cancelled(cancel) {
            return Wait::Cancelled;
        }
        *self.elapsed.lock().unwrap_or_else(|p| p.into_inner()) += delay;
        Wait::Elapsed
    }
}

/// Clock stepped by hand: each wait blocks until `advance` releases it.
#[derive(Clone)]
pub struct ManualClock {
    permits_tx: Sender<()>,
    permits_rx: Arc<Mutex<Receiver<()>>>,
}

const MANUAL_POLL: Duration = Duration::from_millis(2);

impl ManualClock {
    pub fn new() -> Self {
        let (permits_tx, permits_rx) = mpsc::channel();
        Self {
            permits_tx,
            permits_rx: Arc::new(Mutex::new(permits_rx)),
        }
    }

    /// Lets exactly one pending or future wait elapse.
    pub fn advance(&self) {
        let _ = self.permits_tx.send(());
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn wait(&self, _delay: Duration, cancel: &Receiver<()>) -> Wait {
        loop {
            if is_cancelled(cancel) {
                return Wait::Cancelled;
            }
            let permit = self
                .permits_rx
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .recv_timeout(MANUAL_POLL);
            if permit.is_ok() {
                if is_cancelled(cancel) {
                    // hand the step to whichever countdown is still live
                    let _ = self.permits_tx.send(());
                    return Wait::Cancelled;
                }
                return Wait::Elapsed;
            }
        }
    }
}

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum ValeEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Session(SessionEvent),
    Tick,
}

/// Source of terminal and session events
pub trait ValeEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<ValeEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<ValeEvent>,
    rx: Receiver<ValeEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let input_tx = tx.clone();
        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => ValeEvent::Key(key),
                Ok(CtEvent::Mouse(mouse)) => ValeEvent::Mouse(mouse),
                Ok(CtEvent::Resize(_, _)) => ValeEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    log::error!("terminal input failed: {e}");
                    break;
                }
            };
            if input_tx.send(evt).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Sender for session events so they arrive on the same queue as input.
    pub fn sender(&self) -> Sender<ValeEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ValeEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ValeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<ValeEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<ValeEvent>) -> Self {
        Self { rx }
    }
}

impl ValeEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ValeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: ValeEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: ValeEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> ValeEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => ValeEvent::Tick,
        }
    }
}
