use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{backend::TestBackend, layout::Rect, Terminal};

use vale::runtime::{FixedTicker, ManualClock, Runner, TestEventSource, ValeEvent};
use vale::session::SessionOutcome;
use vale::ui::{playfield, View};
use vale::{HighScoreStore, MemoryHighScoreStore, SessionConfig, SessionController, SessionEvent};

// Headless integration using the app loop + TestBackend without a TTY.
// Session events and synthetic input share one queue, as in the real binary.

fn key(c: char) -> ValeEvent {
    ValeEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn click(column: u16, row: u16) -> ValeEvent {
    ValeEvent::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000u32 {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not reached");
}

#[test]
fn headless_play_hit_and_quit() {
    let store = Arc::new(MemoryHighScoreStore::with_value(0));
    let (tx, rx) = mpsc::channel();
    let session_tx = tx.clone();
    let controller = SessionController::with_clock(
        SessionConfig::new(10.0).with_seed(21),
        store.clone(),
        move |event: SessionEvent| {
            let _ = session_tx.send(ValeEvent::Session(event));
        },
        ManualClock::new(),
    )
    .unwrap();

    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    thread::scope(|s| {
        let (term, ctrl) = (&mut terminal, &controller);
        // the runner owns a receiver, so it moves into the app thread
        let app = s.spawn(move || vale::app::run(term, ctrl, &runner));

        tx.send(key(' ')).unwrap();
        wait_for(|| controller.is_running());

        // aim where the view will draw the avatar
        let view = View::new(&controller.current_state(), controller.config());
        let avatar = view.avatar_rect(playfield(Rect::new(0, 0, 80, 24)));
        tx.send(click(0, 0)).unwrap();
        tx.send(click(avatar.x, avatar.y)).unwrap();
        wait_for(|| controller.current_state().state.score == 1);

        tx.send(key('q')).unwrap();
        app.join().unwrap().unwrap();
    });

    let snapshot = controller.current_state();
    assert!(!controller.is_running());
    assert_eq!(snapshot.last_outcome, Some(SessionOutcome::Stopped));
    assert_eq!(snapshot.state.score, 1);
    assert_eq!(store.load().unwrap(), 1);

    let content: String = terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|c| c.symbol())
        .collect();
    assert!(content.contains("Score: 1 / Record: 1"));
}

#[test]
fn headless_toggle_stops_a_running_session() {
    let store = Arc::new(MemoryHighScoreStore::with_value(5));
    let (tx, rx) = mpsc::channel();
    let session_tx = tx.clone();
    let controller = SessionController::with_clock(
        SessionConfig::new(10.0),
        store.clone(),
        move |event: SessionEvent| {
            let _ = session_tx.send(ValeEvent::Session(event));
        },
        ManualClock::new(),
    )
    .unwrap();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    tx.send(key(' ')).unwrap();
    tx.send(key(' ')).unwrap();
    tx.send(key('q')).unwrap();
    vale::app::run(&mut terminal, &controller, &runner).unwrap();

    assert_eq!(
        controller.current_state().last_outcome,
        Some(SessionOutcome::Stopped)
    );
    assert_eq!(store.load().unwrap(), 5);
}
