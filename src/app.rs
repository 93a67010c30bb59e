use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::{backend::Backend, Terminal};
use std::io;

use crate::controller::SessionController;
use crate::error::SessionError;
use crate::runtime::{Runner, Ticker, ValeEvent, ValeEventSource};
use crate::ui::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Toggle,
    Quit,
}

pub fn key_action(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Action::Toggle),
        _ => None,
    }
}

fn log_failure(result: Result<(), SessionError>) {
    match result {
        Ok(()) | Err(SessionError::NotRunning) => {}
        Err(e) => log::error!("{e}"),
    }
}

/// Space starts or stops a session. A press while the view still shows a
/// session that has since ended was meant as a stop, so it starts nothing.
fn toggle(controller: &SessionController, view: &View) -> Result<(), SessionError> {
    if controller.is_running() {
        controller.stop()
    } else if view.playing {
        log::debug!("toggle after the session ended, ignoring");
        Ok(())
    } else {
        controller.start()
    }
}

/// Drives the game until the player quits. The view is only ever updated
/// from session events arriving through `runner`.
pub fn run<B: Backend, E: ValeEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    controller: &SessionController,
    runner: &Runner<E, T>,
) -> io::Result<()> {
    let mut view = View::new(&controller.current_state(), controller.config());

    loop {
        let area = terminal.draw(|f| f.render_widget(&view, f.area()))?.area;

        match runner.step() {
            ValeEvent::Tick | ValeEvent::Resize => {}
            ValeEvent::Session(event) => view.apply(&event),
            ValeEvent::Key(key) => match key_action(key) {
                Some(Action::Toggle) => log_failure(toggle(controller, &view)),
                Some(Action::Quit) => {
                    log_failure(controller.stop());
                    break;
                }
                None => {}
            },
            ValeEvent::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left)
                    && view.hits_avatar(area, mouse.column, mouse.row)
                {
                    // the session may have expired since the last redraw
                    log_failure(controller.register_hit());
                }
            }
        }
    }

    Ok(())
}
