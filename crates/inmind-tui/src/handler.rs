use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::input::InputAction;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work whatever the session state
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('r') if ctrl => {
            app.retry_start();
            return;
        }
        KeyCode::Up => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down => {
            app.scroll_down(1);
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::Char('g') if ctrl => {
            app.scroll_to_bottom();
            return;
        }
        _ => {}
    }

    let enabled = app.input_enabled();
    if let InputAction::Submit(text) = app.input.handle_key(key, enabled) {
        app.submit(&text);
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
