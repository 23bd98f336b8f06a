use inmind_core::{SessionController, SessionPhase};
use tracing::debug;

use crate::input::InputBuffer;

pub struct App {
    pub should_quit: bool,
    pub session: SessionController,
    pub input: InputBuffer,
    pub api_url: String,

    // Chat scroll state, updated during render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    /// Keep the newest message in view until the user scrolls up
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: SessionController, api_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            session,
            input: InputBuffer::new(),
            api_url: api_url.into(),
            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_tail: true,
            animation_frame: 0,
        }
    }

    /// Kick off the conversation. Called once when the chat screen opens.
    pub fn activate(&mut self) {
        self.session.start();
    }

    /// Restart the conversation after a failed start. No-op otherwise.
    pub fn retry_start(&mut self) {
        if self.session.phase() == SessionPhase::Failed {
            debug!("retrying conversation start");
            self.session.start();
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.session.input_enabled()
    }

    /// Hand the input text to the session; the box is cleared only if it was accepted.
    pub fn submit(&mut self, text: &str) {
        if self.session.submit(text) {
            self.input.clear();
            self.follow_tail = true;
        }
    }

    /// Apply any finished backend request. Returns whether the session changed.
    pub fn poll_session(&mut self) -> bool {
        let changed = self.session.poll();
        if changed {
            self.follow_tail = true;
        }
        changed
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.max_scroll();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use inmind_core::ApiClient;

    use super::*;

    /// App wired to an address nothing listens on; the session is never started.
    pub(crate) fn idle_app() -> App {
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        let session = SessionController::new(Arc::new(client), "user-001");
        App::new(session, "http://127.0.0.1:9/api")
    }

    #[test]
    fn test_input_disabled_before_activation() {
        let app = idle_app();
        assert!(!app.input_enabled());
        assert_eq!(app.session.phase(), SessionPhase::Uninitialized);
    }

    #[test]
    fn test_rejected_submission_keeps_input() {
        let mut app = idle_app();
        let key = crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('x'));
        app.input.handle_key(key, true);

        app.submit("x");
        assert_eq!(app.input.text(), "x");
        assert!(app.session.messages().is_empty());
    }

    #[test]
    fn test_retry_is_ignored_unless_failed() {
        let mut app = idle_app();
        // Uninitialized is not Failed, so nothing is spawned (no runtime needed).
        app.retry_start();
        assert_eq!(app.session.phase(), SessionPhase::Uninitialized);
    }

    #[test]
    fn test_scrolling_clamps_and_tracks_tail() {
        let mut app = idle_app();
        app.chat_height = 10;
        app.chat_total_lines = 25;

        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 15);

        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 12);
        assert!(!app.follow_tail);

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 15);
        assert!(app.follow_tail);

        app.scroll_up(100);
        assert_eq!(app.chat_scroll, 0);
    }
}
