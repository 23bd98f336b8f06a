//! Chat input box: keystrokes in, submitted text out.
//!
//! The buffer knows nothing about the conversation beyond an `enabled`
//! flag. It never clears itself on submit; the caller clears it once the
//! session has accepted the text.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Ignored,
    Edited,
    Submit(String),
}

#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
    /// Cursor position in chars, not bytes
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Cursor as (line, column), both in chars.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|l| l.chars().count())
            .unwrap_or(0);
        (line, col)
    }

    /// The trimmed text, if there is anything to submit. The buffer is left
    /// as is until the caller clears it.
    pub fn take_submission(&self, enabled: bool) -> Option<String> {
        let trimmed = self.text.trim();
        if !enabled || trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    pub fn handle_key(&mut self, key: KeyEvent, enabled: bool) -> InputAction {
        if !enabled {
            return InputAction::Ignored;
        }

        match key.code {
            KeyCode::Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.insert('\n');
                InputAction::Edited
            }
            KeyCode::Enter => match self.take_submission(enabled) {
                Some(text) => InputAction::Submit(text),
                None => InputAction::Ignored,
            },
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let byte_pos = char_to_byte_index(&self.text, self.cursor);
                    self.text.remove(byte_pos);
                    InputAction::Edited
                } else {
                    InputAction::Ignored
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.text.chars().count() {
                    let byte_pos = char_to_byte_index(&self.text, self.cursor);
                    self.text.remove(byte_pos);
                    InputAction::Edited
                } else {
                    InputAction::Ignored
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::Edited
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.text.chars().count());
                InputAction::Edited
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::Edited
            }
            KeyCode::End => {
                self.cursor = self.text.chars().count();
                InputAction::Edited
            }
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert(c);
                InputAction::Edited
            }
            _ => InputAction::Ignored,
        }
    }

    fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut InputBuffer, text: &str) {
        for c in text.chars() {
            input.handle_key(key(KeyCode::Char(c)), true);
        }
    }

    #[test]
    fn test_enter_submits_trimmed_text_without_clearing() {
        let mut input = InputBuffer::new();
        type_text(&mut input, "  running shoes  ");

        let action = input.handle_key(key(KeyCode::Enter), true);
        assert_eq!(action, InputAction::Submit("running shoes".to_string()));
        assert_eq!(input.text(), "  running shoes  ");

        input.clear();
        assert!(input.is_empty());
        assert_eq!(input.cursor_line_col(), (0, 0));
    }

    #[test]
    fn test_blank_text_is_not_submitted() {
        let mut input = InputBuffer::new();
        assert_eq!(input.handle_key(key(KeyCode::Enter), true), InputAction::Ignored);

        type_text(&mut input, "   ");
        assert_eq!(input.handle_key(key(KeyCode::Enter), true), InputAction::Ignored);
    }

    #[test]
    fn test_modified_enter_inserts_line_break() {
        let mut input = InputBuffer::new();
        type_text(&mut input, "line one");
        let action = input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT), true);
        assert_eq!(action, InputAction::Edited);
        input.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), true);
        type_text(&mut input, "two");

        assert_eq!(input.text(), "line one\n\ntwo");
        assert_eq!(input.cursor_line_col(), (2, 3));
    }

    #[test]
    fn test_disabled_input_rejects_everything() {
        let mut input = InputBuffer::new();
        type_text(&mut input, "hello");

        assert_eq!(input.handle_key(key(KeyCode::Char('x')), false), InputAction::Ignored);
        assert_eq!(input.handle_key(key(KeyCode::Enter), false), InputAction::Ignored);
        assert_eq!(input.text(), "hello");
        assert_eq!(input.take_submission(false), None);
    }

    #[test]
    fn test_take_submission_trims_and_keeps_buffer() {
        let mut input = InputBuffer::new();
        type_text(&mut input, "  running shoes  ");

        assert_eq!(input.take_submission(true).as_deref(), Some("running shoes"));
        assert_eq!(input.text(), "  running shoes  ");

        input.clear();
        type_text(&mut input, "   ");
        assert_eq!(input.take_submission(true), None);
    }

    #[test]
    fn test_cursor_editing_is_utf8_safe() {
        let mut input = InputBuffer::new();
        type_text(&mut input, "café");
        input.handle_key(key(KeyCode::Left), true);
        input.handle_key(key(KeyCode::Backspace), true);
        assert_eq!(input.text(), "caé");

        input.handle_key(key(KeyCode::Home), true);
        input.handle_key(key(KeyCode::Delete), true);
        assert_eq!(input.text(), "aé");

        input.handle_key(key(KeyCode::End), true);
        type_text(&mut input, "ñ");
        assert_eq!(input.text(), "aéñ");
        assert_eq!(input.cursor_line_col(), (0, 3));
    }

    #[test]
    fn test_control_chords_are_not_typed() {
        let mut input = InputBuffer::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let action = input.handle_key(ctrl_c, true);
        assert_eq!(action, InputAction::Ignored);
        assert!(input.is_empty());
    }
}
