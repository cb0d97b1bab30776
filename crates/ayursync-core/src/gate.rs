//! Typed-phrase confirmation for the deep reset
//!
//! The destructive action only becomes available once the user has typed the
//! confirmation phrase. Matching trims surrounding whitespace and ignores case.

use crate::errors::GateError;

/// Phrase the user must type to arm the confirm control
pub const CONFIRMATION_PHRASE: &str = "RESET ALL";

/// Confirm button label while idle
pub const CONFIRM_LABEL: &str = "Start Deep Reset";
/// Confirm button label while the start request is in flight
pub const STARTING_LABEL: &str = "Starting...";

/// Whether `input` matches [`CONFIRMATION_PHRASE`] after normalization
pub fn phrase_matches(input: &str) -> bool {
    input.trim().to_uppercase() == CONFIRMATION_PHRASE
}

// ----------------------------------------------------------------------------
// Confirmation Gate
// ----------------------------------------------------------------------------

/// Input state of an open confirmation dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationGate {
    input: String,
    /// Cursor position in chars, not bytes
    cursor: usize,
    busy: bool,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Enabled iff the phrase matches and no start request is pending
    pub fn is_confirm_enabled(&self) -> bool {
        !self.busy && phrase_matches(&self.input)
    }

    pub fn confirm_label(&self) -> &'static str {
        if self.busy {
            STARTING_LABEL
        } else {
            CONFIRM_LABEL
        }
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        if self.busy {
            return;
        }
        self.input = input.into();
        self.cursor = self.input.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        if self.busy {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.busy || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
    }

    pub fn delete(&mut self) {
        if self.busy || self.cursor >= self.input.chars().count() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear(&mut self) {
        self.set_input(String::new());
    }

    /// Enter the "starting" sub-state
    ///
    /// Refused while a request is already pending or the phrase does not match.
    pub fn begin_confirm(&mut self) -> Result<(), GateError> {
        if self.busy {
            return Err(GateError::Busy);
        }
        if !phrase_matches(&self.input) {
            return Err(GateError::PhraseMismatch);
        }
        self.busy = true;
        Ok(())
    }

    /// Return to the enabled state after a failed start, keeping the phrase
    pub fn start_failed(&mut self) {
        self.busy = false;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
