//! Core state of the chat shell.
//!
//! `App` is the single owner of the `ChatSession`. Turns run on spawned tasks
//! and report back through `TurnEvent`s drained on each tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::{FocusArea, NoticeKind};
use crate::agent::{AgentBuilder, ChatSession, TurnError};

/// The main application state.
pub struct App {
    // --- Core State ---
    /// Flag to indicate if the application should quit.
    pub should_quit: bool,
    pub focus: FocusArea,
    /// Transcript, selected model and agent handles.
    pub session: ChatSession,
    pub composer: ChatComposer,
    /// Highlighted row of the sidebar model list.
    pub model_cursor: usize,

    // --- UI ---
    /// The message currently displayed in the status bar.
    pub status_message: String,
    pub status_kind: NoticeKind,
    /// Set while the agent should be (re)built before the next event.
    pub(crate) initialization_pending: bool,
    pub(crate) tick_rate: Duration,

    // --- Agent ---
    pub(crate) builder: Arc<dyn AgentBuilder>,
    pub(crate) active_turn: Option<ActiveTurn>,
    pub(crate) events_tx: mpsc::UnboundedSender<TurnEvent>,
    pub(crate) events_rx: mpsc::UnboundedReceiver<TurnEvent>,
}

/// Reported by a background turn when it ends.
#[derive(Debug)]
pub enum TurnEvent {
    Finished {
        id: u64,
        outcome: Result<String, TurnError>,
    },
}

/// The turn currently running in the background.
pub(crate) struct ActiveTurn {
    pub id: u64,
    /// Taken once the cancel signal has been sent.
    pub cancel: Option<oneshot::Sender<()>>,
}

impl App {
    pub fn is_thinking(&self) -> bool {
        self.active_turn.is_some()
    }

    pub(crate) fn set_status(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.status_kind = kind;
        self.status_message = message.into();
    }
}

/// State for the message composer.
///
/// Manages the text buffer, cursor position, and sent-message history.
#[derive(Clone, Default)]
pub struct ChatComposer {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
}

impl ChatComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Inserts a character at the current cursor position.
    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.reset_history_navigation();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    /// Deletes the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.buffer.drain(idx..self.cursor);
            self.cursor = idx;
            self.reset_history_navigation();
        }
    }

    /// Deletes the character at the cursor.
    pub fn delete(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            let end = self.cursor + ch.len_utf8();
            self.buffer.drain(self.cursor..end);
            self.reset_history_navigation();
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
        self.reset_history_navigation();
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
        self.reset_history_navigation();
    }

    pub fn move_to_line_start(&mut self) {
        self.cursor = self.buffer[..self.cursor]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        self.reset_history_navigation();
    }

    pub fn move_to_line_end(&mut self) {
        self.cursor = self.buffer[self.cursor..]
            .find('\n')
            .map(|pos| self.cursor + pos)
            .unwrap_or(self.buffer.len());
        self.reset_history_navigation();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.reset_history_navigation();
    }

    /// Takes the content of the buffer, adds it to history, and clears the buffer.
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.buffer);
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.cursor = 0;
        self.reset_history_navigation();
        content
    }

    /// Recalls the previous sent message.
    pub fn history_previous(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let target = match self.history_index {
            Some(idx) => idx.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.load_history(target)
    }

    /// Moves forward through history; past the newest entry the buffer empties.
    pub fn history_next(&mut self) -> bool {
        match self.history_index {
            Some(idx) if idx + 1 < self.history.len() => self.load_history(idx + 1),
            Some(_) => {
                self.history_index = None;
                self.buffer.clear();
                self.cursor = 0;
                true
            }
            None => false,
        }
    }

    /// True while the buffer shows a recalled history entry.
    pub fn is_recalling(&self) -> bool {
        self.history_index.is_some()
    }

    fn load_history(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.get(index).cloned() else {
            return false;
        };
        self.buffer = entry;
        self.cursor = self.buffer.len();
        self.history_index = Some(index);
        true
    }

    fn reset_history_navigation(&mut self) {
        self.history_index = None;
    }

    /// Calculates the (col, row) position of the cursor for rendering.
    pub fn cursor_display_position(&self, width: usize) -> (u16, u16) {
        if width == 0 {
            return (0, 0);
        }
        let mut col = 0usize;
        let mut row = 0usize;
        for ch in self.buffer[..self.cursor].chars() {
            if ch == '\n' {
                row += 1;
                col = 0;
                continue;
            }
            let char_width = unicode_width::UnicodeWidthChar::width(ch)
                .unwrap_or(1)
                .max(1);
            if col + char_width > width {
                row += 1;
                col = 0;
            }
            col += char_width;
            if col >= width {
                row += 1;
                col = 0;
            }
        }
        (col as u16, row as u16)
    }
}
