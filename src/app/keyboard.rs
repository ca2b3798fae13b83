use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{App, FocusArea, NoticeKind};

impl App {
    /// The main entry point for handling keyboard events.
    ///
    /// Global shortcuts win; everything else goes to the focused area.
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.handle_global_shortcuts(key).await {
            return;
        }
        match self.focus {
            FocusArea::Composer => self.handle_composer_key(key).await,
            FocusArea::Models => self.handle_models_key(key).await,
        }
    }

    /// Returns `true` if a shortcut was handled.
    async fn handle_global_shortcuts(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('n') if ctrl => self.start_new_conversation().await,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = self.focus.toggle();
                if self.focus == FocusArea::Models {
                    self.model_cursor = self
                        .session
                        .models()
                        .iter()
                        .position(|model| model == self.session.selected_model())
                        .unwrap_or(0);
                }
                self.set_status(NoticeKind::Info, format!("Focus: {}", self.focus.label()));
            }
            KeyCode::Esc if self.is_thinking() => {
                self.cancel_turn();
            }
            KeyCode::Char('c') if ctrl && self.is_thinking() => {
                self.cancel_turn();
            }
            KeyCode::PageUp => self.session.transcript_mut().move_selection(-5),
            KeyCode::PageDown => self.session.transcript_mut().move_selection(5),
            _ => return false,
        }
        true
    }

    async fn handle_composer_key(&mut self, key: KeyEvent) {
        let modifiers = key.modifiers;
        match key.code {
            KeyCode::Enter => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.composer.insert_newline();
                } else {
                    self.submit_prompt().await;
                }
            }
            KeyCode::Backspace => self.composer.backspace(),
            KeyCode::Delete => self.composer.delete(),
            KeyCode::Left => self.composer.move_left(),
            KeyCode::Right => self.composer.move_right(),
            KeyCode::Home => self.composer.move_to_line_start(),
            KeyCode::End => self.composer.move_to_line_end(),
            KeyCode::Esc => {
                self.composer.clear();
                self.set_status(NoticeKind::Info, "Input cleared");
            }
            KeyCode::Up => self.handle_history_navigation(key, -1),
            KeyCode::Down => self.handle_history_navigation(key, 1),
            KeyCode::Char(ch) => {
                if !modifiers.contains(KeyModifiers::CONTROL)
                    && !modifiers.contains(KeyModifiers::ALT)
                {
                    self.composer.insert_char(ch);
                }
            }
            _ => {}
        }
    }

    /// Ctrl+Up/Down scrolls the transcript; plain arrows recall sent messages
    /// while the composer is empty or showing a recalled one.
    fn handle_history_navigation(&mut self, key: KeyEvent, delta: isize) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            self.session.transcript_mut().move_selection(delta);
            return;
        }
        if !self.composer.is_empty() && !self.composer.is_recalling() {
            self.session.transcript_mut().move_selection(delta);
            return;
        }
        if delta < 0 {
            self.composer.history_previous();
        } else {
            self.composer.history_next();
        }
    }

    async fn handle_models_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.move_model_cursor(-1),
            KeyCode::Down => self.move_model_cursor(1),
            KeyCode::Home => self.model_cursor = 0,
            KeyCode::End => self.model_cursor = self.session.models().len().saturating_sub(1),
            KeyCode::Enter => self.select_highlighted_model().await,
            KeyCode::Esc => self.focus = FocusArea::Composer,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::KeyEventState;

    use super::*;
    use crate::agent::ChatSession;
    use crate::agent::testing::{FakeBuilder, FakeProbe};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app(probe: &FakeProbe) -> App {
        let session = ChatSession::new(
            "browser_mcp.json",
            vec!["qwen-qwq-32b".into(), "llama3-8b-8192".into()],
        );
        App::new(session, Arc::new(FakeBuilder::new(probe.clone())))
    }

    #[tokio::test]
    async fn ctrl_q_quits() {
        let mut app = app(&FakeProbe::default());
        app.handle_key(key(KeyCode::Char('q'), KeyModifiers::CONTROL)).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn typing_and_shift_enter_build_a_multiline_message() {
        let mut app = app(&FakeProbe::default());
        app.handle_key(key(KeyCode::Char('a'), KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Enter, KeyModifiers::SHIFT)).await;
        app.handle_key(key(KeyCode::Char('b'), KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Char('x'), KeyModifiers::CONTROL)).await;
        assert_eq!(app.composer.buffer(), "a\nb");
    }

    #[tokio::test]
    async fn release_events_are_ignored() {
        let mut app = app(&FakeProbe::default());
        let mut release = key(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        app.handle_key(release).await;
        assert!(app.composer.is_empty());
    }

    #[tokio::test]
    async fn tab_then_enter_selects_a_model() {
        let probe = FakeProbe::default();
        let mut app = app(&probe);
        app.handle_key(key(KeyCode::Tab, KeyModifiers::NONE)).await;
        assert_eq!(app.focus, FocusArea::Models);
        assert_eq!(app.model_cursor, 0);
        app.handle_key(key(KeyCode::Down, KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Enter, KeyModifiers::NONE)).await;
        assert_eq!(app.session.selected_model(), "llama3-8b-8192");
        assert_eq!(app.focus, FocusArea::Composer);
    }

    #[tokio::test]
    async fn enter_sends_and_ctrl_n_resets() {
        let probe = FakeProbe::default();
        let mut app = app(&probe);
        app.handle_key(key(KeyCode::Char('h'), KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Enter, KeyModifiers::NONE)).await;
        assert!(app.is_thinking());
        assert_eq!(app.session.transcript().len(), 1);

        app.handle_key(key(KeyCode::Char('n'), KeyModifiers::CONTROL)).await;
        assert!(!app.is_thinking());
        assert!(app.session.transcript().is_empty());
        assert_eq!(probe.clear_calls(), 1);
    }

    #[tokio::test]
    async fn up_recalls_the_last_message() {
        let mut app = app(&FakeProbe::default());
        app.handle_key(key(KeyCode::Char('h'), KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Enter, KeyModifiers::NONE)).await;
        app.handle_key(key(KeyCode::Up, KeyModifiers::NONE)).await;
        assert_eq!(app.composer.buffer(), "h");
    }
}
