use crossterm::event::{MouseEvent, MouseEventKind};

use super::App;

impl App {
    /// The wheel scrolls the transcript; other mouse input is ignored.
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => self.session.transcript_mut().move_selection(-1),
            MouseEventKind::ScrollDown => self.session.transcript_mut().move_selection(1),
            _ => {}
        }
    }
}
