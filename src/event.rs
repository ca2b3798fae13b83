use crossterm::event::{KeyEvent, MouseEvent};

/// Events the main loop hands to `App`.
#[derive(Debug)]
pub enum Event {
    /// Sent at the app's tick rate; drains finished turns.
    Tick,
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The terminal was resized; only a redraw is needed.
    Resize,
}
