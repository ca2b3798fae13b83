use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;

use super::{App, ChatComposer, FocusArea, NoticeKind};
use crate::agent::{AgentBuilder, ChatSession};

impl App {
    /// Creates the shell state around `session`.
    ///
    /// The agent is not built here: the first loop iteration draws the
    /// screen, then runs the pending initialization.
    pub fn new(session: ChatSession, builder: Arc<dyn AgentBuilder>) -> Self {
        debug!(
            "Initializing App with {} models from {}",
            session.models().len(),
            session.config_path().display()
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            should_quit: false,
            focus: FocusArea::Composer,
            session,
            composer: ChatComposer::new(),
            model_cursor: 0,
            status_message: String::from("Enter to send, Tab to pick a model, Ctrl+Q to quit"),
            status_kind: NoticeKind::Info,
            initialization_pending: true,
            tick_rate: Duration::from_millis(100),
            builder,
            active_turn: None,
            events_tx,
            events_rx,
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }
}
