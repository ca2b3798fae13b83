use log::debug;
use tokio::sync::mpsc::error::TryRecvError;

use super::{App, NoticeKind, TurnEvent};

impl App {
    /// Called on every tick of the main loop. Drains the outcomes reported
    /// by background turns.
    pub(crate) fn on_tick(&mut self) {
        loop {
            let event = match self.events_rx.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                // The app keeps a sender itself.
                Err(TryRecvError::Disconnected) => break,
            };
            match event {
                TurnEvent::Finished { id, outcome } => self.finish_turn(id, outcome),
            }
        }
    }

    fn finish_turn(&mut self, id: u64, outcome: Result<String, crate::agent::TurnError>) {
        let current = self.active_turn.as_ref().is_some_and(|turn| turn.id == id);
        if !current {
            debug!("Dropping outcome of turn {}", id);
            let _ = self.session.complete_turn(id, outcome);
            return;
        }
        self.active_turn = None;
        match self.session.complete_turn(id, outcome) {
            Ok(()) => self.set_status(NoticeKind::Info, "Ready"),
            Err(err) => self.report_turn_error(err),
        }
    }
}
