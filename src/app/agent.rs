use log::{info, warn};
use tokio::sync::oneshot;

use super::state::ActiveTurn;
use super::{App, FocusArea, NoticeKind, TurnEvent};
use crate::agent::TurnError;

// Agent lifecycle and turn handling.
impl App {
    /// True when the main loop should run `initialize_agent_runtime` before
    /// waiting for input.
    pub fn needs_initialization(&self) -> bool {
        self.initialization_pending
    }

    /// Builds the agent for the selected model if it does not exist yet.
    /// Failures are shown and retried on the next interaction.
    pub async fn initialize_agent_runtime(&mut self) {
        self.initialization_pending = false;
        if self.session.is_ready() {
            return;
        }
        let builder = self.builder.clone();
        match self.session.initialize_agent(builder.as_ref()).await {
            Ok(()) => self.set_status(NoticeKind::Success, "Agent initialized successfully!"),
            Err(err) => self.set_status(NoticeKind::Error, format!("Error: {}", err)),
        }
    }

    /// Sends the composer content as a new turn running in the background.
    pub(crate) async fn submit_prompt(&mut self) {
        if self.composer.buffer().trim().is_empty() {
            self.set_status(NoticeKind::Info, "Message is empty, not sending.");
            return;
        }
        if self.is_thinking() {
            self.set_status(NoticeKind::Info, "Still thinking, press Esc to cancel.");
            return;
        }
        let retried_init = !self.session.is_ready();
        if retried_init {
            self.initialize_agent_runtime().await;
        }

        let prompt = self.composer.take();
        let pending = match self.session.begin_turn(&prompt) {
            Ok(pending) => pending,
            // The build error from the retry stays in the status bar.
            Err(TurnError::AgentUnavailable) if retried_init => {
                warn!("Message kept without a reply: agent is not initialized");
                return;
            }
            Err(err) => {
                self.report_turn_error(err);
                return;
            }
        };
        info!(
            "Submitting message: {}",
            prompt.lines().next().unwrap_or("")
        );

        let id = pending.id();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = pending.run(Some(cancel_rx)).await;
            let _ = events.send(TurnEvent::Finished { id, outcome });
        });
        self.active_turn = Some(ActiveTurn {
            id,
            cancel: Some(cancel_tx),
        });
        self.set_status(NoticeKind::Info, "Thinking...");
    }

    /// Asks the running turn, if any, to stop. Returns whether one was running.
    pub(crate) fn cancel_turn(&mut self) -> bool {
        let Some(active) = self.active_turn.as_mut() else {
            return false;
        };
        if let Some(cancel) = active.cancel.take() {
            let _ = cancel.send(());
            self.set_status(NoticeKind::Info, "Cancelling...");
        }
        true
    }

    /// Cancels any running turn and starts over with an empty transcript.
    pub(crate) async fn start_new_conversation(&mut self) {
        self.cancel_turn();
        self.active_turn = None;
        self.session.new_conversation().await;
        self.composer.clear();
        self.set_status(NoticeKind::Success, "Started a new conversation.");
    }

    /// Selects the highlighted model. A changed model rebuilds the agent
    /// before the next event is handled.
    pub(crate) async fn select_highlighted_model(&mut self) {
        let Some(model) = self.session.models().get(self.model_cursor).cloned() else {
            return;
        };
        if model != self.session.selected_model() && self.cancel_turn() {
            self.active_turn = None;
        }
        if self.session.select_model(&model).await {
            self.set_status(NoticeKind::Info, format!("Model set to {}", model));
            self.initialization_pending = !self.session.is_ready();
        }
        self.focus = FocusArea::Composer;
    }

    pub(crate) fn move_model_cursor(&mut self, delta: isize) {
        let count = self.session.models().len();
        if count == 0 {
            return;
        }
        let next = self.model_cursor as isize + delta;
        self.model_cursor = next.clamp(0, count as isize - 1) as usize;
    }

    /// Releases the agent and closes tool server sessions.
    pub async fn shutdown(&mut self) {
        self.cancel_turn();
        self.active_turn = None;
        if self.session.shutdown().await {
            info!("MCP sessions closed on exit");
        }
    }

    pub(crate) fn report_turn_error(&mut self, err: TurnError) {
        match err {
            TurnError::Cancelled => self.set_status(NoticeKind::Info, "Response cancelled."),
            TurnError::EmptyInput => {}
            other => {
                warn!("Turn error: {}", other);
                self.set_status(NoticeKind::Error, format!("Error: {}", other));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::agent::ChatSession;
    use crate::agent::session::Role;
    use crate::agent::testing::{FailingBuilder, FakeBuilder, FakeProbe};

    fn app_with(probe: &FakeProbe) -> App {
        let session = ChatSession::new(
            "browser_mcp.json",
            vec!["qwen-qwq-32b".into(), "groq/llama-3.3-70b".into()],
        );
        App::new(session, Arc::new(FakeBuilder::new(probe.clone())))
    }

    fn type_text(app: &mut App, text: &str) {
        text.chars().for_each(|ch| app.composer.insert_char(ch));
    }

    async fn wait_for_turn(app: &mut App) {
        for _ in 0..200 {
            app.on_tick();
            if !app.is_thinking() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("turn did not finish");
    }

    #[tokio::test]
    async fn initialization_reports_success() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        assert!(app.needs_initialization());
        app.initialize_agent_runtime().await;
        assert!(!app.needs_initialization());
        assert!(app.session.is_ready());
        assert_eq!(app.status_kind, NoticeKind::Success);
        assert_eq!(app.status_message, "Agent initialized successfully!");
    }

    #[tokio::test]
    async fn initialization_failure_is_shown() {
        let session = ChatSession::new("browser_mcp.json", vec!["qwen-qwq-32b".into()]);
        let mut app = App::new(session, Arc::new(FailingBuilder));
        app.initialize_agent_runtime().await;
        assert!(!app.session.is_ready());
        assert_eq!(app.status_kind, NoticeKind::Error);
        assert!(app.status_message.contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn failed_build_on_submit_keeps_the_build_error() {
        let session = ChatSession::new("browser_mcp.json", vec!["qwen-qwq-32b".into()]);
        let mut app = App::new(session, Arc::new(FailingBuilder));
        type_text(&mut app, "hello");
        app.submit_prompt().await;

        assert!(!app.is_thinking());
        assert_eq!(app.status_kind, NoticeKind::Error);
        assert!(app.status_message.contains("GROQ_API_KEY"));
        let entries = app.session.transcript().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].content, "hello");
    }

    #[tokio::test]
    async fn submitted_message_is_answered_in_the_background() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        type_text(&mut app, "hello");
        app.submit_prompt().await;
        assert!(app.is_thinking());
        assert!(app.composer.is_empty());
        assert_eq!(app.status_message, "Thinking...");

        wait_for_turn(&mut app).await;
        let entries = app.session.transcript().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].content, "echo: hello");
        assert_eq!(probe.builds(), 1);
    }

    #[tokio::test]
    async fn second_submission_waits_for_the_first() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        app.initialize_agent_runtime().await;
        type_text(&mut app, "hang on");
        app.submit_prompt().await;
        type_text(&mut app, "again");
        app.submit_prompt().await;
        assert_eq!(app.composer.buffer(), "again");
        assert_eq!(app.session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn cancelling_leaves_the_message_unanswered() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        app.initialize_agent_runtime().await;
        type_text(&mut app, "hang forever");
        app.submit_prompt().await;
        assert!(app.cancel_turn());

        wait_for_turn(&mut app).await;
        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.status_message, "Response cancelled.");
        assert!(!app.session.is_busy());
    }

    #[tokio::test]
    async fn new_conversation_cancels_and_clears() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        app.initialize_agent_runtime().await;
        type_text(&mut app, "hang");
        app.submit_prompt().await;
        app.start_new_conversation().await;

        assert!(!app.is_thinking());
        assert!(app.session.transcript().is_empty());
        assert_eq!(probe.clear_calls(), 1);
    }

    #[tokio::test]
    async fn selecting_another_model_schedules_a_rebuild() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        app.initialize_agent_runtime().await;
        app.focus = FocusArea::Models;
        app.move_model_cursor(5);
        assert_eq!(app.model_cursor, 1);
        app.select_highlighted_model().await;

        assert_eq!(app.session.selected_model(), "groq/llama-3.3-70b");
        assert!(app.needs_initialization());
        assert_eq!(app.focus, FocusArea::Composer);
        app.initialize_agent_runtime().await;
        assert_eq!(probe.builds(), 2);
        assert_eq!(probe.last_model().as_deref(), Some("groq/llama-3.3-70b"));
    }

    #[tokio::test]
    async fn failed_turn_keeps_the_user_entry() {
        let probe = FakeProbe::default();
        let mut app = app_with(&probe);
        type_text(&mut app, "please fail");
        app.submit_prompt().await;
        wait_for_turn(&mut app).await;
        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.status_kind, NoticeKind::Error);
        assert!(app.status_message.contains("agent exploded"));
    }
}
