//! Per-session state of the chat shell.
//!
//! `ChatSession` is the context object every UI handler receives: it owns the
//! transcript, the selected model and the agent/client handles, and exposes
//! the shell's operations (initialize, run a turn, reset, shut down).

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use super::config::{DEFAULT_MODEL, load_models};
use super::error::{InitError, TurnError};
use super::runtime::{AgentBuilder, AgentHandles, SharedAgent};
use super::session::{Role, Transcript};

pub struct ChatSession {
    config_path: PathBuf,
    models: Vec<String>,
    selected_model: String,
    transcript: Transcript,
    handles: Option<AgentHandles>,
    /// Id of the turn whose answer is awaited.
    in_flight: Option<u64>,
    next_turn_id: u64,
}

/// A turn that has been recorded in the transcript and still has to run.
pub struct PendingTurn {
    id: u64,
    agent: SharedAgent,
    input: String,
}

impl PendingTurn {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the agent. Firing `cancel` drops the agent call and yields
    /// [`TurnError::Cancelled`].
    pub async fn run(self, cancel: Option<oneshot::Receiver<()>>) -> Result<String, TurnError> {
        let PendingTurn { id, agent, input } = self;
        let work = async move {
            let mut agent = agent.lock().await;
            agent.run_turn(&input).await.map_err(TurnError::Agent)
        };
        let outcome = match cancel {
            Some(cancel) => {
                tokio::select! {
                    outcome = work => outcome,
                    Ok(()) = cancel => Err(TurnError::Cancelled),
                }
            }
            None => work.await,
        };
        debug!("Turn {} finished: ok={}", id, outcome.is_ok());
        outcome
    }
}

impl ChatSession {
    /// Creates a session preselecting the first model.
    pub fn new(config_path: impl Into<PathBuf>, models: Vec<String>) -> Self {
        let selected_model = models
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            config_path: config_path.into(),
            models,
            selected_model,
            transcript: Transcript::default(),
            handles: None,
            in_flight: None,
            next_turn_id: 1,
        }
    }

    /// Creates a session with the model list read from `config_path`.
    pub fn open(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let models = load_models(&config_path);
        Self::new(config_path, models)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// True once both the agent and its client exist.
    pub fn is_ready(&self) -> bool {
        self.handles.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Builds the client/agent pair for the selected model unless it exists.
    ///
    /// On failure both handles stay empty so the next interaction tries again.
    pub async fn initialize_agent(&mut self, builder: &dyn AgentBuilder) -> Result<(), InitError> {
        if self.handles.is_some() {
            return Ok(());
        }
        info!(
            "Initializing agent for {} with {}",
            self.selected_model,
            self.config_path.display()
        );
        match builder.build(&self.selected_model, &self.config_path).await {
            Ok(handles) => {
                self.handles = Some(handles);
                info!("Agent initialized for {}", self.selected_model);
                Ok(())
            }
            Err(err) => {
                error!("Error initializing agent: {}", err);
                Err(err)
            }
        }
    }

    /// Changes the selected model. Handles built for another model are torn
    /// down and rebuilt on the next interaction. Returns whether the
    /// selection changed.
    pub async fn select_model(&mut self, model: &str) -> bool {
        if model == self.selected_model {
            return false;
        }
        info!("Selected model {} (was {})", model, self.selected_model);
        self.selected_model = model.to_string();
        let stale = self
            .handles
            .as_ref()
            .is_some_and(|handles| handles.model != self.selected_model);
        if stale {
            self.in_flight = None;
            self.release_handles().await;
        }
        true
    }

    /// Records the user message and prepares the agent call.
    ///
    /// The message stays in the transcript even if no agent is available.
    pub fn begin_turn(&mut self, input: &str) -> Result<PendingTurn, TurnError> {
        if input.trim().is_empty() {
            return Err(TurnError::EmptyInput);
        }
        if self.in_flight.is_some() {
            return Err(TurnError::Busy);
        }
        self.transcript.push(Role::User, input);
        let Some(handles) = self.handles.as_ref() else {
            warn!("Message submitted without an initialized agent");
            return Err(TurnError::AgentUnavailable);
        };
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.in_flight = Some(id);
        Ok(PendingTurn {
            id,
            agent: handles.agent.clone(),
            input: input.to_string(),
        })
    }

    /// Applies the outcome of turn `id`. A successful answer is appended as
    /// the assistant entry; outcomes of turns abandoned by a reset are
    /// dropped.
    pub fn complete_turn(
        &mut self,
        id: u64,
        outcome: Result<String, TurnError>,
    ) -> Result<(), TurnError> {
        if self.in_flight != Some(id) {
            debug!("Ignoring outcome of abandoned turn {}", id);
            return Ok(());
        }
        self.in_flight = None;
        match outcome {
            Ok(answer) => {
                self.transcript.push(Role::Assistant, answer);
                Ok(())
            }
            Err(err) => {
                warn!("Turn {} failed: {}", id, err);
                Err(err)
            }
        }
    }

    /// Runs one full turn in place and returns the answer.
    pub async fn submit(&mut self, input: &str) -> Result<String, TurnError> {
        let pending = self.begin_turn(input)?;
        let id = pending.id();
        let outcome = pending.run(None).await;
        self.complete_turn(id, outcome)?;
        Ok(self
            .transcript
            .last()
            .map(|entry| entry.content.clone())
            .unwrap_or_default())
    }

    /// Empties the transcript and asks the agent, if any, to forget the
    /// conversation.
    pub async fn new_conversation(&mut self) {
        self.transcript.clear();
        self.in_flight = None;
        if let Some(handles) = self.handles.as_ref() {
            handles.agent.lock().await.clear_memory();
        }
        info!("Started a new conversation");
    }

    /// Closes the client's sessions if it has any. Safe to call more than
    /// once; returns whether sessions were closed.
    pub async fn shutdown(&mut self) -> bool {
        self.in_flight = None;
        self.release_handles().await
    }

    async fn release_handles(&mut self) -> bool {
        let Some(handles) = self.handles.take() else {
            return false;
        };
        if !handles.client.has_open_sessions().await {
            return false;
        }
        info!("Closing MCP sessions");
        if let Err(err) = handles.client.close_all_sessions().await {
            error!("Failed to close MCP sessions: {:#}", err);
        }
        true
    }
}
