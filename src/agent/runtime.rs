//! The contract between the chat shell and the agent runtime.
//!
//! The shell only talks to these traits. `McpAgentBuilder` wires the concrete
//! MCP client, provider client and tool loop behind them; tests plug in fakes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::error::InitError;
use super::message::ToolSpec;

/// Upper bound on LLM calls per turn.
pub const DEFAULT_MAX_STEPS: usize = 15;

/// An agent that answers one user message at a time.
#[async_trait]
pub trait ChatAgent: Send {
    /// Runs a full turn (any number of internal LLM / tool steps) and returns
    /// the final answer.
    async fn run_turn(&mut self, input: &str) -> Result<String>;

    /// Forgets everything said so far.
    fn clear_memory(&mut self);
}

/// A tool exposed by one of the transport client's servers.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub server: String,
    pub spec: ToolSpec,
}

/// Holds the sessions to the tool servers an agent works with.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Opens a session to every configured server that has none yet.
    async fn create_all_sessions(&self) -> Result<()>;

    /// True when at least one session is open.
    async fn has_open_sessions(&self) -> bool;

    /// Lists the tools of every open session.
    async fn tools(&self) -> Vec<ToolDescriptor>;

    /// Invokes `tool` on `server` and returns its textual output.
    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> Result<String>;

    /// Closes every open session.
    async fn close_all_sessions(&self) -> Result<()>;
}

pub type SharedAgent = Arc<Mutex<Box<dyn ChatAgent>>>;

/// Agent and client handles, created and dropped together.
pub struct AgentHandles {
    /// Model the agent was built for.
    pub model: String,
    pub client: Arc<dyn TransportClient>,
    pub agent: SharedAgent,
}

impl AgentHandles {
    pub fn new(
        model: impl Into<String>,
        client: Arc<dyn TransportClient>,
        agent: Box<dyn ChatAgent>,
    ) -> Self {
        Self {
            model: model.into(),
            client,
            agent: Arc::new(Mutex::new(agent)),
        }
    }
}

/// Builds the client/agent pair for a model.
#[async_trait]
pub trait AgentBuilder: Send + Sync {
    async fn build(&self, model: &str, config_path: &Path) -> Result<AgentHandles, InitError>;
}
