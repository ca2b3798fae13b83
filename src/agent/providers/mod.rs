//! Clients for the two external collaborators of the agent: the language
//! model provider and the MCP tool servers.

/// `http` module: chat completions over an OpenAI-compatible HTTP API.
pub mod http;
/// `mcp` module: stdio sessions to MCP tool servers.
pub mod mcp;

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::message::{ChatMessage, Completion, ToolSpec};

/// A language model that can answer with text or request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Name used in logs and the status bar.
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<Completion>;
}
