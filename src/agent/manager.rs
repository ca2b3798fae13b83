use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use crate::agent::config::LlmBinding;
use crate::agent::error::InitError;
use crate::agent::mcp_agent::{AgentOptions, McpAgent};
use crate::agent::providers::http::OpenAiCompatibleChat;
use crate::agent::providers::mcp::McpClient;
use crate::agent::runtime::{AgentBuilder, AgentHandles, DEFAULT_MAX_STEPS, TransportClient};

/// Builds the production agent: an MCP client over the config file's
/// `mcpServers` and a tool loop on the provider the model name selects.
pub struct McpAgentBuilder {
    pub max_steps: usize,
    pub memory_enabled: bool,
}

impl Default for McpAgentBuilder {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            memory_enabled: true,
        }
    }
}

#[async_trait]
impl AgentBuilder for McpAgentBuilder {
    async fn build(&self, model: &str, config_path: &Path) -> Result<AgentHandles, InitError> {
        let client: Arc<dyn TransportClient> =
            Arc::new(McpClient::from_config_file(config_path).map_err(InitError::Config)?);
        let binding = LlmBinding::for_model(model);
        let llm = OpenAiCompatibleChat::new(&binding)?;
        info!(
            "Agent built for {} via {} ({} max steps)",
            binding.model,
            binding.provider.display_name(),
            self.max_steps
        );
        let agent = McpAgent::new(
            Box::new(llm),
            client.clone(),
            AgentOptions {
                max_steps: self.max_steps,
                memory_enabled: self.memory_enabled,
                ..AgentOptions::default()
            },
        );
        Ok(AgentHandles::new(model, client, Box::new(agent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_uses_fifteen_steps_with_memory() {
        let builder = McpAgentBuilder::default();
        assert_eq!(builder.max_steps, 15);
        assert_eq!(builder.max_steps, DEFAULT_MAX_STEPS);
        assert!(builder.memory_enabled);
    }

    #[tokio::test]
    async fn unreadable_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = McpAgentBuilder::default()
            .build("qwen-qwq-32b", &dir.path().join("missing.json"))
            .await;
        assert!(matches!(result, Err(InitError::Config(_))));
    }
}
