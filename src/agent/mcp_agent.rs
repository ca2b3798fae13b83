//! Tool-calling loop that drives a `ChatModel` against MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};

use super::message::{ChatMessage, ToolSpec};
use super::providers::ChatModel;
use super::runtime::{ChatAgent, DEFAULT_MAX_STEPS, ToolDescriptor, TransportClient};

const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools provided by MCP \
servers. Use them when they help answer the user, then reply with a concise final answer.";

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// LLM calls allowed per turn.
    pub max_steps: usize,
    /// Keep user messages and final answers between turns.
    pub memory_enabled: bool,
    pub system_prompt: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            memory_enabled: true,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

pub struct McpAgent {
    llm: Box<dyn ChatModel>,
    client: Arc<dyn TransportClient>,
    options: AgentOptions,
    memory: Vec<ChatMessage>,
    tools: Option<ToolIndex>,
}

/// Tools offered to the model and the server each one lives on.
struct ToolIndex {
    specs: Vec<ToolSpec>,
    routes: HashMap<String, String>,
}

impl ToolIndex {
    fn build(descriptors: Vec<ToolDescriptor>) -> Self {
        let mut specs = Vec::with_capacity(descriptors.len());
        let mut routes = HashMap::new();
        for descriptor in descriptors {
            if let Some(existing) = routes.get(&descriptor.spec.name) {
                warn!(
                    "Tool `{}` of {} shadowed by {}",
                    descriptor.spec.name, descriptor.server, existing
                );
                continue;
            }
            routes.insert(descriptor.spec.name.clone(), descriptor.server);
            specs.push(descriptor.spec);
        }
        Self { specs, routes }
    }
}

impl McpAgent {
    pub fn new(
        llm: Box<dyn ChatModel>,
        client: Arc<dyn TransportClient>,
        options: AgentOptions,
    ) -> Self {
        Self {
            llm,
            client,
            options,
            memory: Vec::new(),
            tools: None,
        }
    }

    pub fn memory(&self) -> &[ChatMessage] {
        &self.memory
    }

    async fn ensure_tools(&mut self) -> Result<()> {
        if self.tools.is_some() {
            return Ok(());
        }
        self.client
            .create_all_sessions()
            .await
            .context("failed to open MCP sessions")?;
        let index = ToolIndex::build(self.client.tools().await);
        info!(
            "{} ready with {} tools",
            self.llm.name(),
            index.specs.len()
        );
        self.tools = Some(index);
        Ok(())
    }

    async fn invoke(&self, name: &str, arguments: serde_json::Value) -> String {
        let Some(server) = self.tools.as_ref().and_then(|t| t.routes.get(name)) else {
            warn!("Model requested unknown tool `{}`", name);
            return format!("Unknown tool: {}", name);
        };
        debug!("Calling {} on {}", name, server);
        match self.client.call_tool(server, name, arguments).await {
            Ok(output) => output,
            Err(err) => {
                warn!("Tool {} failed: {:#}", name, err);
                format!("Error: {:#}", err)
            }
        }
    }
}

#[async_trait]
impl ChatAgent for McpAgent {
    async fn run_turn(&mut self, input: &str) -> Result<String> {
        self.ensure_tools().await?;
        let specs = self
            .tools
            .as_ref()
            .map(|index| index.specs.clone())
            .unwrap_or_default();

        let mut messages = Vec::with_capacity(self.memory.len() + 2);
        messages.push(ChatMessage::system(self.options.system_prompt.clone()));
        messages.extend(self.memory.iter().cloned());
        messages.push(ChatMessage::user(input));

        for step in 1..=self.options.max_steps {
            let completion = self.llm.complete(&messages, &specs).await?;
            if completion.tool_calls.is_empty() {
                let answer = completion.content.unwrap_or_default();
                if self.options.memory_enabled {
                    self.memory.push(ChatMessage::user(input));
                    self.memory.push(ChatMessage::assistant(answer.clone()));
                }
                debug!("Turn finished after {} steps", step);
                return Ok(answer);
            }

            let calls = completion.tool_calls.clone();
            messages.push(ChatMessage::tool_request(completion.content, completion.tool_calls));
            for call in calls {
                let output = self.invoke(&call.name, call.arguments).await;
                messages.push(ChatMessage::tool_result(call.id, output));
            }
        }

        warn!("Turn stopped after {} steps", self.options.max_steps);
        Ok(format!(
            "Agent stopped after reaching the maximum number of steps ({}).",
            self.options.max_steps
        ))
    }

    fn clear_memory(&mut self) {
        self.memory.clear();
    }
}
