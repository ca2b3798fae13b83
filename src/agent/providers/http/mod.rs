use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::agent::config::{LlmBinding, LlmProvider};
use crate::agent::error::InitError;
use crate::agent::message::{ChatMessage, ChatRole, Completion, ToolCall, ToolSpec};

use super::ChatModel;

mod models;

use models::{
    ChatPayload, ChatResponse, WireFunction, WireFunctionCall, WireMessage, WireTool,
    WireToolCall,
};

/// Chat completions client for providers speaking the OpenAI wire format.
pub struct OpenAiCompatibleChat {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: String,
    label: String,
}

impl OpenAiCompatibleChat {
    /// Builds a client for `binding`, reading the API key from the
    /// environment.
    pub fn new(binding: &LlmBinding) -> Result<Self, InitError> {
        let provider = binding.provider;
        let api_key = provider
            .resolved_api_key()
            .ok_or(InitError::MissingApiKey {
                provider: provider.display_name(),
                env_var: provider.api_key_env(),
            })?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InitError::Build(err.into()))?;
        Ok(Self {
            client,
            provider,
            base_url: provider.base_url(),
            model: binding.api_model().to_string(),
            api_key,
            label: format!("{} {}", provider.display_name(), binding.model),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let value = format!("Bearer {}", self.api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value)?);
        Ok(headers)
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleChat {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<Completion> {
        let payload = ChatPayload {
            model: &self.model,
            messages: messages.iter().map(to_wire).collect(),
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };
        debug!(
            "{} request: {} messages, {} tools",
            self.label,
            payload.messages.len(),
            payload.tools.len()
        );

        let response = self
            .client
            .post(&self.base_url)
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} API call failed", self.provider.display_name()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} returned {}: {}",
                self.provider.display_name(),
                status,
                text
            ));
        }

        let data: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("failed to parse {} response", self.provider.display_name()))?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} response has no choices", self.provider.display_name()))?;
        from_wire(choice.message)
    }
}

fn to_wire(message: &ChatMessage) -> WireMessage {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    };
    WireMessage {
        role: role.to_string(),
        content: message.content.clone(),
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                kind: String::from("function"),
                function: WireFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            })
            .collect(),
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn from_wire(message: WireMessage) -> Result<Completion> {
    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| -> Result<ToolCall> {
            let arguments = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments).with_context(|| {
                    format!("invalid arguments for tool `{}`", call.function.name)
                })?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Completion {
        content: message.content.map(|text| text.trim().to_string()),
        tool_calls,
    })
}
