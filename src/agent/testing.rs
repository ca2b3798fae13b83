//! Fakes for the agent runtime traits, shared by the unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use super::error::InitError;
use super::message::ToolSpec;
use super::runtime::{AgentBuilder, AgentHandles, ChatAgent, ToolDescriptor, TransportClient};

/// Counters shared between a test and the fakes it hands out.
#[derive(Clone, Default)]
pub struct FakeProbe {
    inner: Arc<ProbeState>,
}

#[derive(Default)]
struct ProbeState {
    builds: AtomicUsize,
    clears: AtomicUsize,
    closes: AtomicUsize,
    open: AtomicBool,
    last_model: Mutex<Option<String>>,
    tool_calls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeProbe {
    pub fn builds(&self) -> usize {
        self.inner.builds.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.inner.clears.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) {
        self.inner.open.store(true, Ordering::SeqCst);
    }

    pub fn last_model(&self) -> Option<String> {
        self.inner.last_model.lock().unwrap().clone()
    }

    pub fn tool_calls(&self) -> Vec<(String, String, Value)> {
        self.inner.tool_calls.lock().unwrap().clone()
    }
}

/// Echoes its input; inputs containing `fail` error and `hang` never return.
pub struct FakeAgent {
    probe: FakeProbe,
}

#[async_trait]
impl ChatAgent for FakeAgent {
    async fn run_turn(&mut self, input: &str) -> Result<String> {
        if input.contains("fail") {
            return Err(anyhow!("agent exploded"));
        }
        if input.contains("hang") {
            std::future::pending::<()>().await;
        }
        Ok(format!("echo: {}", input))
    }

    fn clear_memory(&mut self) {
        self.probe.inner.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// A client whose servers each expose the given tools.
pub struct FakeClient {
    probe: FakeProbe,
    tools: Vec<ToolDescriptor>,
}

impl FakeClient {
    pub fn new(probe: FakeProbe) -> Self {
        Self {
            probe,
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, server: &str, name: &str) -> Self {
        self.tools.push(ToolDescriptor {
            server: server.to_string(),
            spec: ToolSpec {
                name: name.to_string(),
                description: format!("{} tool", name),
                parameters: serde_json::json!({"type": "object"}),
            },
        });
        self
    }
}

#[async_trait]
impl TransportClient for FakeClient {
    async fn create_all_sessions(&self) -> Result<()> {
        self.probe.open_sessions();
        Ok(())
    }

    async fn has_open_sessions(&self) -> bool {
        self.probe.inner.open.load(Ordering::SeqCst)
    }

    async fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.clone()
    }

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> Result<String> {
        self.probe.inner.tool_calls.lock().unwrap().push((
            server.to_string(),
            tool.to_string(),
            arguments.clone(),
        ));
        Ok(format!("{} output", tool))
    }

    async fn close_all_sessions(&self) -> Result<()> {
        self.probe.inner.closes.fetch_add(1, Ordering::SeqCst);
        self.probe.inner.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeBuilder {
    probe: FakeProbe,
}

impl FakeBuilder {
    pub fn new(probe: FakeProbe) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl AgentBuilder for FakeBuilder {
    async fn build(&self, model: &str, _config_path: &Path) -> Result<AgentHandles, InitError> {
        self.probe.inner.builds.fetch_add(1, Ordering::SeqCst);
        *self.probe.inner.last_model.lock().unwrap() = Some(model.to_string());
        Ok(AgentHandles::new(
            model,
            Arc::new(FakeClient::new(self.probe.clone())),
            Box::new(FakeAgent {
                probe: self.probe.clone(),
            }),
        ))
    }
}

/// Always fails the way a missing credential does.
pub struct FailingBuilder;

#[async_trait]
impl AgentBuilder for FailingBuilder {
    async fn build(&self, _model: &str, _config_path: &Path) -> Result<AgentHandles, InitError> {
        Err(InitError::MissingApiKey {
            provider: "Groq",
            env_var: "GROQ_API_KEY",
        })
    }
}
