//! `TransportClient` backed by MCP servers spawned over stdio.
//!
//! Sessions are opened lazily, on the agent's first turn, and live until
//! `close_all_sessions`.

pub mod transport;
pub mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::agent::config::McpConfig;
use crate::agent::message::ToolSpec;
use crate::agent::runtime::{ToolDescriptor, TransportClient};

use transport::StdioTransport;
use types::{McpToolDef, McpToolResult, PROTOCOL_VERSION};

/// An initialized connection to one server.
struct McpSession {
    transport: Arc<StdioTransport>,
    tools: Vec<McpToolDef>,
}

pub struct McpClient {
    config: McpConfig,
    sessions: RwLock<BTreeMap<String, McpSession>>,
}

impl McpClient {
    pub fn new(config: McpConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Reads the `mcpServers` section of `path`.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = McpConfig::from_file(path)?;
        let client = Self::new(config);
        let names = client.server_names();
        if names.is_empty() {
            warn!("{} declares no MCP servers", path.display());
        } else {
            info!("MCP servers from {}: {}", path.display(), names.join(", "));
        }
        Ok(client)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.config.servers.keys().cloned().collect()
    }

    async fn create_session(&self, name: &str) -> Result<McpSession> {
        let server = self
            .config
            .server(name)
            .ok_or_else(|| anyhow!("unknown MCP server: {}", name))?;
        let command = server.stdio_command(name)?;
        let transport = Arc::new(StdioTransport::spawn(
            name,
            command,
            &server.args,
            &server.env,
            server.cwd.as_deref(),
        )?);

        let handshake = async {
            transport
                .request(
                    "initialize",
                    Some(json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "clientInfo": {
                            "name": env!("CARGO_PKG_NAME"),
                            "version": env!("CARGO_PKG_VERSION"),
                        }
                    })),
                )
                .await?;
            transport.notify("notifications/initialized", None).await?;
            let listed = transport.request("tools/list", None).await?;
            let tools: Vec<McpToolDef> = match listed.get("tools") {
                Some(tools) => serde_json::from_value(tools.clone())
                    .context("failed to parse tools/list result")?,
                None => Vec::new(),
            };
            Ok::<_, anyhow::Error>(tools)
        };

        match handshake.await {
            Ok(tools) => {
                info!("MCP session {} ready with {} tools", name, tools.len());
                Ok(McpSession { transport, tools })
            }
            Err(err) => {
                let _ = transport.kill().await;
                Err(err.context(format!("failed to initialize MCP server {}", name)))
            }
        }
    }
}

#[async_trait]
impl TransportClient for McpClient {
    async fn create_all_sessions(&self) -> Result<()> {
        for name in self.config.servers.keys() {
            if self.sessions.read().await.contains_key(name) {
                continue;
            }
            let session = self.create_session(name).await?;
            self.sessions.write().await.insert(name.clone(), session);
        }
        Ok(())
    }

    async fn has_open_sessions(&self) -> bool {
        !self.sessions.read().await.is_empty()
    }

    async fn tools(&self) -> Vec<ToolDescriptor> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .flat_map(|(server, session)| {
                session.tools.iter().map(move |tool| ToolDescriptor {
                    server: server.clone(),
                    spec: ToolSpec {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: if tool.input_schema.is_null() {
                            json!({"type": "object", "properties": {}})
                        } else {
                            tool.input_schema.clone()
                        },
                    },
                })
            })
            .collect()
    }

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> Result<String> {
        let transport = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(server)
                .ok_or_else(|| anyhow!("no open session for MCP server {}", server))?;
            session.transport.clone()
        };
        let raw = transport
            .request(
                "tools/call",
                Some(json!({
                    "name": tool,
                    "arguments": arguments,
                })),
            )
            .await
            .with_context(|| format!("tool call {} failed", tool))?;
        let result: McpToolResult =
            serde_json::from_value(raw).context("failed to parse tool result")?;
        Ok(result.to_text())
    }

    async fn close_all_sessions(&self) -> Result<()> {
        let drained = std::mem::take(&mut *self.sessions.write().await);
        let mut failures = Vec::new();
        for (name, session) in drained {
            match session.transport.kill().await {
                Ok(()) => info!("Closed MCP session {}", name),
                Err(err) => failures.push(format!("{}: {:#}", name, err)),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("failed to close sessions: {}", failures.join("; ")))
        }
    }
}
