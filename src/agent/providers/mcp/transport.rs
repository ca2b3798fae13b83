//! Newline-delimited JSON-RPC over a child process's stdin/stdout.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use log::{debug, trace};
use regex::{Captures, Regex};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::types::{JsonRpcIncoming, JsonRpcNotification, JsonRpcRequest};

/// A spawned MCP server. Requests are serialized: each one holds the pipe
/// until its response arrives.
pub struct StdioTransport {
    label: String,
    child: Mutex<Child>,
    pipes: Mutex<Pipes>,
    next_id: AtomicU64,
}

struct Pipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    pub fn spawn(
        label: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        cwd: Option<&Path>,
    ) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, expand_env_vars(value, |name| std::env::var(name).ok()));
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                anyhow!("MCP server executable not found: {}", command)
            } else {
                anyhow!("failed to start MCP server {}: {}", label, err)
            }
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("MCP server {} has no stdin pipe", label))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("MCP server {} has no stdout pipe", label))?;

        Ok(Self {
            label: label.to_string(),
            child: Mutex::new(child),
            pipes: Mutex::new(Pipes {
                stdin,
                stdout: BufReader::new(stdout),
            }),
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends a request and waits for the response with the same id.
    /// Server-initiated messages arriving in between are skipped.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        })?;
        trace!("{} <- {}", self.label, line);

        let mut pipes = self.pipes.lock().await;
        write_line(&mut pipes.stdin, &line)
            .await
            .with_context(|| format!("failed to write to MCP server {}", self.label))?;

        let mut buffer = String::new();
        loop {
            buffer.clear();
            let read = pipes
                .stdout
                .read_line(&mut buffer)
                .await
                .with_context(|| format!("failed to read from MCP server {}", self.label))?;
            if read == 0 {
                return Err(anyhow!("MCP server {} closed the connection", self.label));
            }
            let text = buffer.trim();
            if text.is_empty() {
                continue;
            }
            trace!("{} -> {}", self.label, text);
            let incoming: JsonRpcIncoming = match serde_json::from_str(text) {
                Ok(message) => message,
                Err(err) => {
                    debug!("Skipping non JSON-RPC line from {}: {}", self.label, err);
                    continue;
                }
            };
            if incoming.method.is_some() || incoming.id.as_ref().and_then(Value::as_u64) != Some(id)
            {
                continue;
            }
            if let Some(error) = incoming.error {
                return Err(anyhow!(
                    "MCP error {} from {}: {}",
                    error.code,
                    self.label,
                    error.message
                ));
            }
            return Ok(incoming.result.unwrap_or(Value::Null));
        }
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let line = serde_json::to_string(&JsonRpcNotification {
            jsonrpc: "2.0",
            method,
            params,
        })?;
        trace!("{} <- {}", self.label, line);
        let mut pipes = self.pipes.lock().await;
        write_line(&mut pipes.stdin, &line).await
    }

    pub async fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        child
            .kill()
            .await
            .with_context(|| format!("failed to stop MCP server {}", self.label))
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    Ok(())
}

/// Replaces `${VAR}` with values from `lookup`; unknown variables are kept
/// verbatim.
pub(crate) fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    });
    pattern
        .replace_all(input, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
