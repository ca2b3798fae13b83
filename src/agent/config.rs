//! Configuration read from `browser_mcp.json` and the process environment.
//!
//! The same JSON file carries the model list shown in the sidebar and the
//! `mcpServers` descriptors the transport client spawns.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "browser_mcp.json";

/// Model used whenever the selected name does not target a known provider.
pub const DEFAULT_MODEL: &str = "qwen-qwq-32b";

/// Models offered when the config file cannot be used at all.
pub const FALLBACK_MODELS: [&str; 3] = ["qwen-qwq-32b", "llama3-8b-8192", "llama3-70b-8192"];

/// Reads the model list, falling back to [`FALLBACK_MODELS`] on any failure.
///
/// A readable file without a `models` key yields just [`DEFAULT_MODEL`].
pub fn load_models(path: &Path) -> Vec<String> {
    match try_load_models(path) {
        Ok(models) => models,
        Err(ConfigError::MissingModels { path }) => {
            warn!("{} has no `models` key, using {}", path.display(), DEFAULT_MODEL);
            vec![DEFAULT_MODEL.to_string()]
        }
        Err(err) => {
            warn!("Falling back to built-in model list: {}", err);
            FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
        }
    }
}

/// Reads the `models` array of the config file.
pub fn try_load_models(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let models = value
        .get("models")
        .ok_or_else(|| ConfigError::MissingModels {
            path: path.to_path_buf(),
        })?;
    let invalid = || ConfigError::InvalidModels {
        path: path.to_path_buf(),
    };
    let list = models.as_array().ok_or_else(invalid)?;
    let names = list
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(invalid)?;
    if names.is_empty() {
        return Err(invalid());
    }
    Ok(names)
}

/// The `mcpServers` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfig {
    /// Parses the server descriptors. Relative `cwd` entries are resolved
    /// against the directory holding the config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read MCP config: {}", path.display()))?;
        let parsed: McpConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse MCP config: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(parsed.normalize(base))
    }

    fn normalize(mut self, base: &Path) -> Self {
        for server in self.servers.values_mut() {
            if let Some(dir) = server.cwd.as_mut()
                && dir.is_relative()
            {
                *dir = base.join(&dir);
            }
        }
        self
    }

    pub fn server(&self, name: &str) -> Option<&McpServerConfig> {
        self.servers.get(name)
    }
}

/// How to launch one MCP tool server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Program to spawn. Only stdio servers are supported.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment; `${VAR}` references are expanded at spawn time.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Remote endpoint of an HTTP/SSE server.
    #[serde(default)]
    pub url: Option<String>,
}

impl McpServerConfig {
    pub fn stdio_command(&self, name: &str) -> Result<&str> {
        match (&self.command, &self.url) {
            (Some(command), _) => Ok(command),
            (None, Some(url)) => Err(anyhow!(
                "server `{}` uses a remote endpoint ({}), only stdio servers are supported",
                name,
                url
            )),
            (None, None) => Err(anyhow!("server `{}` has no command", name)),
        }
    }
}

/// Language model providers the shell knows how to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Groq,
}

impl LlmProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "Groq",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
        }
    }

    fn base_url_env(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_BASE_URL",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }

    /// Endpoint for chat completions, honouring the override variable.
    pub fn base_url(&self) -> String {
        env::var(self.base_url_env())
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.default_base_url().to_string())
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        env::var(self.api_key_env())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Provider and model an agent talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBinding {
    pub provider: LlmProvider,
    pub model: String,
}

impl LlmBinding {
    /// Names containing `groq` go to Groq as-is; anything else falls back to
    /// [`DEFAULT_MODEL`] on Groq.
    pub fn for_model(model: &str) -> Self {
        if model.contains("groq") {
            Self {
                provider: LlmProvider::Groq,
                model: model.to_string(),
            }
        } else {
            warn!(
                "Model `{}` does not name a known provider, using {} on Groq",
                model, DEFAULT_MODEL
            );
            Self {
                provider: LlmProvider::Groq,
                model: DEFAULT_MODEL.to_string(),
            }
        }
    }

    /// Model id as the provider expects it, without a `groq/` routing prefix.
    pub fn api_model(&self) -> &str {
        self.model.strip_prefix("groq/").unwrap_or(&self.model)
    }
}
