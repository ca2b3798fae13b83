//! Error kinds surfaced by the chat shell.
//!
//! Everything the UI can show falls into one of three buckets: the config
//! file could not be read, the agent could not be built, or a turn failed.

use std::path::PathBuf;

/// Failure to read the model list from the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config file {path} has no `models` key")]
    MissingModels { path: PathBuf },
    #[error("`models` in {path} must be a non-empty array of strings")]
    InvalidModels { path: PathBuf },
}

/// Failure to construct the transport client or the agent.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid MCP configuration: {0:#}")]
    Config(anyhow::Error),
    #[error("{provider} API key missing, set {env_var}")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },
    #[error("failed to build agent: {0:#}")]
    Build(anyhow::Error),
}

/// Failure of a single conversational turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a response is still being generated")]
    Busy,
    #[error("Agent is not initialized. Please check your configuration.")]
    AgentUnavailable,
    #[error("turn cancelled")]
    Cancelled,
    #[error("{0:#}")]
    Agent(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_errors_name_their_cause() {
        let missing = InitError::MissingApiKey {
            provider: "Groq",
            env_var: "GROQ_API_KEY",
        };
        assert_eq!(missing.to_string(), "Groq API key missing, set GROQ_API_KEY");

        let build = InitError::Build(anyhow::anyhow!("TLS backend unavailable"));
        assert_eq!(build.to_string(), "failed to build agent: TLS backend unavailable");
    }
}
