use std::path::PathBuf;

use clap::Parser;

use crate::agent::config::DEFAULT_CONFIG_FILE;
use crate::logging::DEFAULT_LOG_FILE;

#[derive(Parser, Debug)]
#[command(name = "mcp-chat")]
#[command(author, version, about = "Terminal chat with an LLM agent that uses MCP tools", long_about = None)]
pub struct Cli {
    /// JSON file with the `models` list and `mcpServers`
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Environment file to load before start (default: .env if present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Line-oriented mode on stdin/stdout instead of the full-screen UI
    #[arg(long)]
    pub plain: bool,

    /// Log file used by the full-screen UI
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_bundled_config() {
        let cli = Cli::parse_from(["mcp-chat"]);
        assert_eq!(cli.config, PathBuf::from("browser_mcp.json"));
        assert_eq!(cli.log_file, PathBuf::from("mcp-chat.log"));
        assert!(!cli.plain);
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::parse_from([
            "mcp-chat",
            "--config",
            "conf/servers.json",
            "--env-file",
            "secrets.env",
            "--plain",
            "-v",
        ]);
        assert_eq!(cli.config, PathBuf::from("conf/servers.json"));
        assert_eq!(cli.env_file, Some(PathBuf::from("secrets.env")));
        assert!(cli.plain);
        assert!(cli.verbose);
    }
}
