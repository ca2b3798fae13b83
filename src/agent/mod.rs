//! 代理執行層。
//!
//! 聊天外殼只透過 `runtime` 中的特徵與代理溝通；具體的 MCP 客戶端、
//! 模型提供者與工具迴圈都在此模組內組裝。

/// `chat` 模組：`ChatSession`，每個對話的狀態與回合流程。
pub mod chat;
/// `config` 模組：讀取 `browser_mcp.json` 的模型清單與 MCP 伺服器設定。
pub mod config;
pub mod error;
/// `manager` 模組：`McpAgentBuilder`，依模型名稱建立客戶端與代理。
pub mod manager;
pub mod mcp_agent;
pub mod message;
/// `providers` 模組：模型 HTTP API 與 MCP stdio 伺服器的實作。
pub mod providers;
pub mod runtime;
/// `session` 模組：畫面上顯示的對話紀錄。
pub mod session;

#[cfg(test)]
pub mod testing;

// --- 公共 API 重新導出 ---
pub use chat::{ChatSession, PendingTurn};
pub use error::{ConfigError, InitError, TurnError};
pub use manager::McpAgentBuilder;
pub use runtime::{AgentBuilder, AgentHandles, ChatAgent, TransportClient};
pub use session::{Role, Transcript, TranscriptEntry};
