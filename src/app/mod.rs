//! `app` 模組：聊天外殼的狀態與輸入處理。
//!
//! `App` 持有 `ChatSession`，並把鍵盤、滑鼠與定時事件轉換成對話操作。

/// `agent` 模組：初始化代理、送出訊息、取消回合與切換模型。
mod agent;
/// `init` 模組：建立 `App`。
mod init;
/// `keyboard` 模組：鍵盤事件。
mod keyboard;
mod mouse;
/// `state` 模組：`App` 與輸入框 `ChatComposer`。
mod state;
/// `tick` 模組：每次 tick 收取背景回合的結果。
mod tick;

pub use state::{App, ChatComposer, TurnEvent};

use crate::definitions::{FocusArea, NoticeKind};
