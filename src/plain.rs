//! Line-oriented chat on stdin/stdout for terminals without raw mode.

use std::io::Write;

use anyhow::Result;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::oneshot;

use crate::agent::{AgentBuilder, ChatSession, TurnError};

const HELP: &str = "Commands: /new  /models  /model <name>  /help  /quit  (Ctrl+C cancels a reply)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    New,
    Models,
    Model(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Some(Command::Message(line.trim_end().to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    Some(match (name, arg) {
        ("new", _) => Command::New,
        ("models", _) => Command::Models,
        ("model", "") => Command::Unknown(String::from("/model needs a model name")),
        ("model", model) => Command::Model(model.to_string()),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(format!("unknown command /{}", name)),
    })
}

/// Whether the loop keeps reading.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn run(session: &mut ChatSession, builder: &dyn AgentBuilder) -> Result<()> {
    let mut out = std::io::stdout();
    writeln!(out, "MCP Chat ({})", session.selected_model())?;
    writeln!(out, "{}", HELP)?;
    report_init(session.initialize_agent(builder).await, &mut out)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(out)?;
            break;
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };
        if execute(session, builder, command, &mut out).await? == Flow::Quit {
            break;
        }
    }
    info!("Plain session ended");
    Ok(())
}

pub async fn execute(
    session: &mut ChatSession,
    builder: &dyn AgentBuilder,
    command: Command,
    out: &mut impl Write,
) -> Result<Flow> {
    match command {
        Command::Message(text) => {
            if !session.is_ready() {
                report_init(session.initialize_agent(builder).await, out)?;
            }
            match run_turn(session, &text).await {
                Ok(answer) => writeln!(out, "{}\n", answer)?,
                Err(TurnError::Cancelled) => writeln!(out, "(cancelled)")?,
                Err(err) => writeln!(out, "Error: {}", err)?,
            }
        }
        Command::New => {
            session.new_conversation().await;
            writeln!(out, "Started a new conversation.")?;
        }
        Command::Models => {
            for model in session.models() {
                let marker = if model == session.selected_model() { "*" } else { " " };
                writeln!(out, "{} {}", marker, model)?;
            }
        }
        Command::Model(model) => {
            if session.select_model(&model).await {
                writeln!(out, "Model set to {}", model)?;
                report_init(session.initialize_agent(builder).await, out)?;
            } else {
                writeln!(out, "{} is already selected", model)?;
            }
        }
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(Flow::Quit),
        Command::Unknown(message) => writeln!(out, "{}", message)?,
    }
    Ok(Flow::Continue)
}

/// Runs one turn; Ctrl+C while it runs cancels it.
async fn run_turn(session: &mut ChatSession, text: &str) -> Result<String, TurnError> {
    let pending = session.begin_turn(text)?;
    let id = pending.id();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let turn = pending.run(Some(cancel_rx));
    tokio::pin!(turn);
    let outcome = tokio::select! {
        outcome = &mut turn => outcome,
        _ = signal::ctrl_c() => {
            let _ = cancel_tx.send(());
            turn.await
        }
    };
    session.complete_turn(id, outcome)?;
    Ok(session
        .transcript()
        .last()
        .map(|entry| entry.content.clone())
        .unwrap_or_default())
}

fn report_init(
    result: Result<(), crate::agent::InitError>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    match result {
        Ok(()) => writeln!(out, "Agent initialized successfully!"),
        Err(err) => writeln!(out, "Error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FailingBuilder, FakeBuilder, FakeProbe};

    fn session() -> ChatSession {
        ChatSession::new(
            "browser_mcp.json",
            vec!["qwen-qwq-32b".into(), "groq/llama-3.3-70b".into()],
        )
    }

    async fn exec(session: &mut ChatSession, builder: &dyn AgentBuilder, line: &str) -> String {
        let mut out = Vec::new();
        let command = parse_command(line).unwrap();
        execute(session, builder, command, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("/new"), Some(Command::New));
        assert_eq!(parse_command("/models"), Some(Command::Models));
        assert_eq!(
            parse_command("/model  groq/llama-3.3-70b "),
            Some(Command::Model("groq/llama-3.3-70b".into()))
        );
        assert!(matches!(parse_command("/model"), Some(Command::Unknown(_))));
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
        assert_eq!(
            parse_command("  what is 2+2?  "),
            Some(Command::Message("  what is 2+2?".into()))
        );
        assert!(matches!(parse_command("/bogus"), Some(Command::Unknown(_))));
    }

    #[tokio::test]
    async fn message_initializes_and_answers() {
        let probe = FakeProbe::default();
        let builder = FakeBuilder::new(probe.clone());
        let mut session = session();
        let output = exec(&mut session, &builder, "hello").await;
        assert!(output.contains("Agent initialized successfully!"));
        assert!(output.contains("echo: hello"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn failing_initialization_is_reported_per_message() {
        let mut session = session();
        let output = exec(&mut session, &FailingBuilder, "hello").await;
        assert!(output.contains("Error: Groq API key missing"));
        assert!(output.contains("Agent is not initialized"));
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn model_switch_and_listing() {
        let probe = FakeProbe::default();
        let builder = FakeBuilder::new(probe.clone());
        let mut session = session();
        let output = exec(&mut session, &builder, "/model groq/llama-3.3-70b").await;
        assert!(output.contains("Model set to groq/llama-3.3-70b"));
        assert_eq!(probe.last_model().as_deref(), Some("groq/llama-3.3-70b"));

        let listing = exec(&mut session, &builder, "/models").await;
        assert_eq!(listing, "  qwen-qwq-32b\n* groq/llama-3.3-70b\n");
    }

    #[tokio::test]
    async fn new_conversation_clears_memory() {
        let probe = FakeProbe::default();
        let builder = FakeBuilder::new(probe.clone());
        let mut session = session();
        exec(&mut session, &builder, "hi").await;
        exec(&mut session, &builder, "/new").await;
        assert!(session.transcript().is_empty());
        assert_eq!(probe.clear_calls(), 1);
    }
}
