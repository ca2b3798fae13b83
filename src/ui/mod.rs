use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::agent::Role;
use crate::app::App;
use crate::definitions::{FocusArea, NoticeKind};

mod theme;
use theme::*;

const TITLE: &str = "MCP Chat";
const TAGLINE: &str = "Chat with an AI agent that can use MCP tools";
const SIDEBAR_WIDTH: u16 = 32;

fn cell_width(text: &str) -> u16 {
    UnicodeWidthStr::width(text).min(u16::MAX as usize) as u16
}

pub fn render(f: &mut Frame<'_>, app: &App) {
    let size = f.size();
    if size.width < 60 || size.height < 16 {
        let block = Paragraph::new("Terminal too small, resize to at least 60x16.")
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(TITLE)
                    .borders(Borders::ALL)
                    .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG)),
            )
            .style(Style::default().fg(FG_PRIMARY).bg(BG_PRIMARY));
        f.render_widget(block, size);
        return;
    }

    let base = Block::default().style(Style::default().bg(BG_PRIMARY));
    f.render_widget(base, size);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(size);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(vertical[1]);

    render_header(f, vertical[0]);
    render_sidebar(f, app, body[0]);
    render_chat(f, app, body[1]);
    render_status_bar(f, app, vertical[2]);
}

fn render_header(f: &mut Frame<'_>, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            format!(" {}", TITLE),
            Style::default()
                .fg(BAR_HIGHLIGHT_TEXT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {}", TAGLINE),
            Style::default().fg(BAR_TEXT),
        )),
    ];
    let header = Paragraph::new(lines).style(Style::default().bg(BAR_BG));
    f.render_widget(Clear, area);
    f.render_widget(header, area);
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default()
            .fg(BORDER_FOCUS)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(BORDER_IDLE)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, Style::default().fg(FG_PRIMARY)))
        .style(Style::default().bg(BG_PANEL))
}

fn render_sidebar(f: &mut Frame<'_>, app: &App, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(4),
            Constraint::Length(6),
        ])
        .split(area);

    render_model_list(f, app, sections[0]);

    let actions = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Ctrl+N ", Style::default().fg(BORDER_FOCUS)),
            Span::styled("New conversation", Style::default().fg(FG_PRIMARY)),
        ]),
        Line::from(vec![
            Span::styled("Ctrl+Q ", Style::default().fg(BORDER_FOCUS)),
            Span::styled("Quit", Style::default().fg(FG_PRIMARY)),
        ]),
    ])
    .block(panel_block("Actions", false));
    f.render_widget(actions, sections[1]);

    let about = Paragraph::new(format!(
        "Messages go to an LLM agent that can call the tools of the MCP servers in {}.",
        app.session.config_path().display()
    ))
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(FG_DIM))
    .block(panel_block("About", false));
    f.render_widget(about, sections[2]);
}

fn render_model_list(f: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus == FocusArea::Models;
    let selected = app.session.selected_model();
    let items: Vec<ListItem> = app
        .session
        .models()
        .iter()
        .map(|model| {
            let (marker, style) = if model == selected {
                (
                    "● ",
                    Style::default()
                        .fg(HIGHLIGHT_FG)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(FG_PRIMARY))
            };
            ListItem::new(Line::from(Span::styled(format!("{}{}", marker, model), style)))
        })
        .collect();

    let mut state = ListState::default();
    if focused {
        state.select(Some(app.model_cursor));
    }
    let list = List::new(items)
        .block(panel_block("Models (Tab)", focused))
        .highlight_style(
            Style::default()
                .bg(PANEL_HIGHLIGHT_BG)
                .fg(HIGHLIGHT_FG),
        );
    f.render_stateful_widget(list, area, &mut state);
}

fn render_chat(f: &mut Frame<'_>, app: &App, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(6)])
        .split(area);
    render_transcript(f, app, sections[0]);
    render_composer(f, app, sections[1]);
}

fn render_transcript(f: &mut Frame<'_>, app: &App, area: Rect) {
    let block = panel_block("Conversation", false);
    let wrap_width = block.inner(area).width.max(1) as usize;
    let transcript = app.session.transcript();

    if transcript.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            "Send a message to start the conversation!",
            Style::default()
                .fg(FG_DIM)
                .add_modifier(Modifier::ITALIC),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    let mut items: Vec<ListItem> = transcript
        .entries()
        .iter()
        .map(|entry| {
            let (title, title_style, body_style) = match entry.role {
                Role::User => (
                    "You",
                    Style::default().fg(USER_FG).add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::White),
                ),
                Role::Assistant => (
                    "Assistant",
                    Style::default()
                        .fg(ASSISTANT_FG)
                        .add_modifier(Modifier::BOLD),
                    Style::default().fg(FG_PRIMARY),
                ),
            };
            let mut lines = vec![Line::from(Span::styled(title, title_style))];
            if entry.content.is_empty() {
                push_wrapped_line(&mut lines, "", body_style, wrap_width);
            } else {
                for line in entry.content.lines() {
                    push_wrapped_line(&mut lines, line, body_style, wrap_width);
                }
            }
            lines.push(Line::default());
            ListItem::new(lines)
        })
        .collect();

    if app.is_thinking() {
        items.push(ListItem::new(Line::from(Span::styled(
            "Thinking...",
            Style::default()
                .fg(FG_DIM)
                .add_modifier(Modifier::ITALIC),
        ))));
    }

    let mut state = ListState::default();
    state.select(Some(transcript.selected_index()));
    let list = List::new(items)
        .block(block)
        .style(Style::default().bg(BG_PANEL))
        .highlight_style(Style::default().bg(BG_PANEL));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_composer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus == FocusArea::Composer;
    let block = panel_block("Message (Enter to send / Shift+Enter for newline)", focused);
    let inner = block.inner(area);

    let lines: Vec<Line> = if app.composer.is_empty() {
        vec![Line::from(Span::styled(
            "Type your message here...",
            Style::default().fg(FG_DIM),
        ))]
    } else {
        app.composer
            .buffer()
            .split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(FG_PRIMARY))))
            .collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(BG_PANEL))
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);

    if focused {
        let width = inner.width.max(1) as usize;
        let (col, row) = app.composer.cursor_display_position(width);
        let x = inner
            .x
            .saturating_add(col.min(width.saturating_sub(1) as u16));
        let y = inner
            .y
            .saturating_add(row.min(inner.height.saturating_sub(1)));
        f.set_cursor(x, y);
    }
}

fn push_wrapped_line(lines: &mut Vec<Line>, text: &str, style: Style, width: usize) {
    for segment in wrap_to_width(text, width) {
        lines.push(Line::from(Span::styled(segment, style)));
    }
}

fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if current_width + ch_width > width && !current.is_empty() {
            result.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }
    result.push(current);
    result
}

/// Text and style of the right-hand status message.
fn status_text(app: &App) -> (String, Style) {
    if app.needs_initialization() {
        return (
            String::from("Initializing agent..."),
            Style::default().fg(BAR_TEXT),
        );
    }
    let style = match app.status_kind {
        NoticeKind::Info => Style::default().fg(BAR_TEXT),
        NoticeKind::Success => Style::default()
            .fg(SUCCESS_FG)
            .add_modifier(Modifier::BOLD),
        NoticeKind::Error => Style::default().fg(ERROR_FG).add_modifier(Modifier::BOLD),
    };
    (app.status_message.clone(), style)
}

fn render_status_bar(f: &mut Frame<'_>, app: &App, area: Rect) {
    let agent_state = if app.is_thinking() {
        "BUSY"
    } else if app.session.is_ready() {
        "READY"
    } else {
        "OFF"
    };
    let segments = [
        format!("[MODEL:{}]", app.session.selected_model()),
        format!("[AGENT:{}]", agent_state),
        format!("[FOCUS:{}]", app.focus.label()),
    ];

    f.render_widget(Clear, area);
    let mut spans: Vec<Span> = Vec::new();
    let mut used = 0u16;
    for text in segments {
        used = used.saturating_add(cell_width(&text) + 1);
        spans.push(Span::styled(text, Style::default().fg(BAR_TEXT).bg(BAR_BG)));
        spans.push(Span::styled(" ", Style::default().bg(BAR_BG)));
    }
    let (message, style) = status_text(app);
    if used < area.width {
        spans.push(Span::styled(message, style.bg(BAR_HIGHLIGHT_BG)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(BAR_TEXT).bg(BAR_BG))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::agent::ChatSession;
    use crate::agent::testing::{FakeBuilder, FakeProbe};

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app() -> App {
        let session = ChatSession::new("browser_mcp.json", vec!["qwen-qwq-32b".into()]);
        App::new(session, Arc::new(FakeBuilder::new(FakeProbe::default())))
    }

    #[test]
    fn wraps_by_display_width() {
        assert_eq!(wrap_to_width("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_to_width("你好嗎", 4), vec!["你好", "嗎"]);
        assert_eq!(wrap_to_width("", 4), vec![String::new()]);
    }

    #[test]
    fn empty_transcript_shows_the_hint() {
        let app = app();
        let screen = draw(&app, 100, 30);
        assert!(screen.contains("Send a message to start the conversation!"));
        assert!(screen.contains("qwen-qwq-32b"));
        assert!(screen.contains("Initializing agent..."));
    }

    #[tokio::test]
    async fn transcript_entries_are_labelled() {
        let mut app = app();
        app.initialize_agent_runtime().await;
        app.session.submit("What is on example.com?").await.unwrap();
        let screen = draw(&app, 100, 30);
        assert!(screen.contains("You"));
        assert!(screen.contains("Assistant"));
        assert!(screen.contains("echo: What is on example.com?"));
        assert!(screen.contains("[AGENT:READY]"));
    }

    #[test]
    fn tiny_terminals_get_a_notice() {
        let screen = draw(&app(), 40, 10);
        assert!(screen.contains("Terminal too small"));
    }
}
