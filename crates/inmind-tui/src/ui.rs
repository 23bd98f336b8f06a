use inmind_core::{ChatMessage, ChatRole, SessionPhase};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

const MAX_INPUT_LINES: u16 = 4;

/// Convert `**bold**` runs to styled spans. An unmatched marker stays literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut parts: Vec<String> = text.split("**").map(str::to_string).collect();
    if parts.len() % 2 == 0 {
        let tail = parts.pop().unwrap_or_default();
        if let Some(last) = parts.last_mut() {
            last.push_str("**");
            last.push_str(&tail);
        }
    }

    let spans: Vec<Span<'static>> = parts
        .into_iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part, Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part)
            }
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Lines for one message: role label, text, then intent and entities for
/// assistant replies that carry them. Ends with a blank separator line.
pub fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match msg.role() {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in msg.content().lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for line in msg.content().lines() {
                lines.push(parse_markdown_line(line));
            }

            if let Some(intent) = msg.intent() {
                lines.push(Line::from(Span::styled(
                    format!(" {} ", intent),
                    Style::default().bg(Color::Magenta).fg(Color::White),
                )));

                if let Some(entities) = msg.entities().filter(|e| !e.is_empty()) {
                    let mut spans = Vec::new();
                    for (i, (key, value)) in entities.iter().enumerate() {
                        if i > 0 {
                            spans.push(Span::raw(" "));
                        }
                        spans.push(Span::styled(
                            format!("{}: {}", key, value),
                            Style::default().fg(Color::Magenta),
                        ));
                    }
                    lines.push(Line::from(spans));
                }
            }
        }
    }

    lines.push(Line::default());
    lines
}

/// Rows the text takes once word-wrapped to `width`, counted by the same
/// wrapper that renders it. Measured without a block so borders are excluded.
fn wrapped_rows(text: &Text, width: u16) -> u16 {
    let rows = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_height = u16::from(app.session.last_error().is_some());
    let input_lines = (app.input.text().lines().count().max(1) as u16).min(MAX_INPUT_LINES);

    let [header_area, chat_area, notice_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(notice_height),
        Constraint::Length(input_lines + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if notice_height > 0 {
        render_notice(app, frame, notice_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" InMind ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            "AI-Powered Product Recommendations ",
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!("[{}]", app.api_url), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = match app.session.conversation_id() {
        Some(id) => format!(" Conversation {} ", id),
        None => " Conversation ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.messages() {
        lines.extend(message_lines(msg));
    }

    if app.session.is_pending() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(usize::from(app.animation_frame) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let text = Text::from(lines);

    // Inner size minus borders, kept for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_total_lines = wrapped_rows(&text, area.width.saturating_sub(2));
    app.chat_scroll = if app.follow_tail {
        app.max_scroll()
    } else {
        app.chat_scroll.min(app.max_scroll())
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(error) = app.session.last_error() else {
        return;
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", error),
        Style::default().fg(Color::White).bg(Color::Red).bold(),
    )];
    if app.session.phase() == SessionPhase::Failed {
        spans.push(Span::styled(
            " Press Ctrl+R to try again.",
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let (border_color, title) = if enabled {
        (Color::Yellow, " Message (Enter to send, Shift+Enter for new line) ")
    } else {
        (Color::DarkGray, " Message (waiting for the assistant) ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Keep the cursor visible by scrolling both ways
    let inner_width = usize::from(area.width.saturating_sub(2));
    let inner_height = usize::from(area.height.saturating_sub(2));
    let (line, col) = app.input.cursor_line_col();
    let row_offset = line.saturating_sub(inner_height.saturating_sub(1));
    let col_offset = if inner_width > 0 && col >= inner_width {
        col - inner_width + 1
    } else {
        0
    };

    let text_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(app.input.text().to_string())
        .style(text_style)
        .block(block)
        .scroll((row_offset as u16, col_offset as u16));

    frame.render_widget(input, area);

    if enabled {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (line - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let status = match app.session.phase() {
        SessionPhase::Uninitialized | SessionPhase::Starting => (" CONNECTING ", Color::Blue),
        SessionPhase::Ready => (" READY ", Color::Green),
        SessionPhase::Sending => (" SENDING ", Color::Yellow),
        SessionPhase::Failed => (" OFFLINE ", Color::Red),
    };

    let mut hints = vec![
        Span::styled(status.0, Style::default().bg(status.1).fg(Color::Black)),
        Span::raw(" "),
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ↑/↓ PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
    ];
    if app.session.phase() == SessionPhase::Failed {
        hints.push(Span::styled(" Ctrl+R ", key_style));
        hints.push(Span::styled(" retry ", label_style));
    }
    hints.push(Span::styled(" Esc ", key_style));
    hints.push(Span::styled(" quit ", label_style));

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::tests::idle_app;
    use async_trait::async_trait;
    use inmind_core::{
        ChatBackend, ChatReply, ClientError, ConversationId, ConversationSummary, Entities,
        HealthStatus, MessageId, ModelHealth, Operation, SessionController, StartedConversation,
    };
    use ratatui::{backend::TestBackend, Terminal};

    const LONG_REPLY: &str = "Here are several lightweight running shoes with \
        responsive cushioning, breathable uppers, durable outsoles and \
        reflective details, all comfortably within your budget and available \
        in wide fittings for anyone training regularly on pavement, gravel \
        or forest trails, plus one final recommendation: zephyr";

    /// Backend that greets and then answers every message with `LONG_REPLY`.
    struct LongReplyBackend;

    fn unsupported(operation: Operation) -> ClientError {
        ClientError::InvalidInput {
            operation,
            reason: "not supported in this test",
        }
    }

    #[async_trait]
    impl ChatBackend for LongReplyBackend {
        async fn health(&self) -> Result<HealthStatus, ClientError> {
            Err(unsupported(Operation::Health))
        }

        async fn model_health(&self) -> Result<ModelHealth, ClientError> {
            Err(unsupported(Operation::ModelHealth))
        }

        async fn start_conversation(
            &self,
            _user_id: &str,
        ) -> Result<StartedConversation, ClientError> {
            Ok(StartedConversation {
                conversation_id: ConversationId::new("c1"),
                greeting: "Hi".to_string(),
            })
        }

        async fn send_message(
            &self,
            conversation_id: &ConversationId,
            _text: &str,
        ) -> Result<ChatReply, ClientError> {
            Ok(ChatReply {
                conversation_id: conversation_id.clone(),
                response: LONG_REPLY.to_string(),
                intent: None,
                entities: Entities::new(),
                state: None,
            })
        }

        async fn get_conversation(
            &self,
            _conversation_id: &ConversationId,
        ) -> Result<ConversationSummary, ClientError> {
            Err(unsupported(Operation::GetConversation))
        }

        async fn end_conversation(
            &self,
            _conversation_id: &ConversationId,
        ) -> Result<String, ClientError> {
            Err(unsupported(Operation::EndConversation))
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_user_message_has_no_metadata_lines() {
        let msg = ChatMessage::user(MessageId(1), "show me running shoes");
        let lines: Vec<String> = message_lines(&msg).iter().map(line_text).collect();
        assert_eq!(lines, vec!["You:", "show me running shoes", ""]);
    }

    #[test]
    fn test_assistant_message_shows_intent_and_entities() {
        let mut entities = Entities::new();
        entities.insert("price".to_string(), "under 100".to_string());
        entities.insert("category".to_string(), "shoes".to_string());
        let msg = ChatMessage::assistant(
            MessageId(2),
            "Here are some options",
            Some("product_search".to_string()),
            Some(entities),
        );

        let lines: Vec<String> = message_lines(&msg).iter().map(line_text).collect();
        assert_eq!(
            lines,
            vec![
                "Assistant:",
                "Here are some options",
                " product_search ",
                "category: shoes price: under 100",
                "",
            ]
        );
    }

    #[test]
    fn test_entities_need_an_intent() {
        let mut entities = Entities::new();
        entities.insert("category".to_string(), "shoes".to_string());
        let msg = ChatMessage::assistant(MessageId(3), "Hello", None, Some(entities));

        let lines: Vec<String> = message_lines(&msg).iter().map(line_text).collect();
        assert_eq!(lines, vec!["Assistant:", "Hello", ""]);
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("a **bold** move");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "bold");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let line = parse_markdown_line("price **under 100");
        assert_eq!(line_text(&line), "price **under 100");
        assert_eq!(line.spans.len(), 1);
    }

    #[test]
    fn test_wrapped_rows() {
        let text = Text::from(vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")]);
        assert_eq!(wrapped_rows(&text, 4), 3 + 1 + 1);

        // Word wrapping moves whole words down, so this needs more rows than
        // its character count alone suggests.
        let text = Text::from("aaaaaa bbbbbb cccccc");
        assert_eq!(wrapped_rows(&text, 10), 3);
    }

    #[test]
    fn test_render_idle_screen() {
        let mut app = idle_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("InMind"));
        assert!(screen.contains("waiting for the assistant"));
        assert!(screen.contains("CONNECTING"));
        assert!(!screen.contains("Thinking"));
    }

    #[tokio::test]
    async fn test_follow_tail_shows_end_of_long_reply() {
        let session = SessionController::new(Arc::new(LongReplyBackend), "user-001");
        let mut app = App::new(session, "http://localhost:8000/api");
        app.activate();
        assert!(app.session.settle().await);
        app.submit("shoes");
        assert!(app.session.settle().await);
        assert!(app.follow_tail);

        let mut terminal = Terminal::new(TestBackend::new(24, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.chat_scroll > 0);
        assert_eq!(app.chat_scroll, app.max_scroll());
        assert!(screen_text(&terminal).contains("zephyr"));
    }
}
