use crate::app::App;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use therapist_core::persona::{GREETING, HEADING, INPUT_PLACEHOLDER, THINKING};
use therapist_core::{Bubble, ChatRole};

/// Convert **bold** markdown in one line to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            // Unclosed or empty: keep the rest literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

fn role_style(role: ChatRole) -> Style {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn bubble_lines(bubble: &Bubble, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(Span::styled(
        format!("{} {}:", bubble.avatar, bubble.label),
        role_style(bubble.role),
    )));
    match bubble.role {
        ChatRole::User => {
            for line in bubble.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant => {
            for line in bubble.content.lines() {
                lines.push(parse_markdown_line(line));
            }
        }
    }
    lines.push(Line::default());
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, greeting_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header_area);
    render_greeting(frame, greeting_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            format!(" 🧠 {} ", HEADING),
            Style::default().fg(Color::Red).bold(),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_greeting(frame: &mut Frame, area: Rect) {
    let greeting = Paragraph::new(Line::from(Span::styled(
        format!(" {} 💬", GREETING),
        Style::default().fg(Color::Cyan).bold(),
    )));
    frame.render_widget(greeting, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, for scroll calculations
    app.set_chat_area(area.width.saturating_sub(2), area.height.saturating_sub(2));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.model()));

    let text = if app.transcript.is_empty() && !app.is_loading() && app.error.is_none() {
        Text::from(Span::styled(
            "Share whatever is on your mind...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for bubble in app.transcript.render() {
            bubble_lines(&bubble, &mut lines);
        }

        if let Some(error) = &app.error {
            lines.push(Line::from(Span::styled(
                "⚠ Error:",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            for line in error.lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                format!("{} {}:", ChatRole::Assistant.avatar(), ChatRole::Assistant.label()),
                role_style(ChatRole::Assistant),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{}{}", THINKING, dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_loading() {
        Color::DarkGray
    } else {
        Color::Yellow
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", INPUT_PLACEHOLDER));

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    let cursor_x = (app.cursor - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.is_loading() {
        Span::styled(" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        Span::styled(" READY ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let footer = Line::from(vec![
        status,
        Span::styled(
            " Enter send | ↑↓ PgUp/PgDn scroll | Esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use therapist_core::ai::ScriptedModel;
    use therapist_core::{AgentConfig, ChatMessage, TurnHandler};

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        let mut out = String::new();
        for (i, cell) in buffer.content.iter().enumerate() {
            out.push_str(cell.symbol());
            if (i + 1) % width == 0 {
                out.push('\n');
            }
        }
        out
    }

    fn app() -> App {
        let agent = AgentConfig::new("a", "b", "gemini-2.0-flash", Arc::new(ScriptedModel::new()));
        App::new(TurnHandler::new(agent))
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("try **breathing** slowly");
        let spans = &line.spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].content, "try ");
        assert_eq!(spans[1].content, "breathing");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].content, " slowly");
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn test_empty_chat_shows_copy() {
        let out = screen(&mut app());
        assert!(out.contains(HEADING));
        assert!(out.contains(INPUT_PLACEHOLDER));
        assert!(out.contains("Share whatever is on your mind"));
    }

    #[test]
    fn test_transcript_rendered_in_order() {
        let mut app = app();
        app.transcript.append(ChatMessage::user("I feel anxious today"));
        app.transcript
            .append(ChatMessage::assistant("What do you think led to that feeling?"));

        let out = screen(&mut app);
        let user = out.find("I feel anxious today").unwrap();
        let reply = out.find("What do you think led to that feeling?").unwrap();
        assert!(user < reply);
        assert!(out.contains("You:"));
        assert!(out.contains("Therapist:"));
    }

    #[test]
    fn test_error_rendered_inline() {
        let mut app = app();
        app.transcript.append(ChatMessage::user("hello"));
        app.error = Some("the model provider returned an empty reply".to_string());

        let out = screen(&mut app);
        assert!(out.contains("Error:"));
        assert!(out.contains("the model provider returned an empty reply"));
    }

    #[test]
    fn test_newest_entry_visible_after_shrinking() {
        let mut app = app();
        for i in 0..20 {
            app.transcript.append(ChatMessage::user(format!("question {i}")));
            app.transcript.append(ChatMessage::assistant(format!("answer {i}")));
        }
        app.scroll_to_bottom();
        let tall = screen(&mut app);
        assert!(tall.contains("answer 19"));

        app.scroll_to_bottom();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let small: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(small.contains("answer 19"));
    }

    #[tokio::test]
    async fn test_loading_shows_thinking() {
        let mut app = app();
        app.input = "hello".to_string();
        app.submit();

        let out = screen(&mut app);
        assert!(out.contains(THINKING));
        assert!(out.contains("WAITING"));
    }
}
