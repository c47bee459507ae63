use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, EditTarget, InputMode, LineInput};
use copilot_core::{
    inspect, project, ChatRole, Citation, Inspection, NotificationKind, TranscriptEntry, Usage,
};

const SIDEBAR_WIDTH: u16 = 38;
const TOAST_WIDTH: u16 = 44;
const EMPTY_INSPECTION: &str = "Send a message to see usage and request_id.";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        chars.next();

        // Find closing **
        let mut bold_text = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            bold_text.push(c);
        }

        if found_close && !bold_text.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(
                bold_text,
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            // No closing **, treat as literal
            current_text.push_str("**");
            current_text.push_str(&bold_text);
            if found_close {
                current_text.push_str("**");
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

/// Display lines for the reported usage metrics, skipping absent fields
fn usage_lines(usage: &Usage) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(tokens_in) = usage.tokens_in {
        lines.push(format!("Tokens in:  {}", tokens_in));
    }
    if let Some(tokens_out) = usage.tokens_out {
        lines.push(format!("Tokens out: {}", tokens_out));
    }
    if let Some(cost) = usage.estimated_cost_usd {
        lines.push(format!("Cost:       ${:.4}", cost));
    }
    if let Some(latency) = usage.latency_ms {
        lines.push(format!("Latency:    {:.0} ms", latency));
    }
    if let Some(version) = usage.prompt_version.as_deref() {
        lines.push(format!("Prompt:     {}", version));
    }
    lines
}

/// Horizontal scroll offset that keeps the cursor inside an input of `width` cells
fn input_scroll_offset(cursor: usize, width: usize) -> usize {
    if width == 0 || cursor < width {
        0
    } else {
        cursor - width + 1
    }
}

fn notification_color(kind: NotificationKind) -> Color {
    match kind {
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
        NotificationKind::Warning => Color::Yellow,
        NotificationKind::Info => Color::Cyan,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Conversation on the left, sidebar on the right
    let [conversation_area, sidebar_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
    ])
    .areas(body_area);

    render_conversation(app, frame, conversation_area);
    render_sidebar(app, frame, sidebar_area);
    render_footer(app, frame, footer_area);

    render_notifications(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Support Copilot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("POST {}/v1/chat", app.base_url),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match (app.input_mode, app.edit_target) {
        (InputMode::Normal, _) => &[
            (" i ", " message "),
            (" u ", " user "),
            (" s ", " session "),
            (" o ", " options "),
            (" j/k ", " scroll "),
            (" G ", " bottom "),
            (" d ", " dismiss "),
            (" q ", " quit "),
        ],
        (InputMode::Editing, EditTarget::Message) => &[(" Enter ", " send "), (" Esc ", " done ")],
        (InputMode::Editing, _) => &[(" Enter ", " save "), (" Esc ", " cancel ")],
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }
    if app.is_pending() {
        spans.push(Span::styled(
            " waiting for reply ",
            Style::default().bg(Color::Black).fg(Color::Yellow),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn transcript_text(app: &App) -> Text<'static> {
    let entries = project(app.machine.conversation());
    if entries.is_empty() {
        return Text::from(Span::styled(
            "Ask about an order, a return, or shipping...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let you_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let ai_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();
    for entry in entries {
        match entry {
            TranscriptEntry::Message {
                role: ChatRole::User,
                content,
            } => {
                lines.push(Line::from(Span::styled("You:", you_style)));
                lines.push(Line::from(content.to_string()));
                lines.push(Line::default());
            }
            TranscriptEntry::Message {
                role: ChatRole::Assistant,
                content,
            } => {
                lines.push(Line::from(Span::styled("AI:", ai_style)));
                for line in content.lines() {
                    lines.push(parse_markdown_line(line));
                }
                lines.push(Line::default());
            }
            TranscriptEntry::Typing => {
                lines.push(Line::from(Span::styled("AI:", ai_style)));
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
    }
    Text::from(lines)
}

fn render_conversation(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store chat area for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    if app.follow_bottom {
        app.scroll_to_bottom();
    }

    let session = app.machine.session();
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat: {} ", session.session_id));

    let chat = Paragraph::new(transcript_text(app))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing && app.edit_target == EditTarget::Message;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_pending() {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Use cyan text to match the "You:" style
    render_line_input(
        frame,
        &app.message_input,
        input_block,
        Style::default().fg(Color::Cyan),
        input_area,
        editing,
    );
}

/// Draw a single-line input inside `block`, scrolled so the cursor stays visible
fn render_line_input(
    frame: &mut Frame,
    input: &LineInput,
    block: Block<'_>,
    style: Style,
    area: Rect,
    show_cursor: bool,
) {
    let inner = block.inner(area);
    let width = inner.width as usize;
    let offset = input_scroll_offset(input.cursor(), width);

    let visible: String = input.text().chars().skip(offset).take(width).collect();
    frame.render_widget(Paragraph::new(visible).style(style).block(block), area);

    if show_cursor {
        let cursor_x = (input.cursor() - offset) as u16;
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    if !app.show_options {
        render_inspection(app, frame, area);
        return;
    }

    let [options_area, inspection_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(0)]).areas(area);
    render_options(app, frame, options_area);
    render_inspection(app, frame, inspection_area);
}

fn render_options(app: &App, frame: &mut Frame, area: Rect) {
    let editing_field = match (app.input_mode, app.edit_target) {
        (InputMode::Editing, EditTarget::UserId) => Some(EditTarget::UserId),
        (InputMode::Editing, EditTarget::SessionId) => Some(EditTarget::SessionId),
        _ => None,
    };

    let border_color = if editing_field.is_some() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Options ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let session = app.machine.session();
    let label_style = Style::default().fg(Color::DarkGray);
    let fields = [
        (EditTarget::UserId, "User ID (u)", session.user_id.as_str()),
        (EditTarget::SessionId, "Session ID (s)", session.session_id.as_str()),
    ];

    for (row, (target, label, value)) in fields.into_iter().enumerate() {
        let y = inner.y + (row as u16) * 2;
        if y + 1 >= inner.y + inner.height {
            break;
        }
        frame.render_widget(
            Paragraph::new(Span::styled(label, label_style)),
            Rect::new(inner.x, y, inner.width, 1),
        );

        let value_area = Rect::new(inner.x, y + 1, inner.width, 1);
        if editing_field == Some(target) {
            render_line_input(
                frame,
                &app.field_input,
                Block::default(),
                Style::default().fg(Color::Yellow),
                value_area,
                true,
            );
        } else {
            frame.render_widget(Paragraph::new(value.to_string()), value_area);
        }
    }
}

fn citation_lines(citations: &[Citation]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "Citations",
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ))];
    for citation in citations {
        lines.push(Line::from(format!("- {}", citation.label())));
        if let Some(url) = citation.url.as_deref() {
            lines.push(Line::from(Span::styled(
                format!("  {}", url),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            )));
        }
    }
    lines
}

fn inspection_text(inspection: Inspection<'_>) -> Text<'static> {
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    };

    match inspection {
        Inspection::Empty => Text::from(Span::styled(
            EMPTY_INSPECTION,
            Style::default().fg(Color::DarkGray),
        )),
        Inspection::Failure { message } => Text::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )),
        Inspection::Answer {
            request_id,
            citations,
            usage,
            warnings,
        } => {
            let mut lines: Vec<Line> = Vec::new();

            if let Some(request_id) = request_id {
                lines.push(heading("Request"));
                lines.push(Line::from(request_id.to_string()));
                lines.push(Line::default());
            }

            if let Some(usage) = usage {
                lines.push(heading("Usage"));
                lines.extend(usage_lines(usage).into_iter().map(Line::from));
                lines.push(Line::default());
            }

            if let Some(citations) = citations {
                lines.extend(citation_lines(citations));
                lines.push(Line::default());
            }

            for warning in warnings {
                lines.push(Line::from(Span::styled(
                    format!("! {}", warning),
                    Style::default().fg(Color::Yellow),
                )));
            }

            if lines.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No usage or citations reported.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Text::from(lines)
        }
    }
}

fn render_inspection(app: &App, frame: &mut Frame, area: Rect) {
    let title = if app.is_pending() {
        " Last response (waiting) "
    } else {
        " Last response "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let panel = Paragraph::new(inspection_text(inspect(app.machine.conversation())))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

/// Stack active notifications in the top-right corner, newest on top
fn render_notifications(app: &App, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let x = area.x + area.width - width;
    let mut y = area.y + 1;

    for notification in app.notifications.iter().rev() {
        // Inner width minus borders; at least one line of text
        let inner_width = width.saturating_sub(2).max(1) as usize;
        let text_lines = notification.message().chars().count().div_ceil(inner_width).max(1);
        let height = (text_lines as u16 + 2).min(6);
        if y + height > area.y + area.height {
            break;
        }

        let toast_area = Rect::new(x, y, width, height);
        let color = notification_color(notification.kind());
        let toast = Paragraph::new(notification.message().to_string())
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            );

        frame.render_widget(Clear, toast_area);
        frame.render_widget(toast, toast_area);
        y += height;
    }
}
