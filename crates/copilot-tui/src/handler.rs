use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, EditTarget, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(Instant::now()),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.start_editing(EditTarget::Message),
        KeyCode::Char('u') => app.start_editing(EditTarget::UserId),
        KeyCode::Char('s') => app.start_editing(EditTarget::SessionId),
        KeyCode::Char('o') => app.show_options = !app.show_options,
        KeyCode::Char('d') => app.dismiss_latest_notification(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::PageDown => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_down();
            }
        }
        KeyCode::PageUp => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.stop_editing(),
        KeyCode::Enter => match app.edit_target {
            EditTarget::Message => {
                app.send_message();
                // Keep typing if the send was refused (blank or still waiting)
                if app.message_input.text().is_empty() {
                    app.stop_editing();
                }
            }
            EditTarget::UserId | EditTarget::SessionId => app.commit_field(),
        },
        KeyCode::Backspace => app.active_input().backspace(),
        KeyCode::Delete => app.active_input().delete(),
        KeyCode::Left => app.active_input().left(),
        KeyCode::Right => app.active_input().right(),
        KeyCode::Home => app.active_input().home(),
        KeyCode::End => app.active_input().end(),
        // Chords like Ctrl-A are not text
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.active_input().insert(c)
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing {
        return;
    }
    // Single-line input: fold newlines into spaces
    let input = app.active_input();
    for c in text.chars() {
        input.insert(if c == '\n' || c == '\r' { ' ' } else { c });
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LineInput;
    use async_trait::async_trait;
    use copilot_core::{ChatRequest, ChatTransport, RawReply, Session};
    use std::sync::Arc;

    struct EmptyAnswer;

    #[async_trait]
    impl ChatTransport for EmptyAnswer {
        async fn send(&self, _request: &ChatRequest) -> RawReply {
            RawReply::http(200, r#"{"answer":""}"#)
        }
    }

    fn app() -> App {
        App::with_transport(
            Session {
                user_id: "demo-user".to_string(),
                session_id: "session-1".to_string(),
            },
            "http://localhost:8001".to_string(),
            Arc::new(EmptyAnswer),
        )
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn test_q_quits_only_in_normal_mode() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('i'))).unwrap();
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.message_input.text(), "q");

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_enter_on_blank_message_keeps_editing() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(app.machine.conversation().turns().is_empty());
    }

    #[tokio::test]
    async fn test_enter_sends_and_leaves_editing() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('i'))).unwrap();
        type_text(&mut app, "track order 1234");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.is_pending());
        assert_eq!(app.machine.conversation().turns()[0].content(), "track order 1234");
    }

    #[test]
    fn test_session_field_edit() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('s'))).unwrap();
        for _ in 0.."session-1".len() {
            handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        }
        type_text(&mut app, "session-2");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.machine.session().session_id, "session-2");
        assert_eq!(app.message_input.text(), "");
    }

    #[test]
    fn test_modified_chars_are_not_typed() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('i'))).unwrap();
        type_text(&mut app, "hi");
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)),
        )
        .unwrap();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT)),
        )
        .unwrap();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('!'), KeyModifiers::SHIFT)),
        )
        .unwrap();

        assert_eq!(app.message_input.text(), "hi!");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_paste_folds_newlines() {
        let mut app = app();
        app.start_editing(EditTarget::Message);
        app.message_input = LineInput::default();
        handle_event(&mut app, AppEvent::Paste("line one\nline two".to_string())).unwrap();
        assert_eq!(app.message_input.text(), "line one line two");
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 5, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
