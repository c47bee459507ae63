use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use copilot_core::{
    project, ChatTransport, Config, HttpTransport, NotificationKind, Notifications, RawReply,
    Session, TranscriptEntry, TransportError, TurnMachine,
};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What the input line is currently editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Message,
    UserId,
    SessionId,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text buffer with a character cursor
#[derive(Debug, Default, Clone)]
pub struct LineInput {
    text: String,
    cursor: usize,
}

impl LineInput {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub edit_target: EditTarget,
    pub show_options: bool,

    // Input state
    pub message_input: LineInput,
    pub field_input: LineInput,

    // Conversation
    pub machine: TurnMachine,
    pub notifications: Notifications,
    pub transport: Arc<dyn ChatTransport>,
    pub request_task: Option<JoinHandle<RawReply>>,
    pub base_url: String,
    pub config_path: Option<PathBuf>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base_url = config.base_url();
        let transport = HttpTransport::new(&base_url, config.request_timeout())?;

        let mut app = Self::with_transport(config.session(), base_url, Arc::new(transport));
        app.config_path = Config::get_config_path().ok();
        Ok(app)
    }

    pub fn with_transport(
        session: Session,
        base_url: String,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            edit_target: EditTarget::Message,
            show_options: true,

            message_input: LineInput::default(),
            field_input: LineInput::default(),

            machine: TurnMachine::new(session),
            notifications: Notifications::new(),
            transport,
            request_task: None,
            base_url,
            config_path: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_bottom: true,
            chat_area: None,

            animation_frame: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.machine.conversation().is_pending()
    }

    /// Hand the typed message to the turn machine and start the request.
    ///
    /// Blank input or an outstanding request leaves the input untouched.
    pub fn send_message(&mut self) {
        let Some(request) = self.machine.begin(self.message_input.text()) else {
            return;
        };

        self.message_input.clear();
        self.follow_bottom = true;

        let transport = Arc::clone(&self.transport);
        self.request_task = Some(tokio::spawn(async move {
            transport.send(&request).await
        }));
    }

    /// Settle the outstanding request if its task has finished
    pub async fn poll_request(&mut self) {
        let finished = self
            .request_task
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.request_task.take() {
            self.settle_task(task).await;
        }
    }

    async fn settle_task(&mut self, task: JoinHandle<RawReply>) {
        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "request task did not complete");
                RawReply::Transport(TransportError::Aborted)
            }
        };
        self.machine.settle(reply, &mut self.notifications);
        self.follow_bottom = true;
    }

    /// Tick animation frame and expire notifications (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.notifications.expire(now);
    }

    pub fn dismiss_latest_notification(&mut self) {
        if let Some(id) = self.notifications.latest().map(|n| n.id().clone()) {
            self.notifications.dismiss(&id);
        }
    }

    pub fn start_editing(&mut self, target: EditTarget) {
        self.edit_target = target;
        self.input_mode = InputMode::Editing;

        let session = self.machine.session();
        match target {
            EditTarget::Message => {}
            EditTarget::UserId => self.field_input = LineInput::with_text(&session.user_id),
            EditTarget::SessionId => self.field_input = LineInput::with_text(&session.session_id),
        }
        if target != EditTarget::Message {
            self.show_options = true;
        }
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
        self.edit_target = EditTarget::Message;
    }

    /// The buffer the key handler should edit
    pub fn active_input(&mut self) -> &mut LineInput {
        match self.edit_target {
            EditTarget::Message => &mut self.message_input,
            EditTarget::UserId | EditTarget::SessionId => &mut self.field_input,
        }
    }

    /// Apply an edited user/session id; blank values are discarded
    pub fn commit_field(&mut self) {
        let value = self.field_input.text().trim().to_string();
        let target = self.edit_target;
        self.stop_editing();

        if value.is_empty() {
            return;
        }

        match target {
            EditTarget::UserId => self.machine.set_user_id(value),
            EditTarget::SessionId => self.machine.set_session_id(value),
            EditTarget::Message => return,
        }

        if let Some(path) = &self.config_path {
            if let Err(e) = Config::save_session(path, self.machine.session()) {
                warn!(error = %e, "could not save session settings");
                self.notifications
                    .notify(format!("Could not save settings: {}", e), NotificationKind::Warning);
                return;
            }
        }
        self.notifications
            .notify("Session settings updated", NotificationKind::Info);
    }

    // Chat viewport
    pub fn scroll_down(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    /// Estimated rendered height of the transcript at the current width
    pub fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for entry in project(self.machine.conversation()) {
            match entry {
                TranscriptEntry::Message { content, .. } => {
                    total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
                    for line in content.lines() {
                        // Use character count, not byte length, for proper UTF-8 handling
                        let char_count = line.chars().count();
                        let wrapped = char_count.div_ceil(wrap_width).max(1);
                        total_lines = total_lines.saturating_add(wrapped as u16);
                    }
                    total_lines = total_lines.saturating_add(1); // Blank line after message
                }
                TranscriptEntry::Typing => {
                    total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
                }
            }
        }

        total_lines
    }

    /// Largest scroll offset that still fills the viewport
    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.transcript_line_count().saturating_sub(visible_height)
    }

    /// Scroll chat to bottom so the newest turn is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_bottom = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copilot_core::{ChatRequest, ChatRole};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Answers every request with the same body once released
    struct GatedTransport {
        release: Notify,
        reply: RawReply,
    }

    #[async_trait]
    impl ChatTransport for GatedTransport {
        async fn send(&self, _request: &ChatRequest) -> RawReply {
            self.release.notified().await;
            self.reply.clone()
        }
    }

    fn app_with(reply: RawReply) -> (App, Arc<GatedTransport>) {
        let transport = Arc::new(GatedTransport {
            release: Notify::new(),
            reply,
        });
        let app = App::with_transport(
            Session {
                user_id: "demo-user".to_string(),
                session_id: "session-1".to_string(),
            },
            "http://localhost:8001".to_string(),
            transport.clone(),
        );
        (app, transport)
    }

    async fn wait_for_settle(app: &mut App) {
        for _ in 0..100 {
            app.poll_request().await;
            if !app.is_pending() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("request never settled");
    }

    #[test]
    fn test_line_input_utf8_editing() {
        let mut input = LineInput::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.text(), "hélo");
        input.home();
        input.delete();
        assert_eq!(input.text(), "élo");
        input.end();
        input.right();
        assert_eq!(input.cursor(), 3);
    }

    #[tokio::test]
    async fn test_send_and_settle() {
        let (mut app, transport) = app_with(RawReply::http(200, r#"{"answer":"Yes, we ship to Canada."}"#));

        app.message_input = LineInput::with_text("  do you ship to Canada?  ");
        app.send_message();

        assert!(app.is_pending());
        assert!(app.message_input.text().is_empty());
        assert!(app.request_task.is_some());

        // A second send while pending keeps the typed text and sends nothing
        app.message_input = LineInput::with_text("hello?");
        app.send_message();
        assert_eq!(app.message_input.text(), "hello?");
        assert_eq!(app.machine.conversation().turns().len(), 1);

        transport.release.notify_one();
        wait_for_settle(&mut app).await;

        let turns = app.machine.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content(), "do you ship to Canada?");
        assert_eq!(turns[1].role(), ChatRole::Assistant);
        assert_eq!(turns[1].content(), "Yes, we ship to Canada.");
        assert!(app.request_task.is_none());
    }

    #[tokio::test]
    async fn test_blank_message_not_sent() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.message_input = LineInput::with_text("   ");
        app.send_message();

        assert!(!app.is_pending());
        assert!(app.request_task.is_none());
        assert!(app.machine.conversation().turns().is_empty());
    }

    #[tokio::test]
    async fn test_aborted_task_settles_as_error() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.message_input = LineInput::with_text("hi");
        app.send_message();

        if let Some(task) = &app.request_task {
            task.abort();
        }
        wait_for_settle(&mut app).await;

        let turns = app.machine.conversation().turns();
        assert_eq!(turns[1].content(), "Error: request aborted");
        assert_eq!(
            app.notifications.latest().map(|n| n.kind()),
            Some(NotificationKind::Error)
        );
    }

    #[tokio::test]
    async fn test_commit_field_updates_session() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));

        app.start_editing(EditTarget::UserId);
        assert_eq!(app.field_input.text(), "demo-user");
        app.field_input = LineInput::with_text(" alice ");
        app.commit_field();

        assert_eq!(app.machine.session().user_id, "alice");
        assert_eq!(app.input_mode, InputMode::Normal);

        app.start_editing(EditTarget::SessionId);
        app.field_input.clear();
        app.commit_field();
        assert_eq!(app.machine.session().session_id, "session-1");
    }

    #[tokio::test]
    async fn test_tick_expires_notifications() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.notifications.notify("boom", NotificationKind::Error);

        app.tick(Instant::now());
        assert_eq!(app.notifications.len(), 1);

        app.tick(Instant::now() + app.notifications.ttl());
        assert!(app.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_line_filling_width_counts_once() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.chat_width = 10;
        app.message_input = LineInput::with_text("0123456789");
        app.send_message();

        // "You:" + one full-width line + blank, then "AI:" + "Thinking..."
        assert_eq!(app.transcript_line_count(), 5);

        app.chat_width = 9;
        assert_eq!(app.transcript_line_count(), 6);
    }

    #[tokio::test]
    async fn test_scroll_down_stops_at_bottom() {
        let (mut app, transport) = app_with(RawReply::http(200, r#"{"answer":"one\ntwo\nthree"}"#));
        app.chat_width = 40;
        app.chat_height = 3;
        app.message_input = LineInput::with_text("hello");
        app.send_message();
        transport.release.notify_one();
        wait_for_settle(&mut app).await;

        // 3 user lines + 5 assistant lines, 3 visible
        let bottom = app.transcript_line_count() - app.chat_height;
        assert_eq!(bottom, 5);

        for _ in 0..50 {
            app.scroll_down();
        }
        assert_eq!(app.chat_scroll, bottom);
        assert!(!app.follow_bottom);

        app.scroll_up();
        assert_eq!(app.chat_scroll, bottom - 1);
    }

    #[tokio::test]
    async fn test_scroll_down_on_short_transcript_stays_at_top() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.chat_height = 10;
        app.scroll_down();
        app.scroll_down();
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_dismiss_latest() {
        let (mut app, _transport) = app_with(RawReply::http(200, r#"{"answer":"x"}"#));
        app.notifications.notify("first", NotificationKind::Error);
        app.notifications.notify("second", NotificationKind::Error);

        app.dismiss_latest_notification();
        assert_eq!(app.notifications.latest().unwrap().message(), "first");
    }
}
