use std::sync::Arc;

use skychat_core::{
    send_message, ChatBackend, ChatError, ChatMessage, ChatMode, RetryPolicy, Session,
};
use tokio::task::JoinHandle;

use crate::ui;

pub const INPUT_PLACEHOLDER: &str = "Ask SkyChat something...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Prompt input
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation
    pub session: Session,
    pub backend: Arc<dyn ChatBackend>,
    pub policy: RetryPolicy,
    /// Prompt of the request in flight, or of the last one if it failed.
    pub outstanding_prompt: Option<String>,
    pub request_task: Option<JoinHandle<Result<ChatMessage, ChatError>>>,
    pub last_error: Option<String>,

    // Transcript viewport
    pub scroll: u16,
    pub chat_height: u16, // inner height of the transcript, set during render
    pub chat_width: u16,  // inner width of the transcript, set during render

    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>, policy: RetryPolicy, mode: ChatMode) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            session: Session::new(mode),
            backend,
            policy,
            outstanding_prompt: None,
            request_task: None,
            last_error: None,

            scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.request_task.is_some()
    }

    /// Send the current input. Returns false when there is nothing to send
    /// or a request is already in flight.
    pub fn submit(&mut self) -> bool {
        let prompt = self.input.trim();
        if prompt.is_empty() || self.is_loading() {
            return false;
        }
        let prompt = prompt.to_string();

        self.input.clear();
        self.cursor = 0;
        self.last_error = None;

        tracing::info!(
            mode = self.session.mode().as_str(),
            chars = prompt.chars().count(),
            "Submitting prompt"
        );

        let contents = self.session.request_contents(&prompt);
        let backend = Arc::clone(&self.backend);
        let policy = self.policy.clone();
        self.request_task = Some(tokio::spawn(async move {
            send_message(backend.as_ref(), &policy, &contents).await
        }));
        self.outstanding_prompt = Some(prompt);
        self.scroll_to_bottom();
        true
    }

    /// Collect the reply once the background request has finished.
    pub async fn poll_request(&mut self) {
        let finished = self
            .request_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }
        let Some(task) = self.request_task.take() else {
            return;
        };

        match task.await {
            Ok(Ok(reply)) => {
                tracing::info!(chars = reply.content.chars().count(), "Reply received");
                if let Some(prompt) = self.outstanding_prompt.take() {
                    self.session.record_exchange(&prompt, reply);
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, kind = %e.kind(), "Request failed after retries");
                self.last_error = Some(format!("Failed to get a response: {}", e));
            }
            Err(e) => {
                tracing::error!(error = %e, "Request task did not complete");
                self.last_error = Some(format!("Failed to get a response: {}", e));
            }
        }
        self.scroll_to_bottom();
    }

    /// Messages from the session that should be on screen.
    ///
    /// In single-turn mode only the current exchange is shown, so the
    /// previous one disappears as soon as a new prompt goes out.
    pub fn visible_history(&self) -> &[ChatMessage] {
        if self.session.mode() == ChatMode::Stateless && self.outstanding_prompt.is_some() {
            &[]
        } else {
            self.session.history()
        }
    }

    /// Drop the conversation and start over with the same mode.
    pub fn new_session(&mut self) {
        if self.is_loading() {
            return;
        }
        tracing::info!(messages = self.session.len(), "Starting new session");
        self.session.clear();
        self.outstanding_prompt = None;
        self.last_error = None;
        self.scroll = 0;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        if self.scroll < self.max_scroll() {
            self.scroll = self.scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = (self.viewport_height() / 2).max(1);
        self.scroll = (self.scroll + half_page).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = (self.viewport_height() / 2).max(1);
        self.scroll = self.scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    /// Scroll so the newest lines (and the spinner) are visible
    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    fn viewport_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        self.transcript_lines().saturating_sub(self.viewport_height())
    }

    /// Number of rendered lines in the transcript, wrapped at the pane width.
    pub fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let lines = ui::transcript_paragraph(self).line_count(wrap_width);
        lines.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use skychat_core::ChatRole;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replies with a canned answer, or fails every call.
    pub(crate) struct ScriptedBackend {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn generate(&self, _contents: &[ChatMessage]) -> Result<ChatMessage, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(ChatMessage::assistant(text.clone())),
                None => Err(ChatError::Auth("API key not valid".to_string())),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn scripted_app(reply: Option<&str>, mode: ChatMode) -> (App, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let app = App::new(
            backend.clone(),
            RetryPolicy::new(3, Duration::from_millis(5)),
            mode,
        );
        (app, backend)
    }

    pub(crate) fn app_with(reply: Option<&str>, mode: ChatMode) -> App {
        scripted_app(reply, mode).0
    }

    async fn finish(app: &mut App) {
        while app.is_loading() {
            tokio::time::sleep(Duration::from_millis(1)).await;
            app.poll_request().await;
        }
    }

    #[tokio::test]
    async fn test_submit_records_exchange() {
        let mut app = app_with(Some("Hi there"), ChatMode::Stateful);
        app.input = "Hello".to_string();
        app.cursor = 5;

        assert!(app.submit());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_loading());

        finish(&mut app).await;

        assert_eq!(
            app.session.history(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there")]
        );
        assert!(app.outstanding_prompt.is_none());
        assert!(app.last_error.is_none());
    }

    #[tokio::test]
    async fn test_empty_input_is_not_submitted() {
        let mut app = app_with(Some("unused"), ChatMode::Stateful);
        app.input = "   ".to_string();

        assert!(!app.submit());
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_second_submit_ignored_while_loading() {
        let mut app = app_with(Some("ok"), ChatMode::Stateful);
        app.input = "one".to_string();
        assert!(app.submit());

        app.input = "two".to_string();
        assert!(!app.submit());
        assert_eq!(app.input, "two");

        finish(&mut app).await;
        assert_eq!(app.session.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_raw_error_after_all_attempts() {
        let (mut app, backend) = scripted_app(None, ChatMode::Stateful);
        app.input = "Hello".to_string();
        app.submit();

        finish(&mut app).await;

        assert_eq!(
            app.last_error.as_deref(),
            Some("Failed to get a response: Authentication failed: API key not valid")
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(app.session.is_empty());
        assert_eq!(app.outstanding_prompt.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_stateless_hides_previous_exchange_while_pending() {
        let mut app = app_with(Some("ok"), ChatMode::Stateless);
        app.input = "first".to_string();
        app.submit();
        finish(&mut app).await;
        assert_eq!(app.visible_history().len(), 2);

        app.input = "second".to_string();
        app.submit();
        assert!(app.visible_history().is_empty());

        finish(&mut app).await;
        assert_eq!(app.visible_history()[0], ChatMessage::user("second"));
        assert_eq!(app.visible_history()[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_new_session_clears_history() {
        let mut app = app_with(Some("ok"), ChatMode::Stateful);
        app.input = "hi".to_string();
        app.submit();
        finish(&mut app).await;

        app.new_session();

        assert!(app.session.is_empty());
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_transcript_lines_wrap_long_word() {
        let mut app = app_with(Some("ok"), ChatMode::Stateful);
        app.chat_width = 10;
        app.session
            .record_exchange("ééééééééééé", ChatMessage::assistant("short"));

        // user: role + 2 wrapped lines + blank; assistant: role + 1 + blank
        assert_eq!(app.transcript_lines(), 7);
    }

    #[test]
    fn test_transcript_lines_wrap_at_word_boundaries() {
        let mut app = app_with(Some("ok"), ChatMode::Stateful);
        app.chat_width = 10;
        // 20 chars fit in two rows by count, but words push it to three
        app.session
            .record_exchange("hi", ChatMessage::assistant("aaaaaa bbbbbb cccccc"));

        // user: role + 1 + blank; assistant: role + 3 + blank
        assert_eq!(app.transcript_lines(), 8);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut app = app_with(Some("ok"), ChatMode::Stateful);
        app.chat_height = 3;
        app.chat_width = 40;
        for i in 0..5 {
            app.session
                .record_exchange(&format!("q{i}"), ChatMessage::assistant("a"));
        }

        app.scroll_to_bottom();
        let bottom = app.scroll;
        assert_eq!(bottom, app.transcript_lines() - 3);

        app.scroll_down();
        assert_eq!(app.scroll, bottom);

        app.scroll_to_top();
        app.scroll_up();
        assert_eq!(app.scroll, 0);
    }
}
