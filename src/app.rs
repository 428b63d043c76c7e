use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chart::{ChartRenderer, ChartView};
use crate::client::{Backend, ChatError};
use crate::config::{Locale, Settings};
use crate::transcript::{reduce, RequestId, Transcript, TranscriptEvent};
use crate::tui::{AppEvent, EventSender};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub transcript: Transcript,
    pub cursor: usize, // cursor position in the draft, in chars
    pub backend: Backend,
    pub locale: Locale,
    pending: Option<JoinHandle<()>>,

    // Transcript viewport
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    pub chart: ChartView,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(settings: &Settings) -> Self {
        Self {
            should_quit: false,

            transcript: Transcript::new(),
            cursor: 0,
            backend: Backend::new(settings.backend, &settings.base_url),
            locale: settings.locale,
            pending: None,

            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            chart: ChartView::new(ChartRenderer::default(), settings.redraw),

            animation_frame: 0,
        }
    }

    fn dispatch(&mut self, event: TranscriptEvent) {
        let state = std::mem::take(&mut self.transcript);
        self.transcript = reduce(state, event);
    }

    // Draft editing
    pub fn set_draft(&mut self, text: String) {
        self.cursor = self.cursor.min(text.chars().count());
        self.dispatch(TranscriptEvent::UpdateDraft(text));
    }

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.transcript.draft().to_string();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.insert(byte_pos, c);
        self.cursor += 1;
        self.dispatch(TranscriptEvent::UpdateDraft(draft));
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.remove_at_cursor();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.transcript.draft().chars().count() {
            self.remove_at_cursor();
        }
    }

    fn remove_at_cursor(&mut self) {
        let mut draft = self.transcript.draft().to_string();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.remove(byte_pos);
        self.dispatch(TranscriptEvent::UpdateDraft(draft));
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.transcript.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.transcript.draft().chars().count();
    }

    /// Push the draft as a user message and fetch the reply in the background.
    ///
    /// A reply still in flight from an earlier submit is aborted; if it already
    /// landed in the queue the transcript drops it as stale.
    pub fn submit(&mut self, events: &EventSender) -> RequestId {
        let message = self.transcript.draft().to_string();
        self.dispatch(TranscriptEvent::SubmitUser);
        self.cursor = 0;

        let request = self.transcript.current_request();
        if let Some(previous) = self.pending.take() {
            if !previous.is_finished() {
                previous.abort();
                debug!(request = request.get(), "cancelled superseded reply");
            }
        }

        info!(
            request = request.get(),
            chars = message.chars().count(),
            backend = self.backend.kind().as_str(),
            "submitting message"
        );

        let backend = self.backend.clone();
        let events = events.clone();
        self.pending = Some(tokio::spawn(async move {
            let result = backend.reply(&message).await;
            let _ = events.send(AppEvent::Reply { request, result });
        }));

        self.scroll_to_bottom();
        request
    }

    /// Fold a finished reply into the transcript
    pub fn receive_reply(&mut self, request: RequestId, result: Result<String, ChatError>) {
        let event = match result {
            Ok(text) => {
                debug!(request = request.get(), "reply received");
                TranscriptEvent::SubmitSystem { request, text }
            }
            Err(e) => {
                warn!(request = request.get(), error = %e, "reply fetch failed");
                TranscriptEvent::SubmitError {
                    request,
                    text: self.locale.error_text().to_string(),
                }
            }
        };
        self.dispatch(event);

        if request == self.transcript.current_request() {
            self.pending = None;
        }
        self.scroll_to_bottom();
    }

    pub fn is_waiting(&self) -> bool {
        self.transcript.is_awaiting_reply()
    }

    /// Redraw the chart if its trigger changed
    pub fn sync_chart(&mut self) -> bool {
        self.chart.sync(self.transcript.revision())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.total_chat_lines().saturating_sub(self.visible_height());
        self.scroll = self.scroll.saturating_add(lines).min(max_scroll);
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    /// Scroll so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_height();
        self.scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript at the current wrap width
    pub fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.transcript.messages() {
            total_lines = total_lines.saturating_add(1); // sender line
            if msg.text.is_empty() {
                total_lines = total_lines.saturating_add(1);
            }
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = char_count.div_ceil(wrap_width).max(1);
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_waiting() {
            total_lines = total_lines.saturating_add(2);
        }
        total_lines
    }
}
