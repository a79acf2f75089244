use std::path::PathBuf;

use mrag_core::{QueryRejection, Session, SessionEvent, UploadPhase};

use crate::theme::{Theme, ThemeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Upload,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line input with a character-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Pasted text lands on one line; newlines become spaces
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert(if c == '\n' || c == '\r' { ' ' } else { c });
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Turn what the user typed (or dropped onto the terminal) into a path:
/// surrounding quotes are stripped and a leading `~` is expanded.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);

    if let Some(rest) = unquoted.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(unquoted)
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub session: Session,
    pub theme: Theme,
    pub api_base_url: String,

    pub path_input: TextInput,
    pub query_input: TextInput,

    // Chat viewport, sized by the last render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8,
    started: bool,
    seen_messages: usize,
    upload_in_flight: bool,
}

impl App {
    pub fn new(session: Session, theme: Theme, api_base_url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Landing,
            input_mode: InputMode::Normal,
            session,
            theme,
            api_base_url: api_base_url.into(),
            path_input: TextInput::default(),
            query_input: TextInput::default(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            started: false,
            seen_messages: 0,
            upload_in_flight: false,
        }
    }

    /// Leave the landing screen. The first time through this kicks off the
    /// backend health check.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.session.check_health();
        }
        if self.session.active_document().is_some() {
            self.screen = Screen::Workspace;
            self.input_mode = InputMode::Normal;
        } else {
            self.open_upload();
        }
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Landing;
        self.input_mode = InputMode::Normal;
    }

    pub fn open_upload(&mut self) {
        if !self.session.is_uploading() {
            self.session.reset_upload();
        }
        self.screen = Screen::Upload;
        self.input_mode = InputMode::Editing;
    }

    /// Back out of the upload screen, only possible once a document is loaded
    pub fn cancel_upload(&mut self) -> bool {
        if self.session.active_document().is_none() {
            return false;
        }
        self.screen = Screen::Workspace;
        self.input_mode = InputMode::Normal;
        true
    }

    pub async fn submit_upload(&mut self) {
        if self.path_input.is_blank() {
            return;
        }
        let path = expand_path(&self.path_input.value);
        match self.session.upload_path(&path).await {
            Ok(_) => {
                self.upload_in_flight = true;
                self.input_mode = InputMode::Normal;
            }
            Err(rejection) => tracing::debug!(%rejection, path = %path.display(), "upload not started"),
        }
    }

    pub fn submit_query(&mut self) {
        match self.session.submit_query(&self.query_input.value) {
            Ok(_) => {
                self.query_input.clear();
                self.scroll_chat_to_bottom();
            }
            Err(QueryRejection::Empty) => self.query_input.clear(),
            Err(rejection) => tracing::debug!(%rejection, "question not sent"),
        }
    }

    pub fn apply_session_event(&mut self, event: SessionEvent) {
        self.session.apply(event);
        self.sync_with_session();
    }

    /// Follow session changes the view has to react to
    fn sync_with_session(&mut self) {
        if self.screen == Screen::Upload && self.session.upload_phase() == UploadPhase::Succeeded {
            self.session.reset_upload();
            self.path_input.clear();
            self.screen = Screen::Workspace;
            self.input_mode = InputMode::Normal;
            self.chat_scroll = 0;
        }

        // A failed transfer discards the selection; the user picks again
        let uploading = self.session.is_uploading();
        if self.upload_in_flight
            && !uploading
            && self.session.upload_phase() == UploadPhase::Idle
            && self.session.upload_error().is_some()
        {
            self.path_input.clear();
            if self.screen == Screen::Upload {
                self.input_mode = InputMode::Editing;
            }
        }
        self.upload_in_flight = uploading;

        let count = self.session.messages().len();
        if count != self.seen_messages {
            if count < self.seen_messages {
                self.chat_scroll = 0;
            }
            self.seen_messages = count;
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_querying() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn select_next_document(&mut self) {
        self.step_document(1);
    }

    pub fn select_prev_document(&mut self) {
        self.step_document(-1);
    }

    fn step_document(&mut self, delta: isize) {
        let len = self.session.documents().len() as isize;
        if len < 2 {
            return;
        }
        let current = self.session.active_index().map(|i| i as isize).unwrap_or(0);
        let next = (current + delta).rem_euclid(len) as usize;
        if self.session.select_document(next) {
            self.chat_scroll = 0;
            self.seen_messages = self.session.messages().len();
        }
    }

    pub fn dismiss_latest_notification(&mut self) -> bool {
        match self.session.latest_notification().map(|n| n.id) {
            Some(id) => self.session.dismiss_notification(id),
            None => false,
        }
    }

    pub fn cycle_theme(&mut self) -> ThemeName {
        self.theme = Theme::from_name(self.theme.name.next());
        self.theme.name
    }

    pub fn query_input_enabled(&self) -> bool {
        self.session.can_query()
    }

    /// Lines the chat pane needs at the current width, mirroring the renderer
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines += if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
            }
            if !msg.citations.is_empty() {
                total_lines += 1; // Sources line
            }
            total_lines += 1; // Blank line after message
        }
        if self.session.is_querying() {
            total_lines += 2; // "AI:" + "Thinking..."
        }
        total_lines.min(u16::MAX as usize) as u16
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Scroll chat to bottom so the newest message or "Thinking..." is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = (self.chat_scroll + lines).min(self.max_chat_scroll());
    }
}
