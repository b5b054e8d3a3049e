//! Message composer.
//!
//! Governs what kind of message the user is drafting and turns key input into
//! finished message bodies.
//!
//! # State Machine
//!
//! ```text
//!             insert code               cancel / submit
//! PlainText ─────────────> Code ──────────────────────> PlainText
//! ```
//!
//! The attach menu is an independent flag and an image pick is a one-shot
//! trigger: neither changes the mode.
//!
//! # Invariants
//!
//! - A submit with a blank (whitespace-only) buffer produces nothing and
//!   leaves the composer untouched.
//! - A successful submit clears the buffer and returns to plain text.

use bolt_proto::ImageRef;

use crate::message::MessageBody;

/// Terminal-agnostic keyboard input.
///
/// Decouples the composer from terminal libraries and lets simulations drive
/// it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key, optionally with the newline modifier (Shift).
    Enter {
        /// Modifier held
        shift: bool,
    },
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
    /// Tab key (toggle attach menu).
    Tab,
    /// Escape key (close menu, then leave code mode).
    Esc,
}

/// What the user is drafting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposerMode {
    /// Single-line text; Enter submits.
    #[default]
    PlainText,
    /// Multi-line code; Enter submits, Shift+Enter inserts a newline.
    Code,
}

/// Composer state machine.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    mode: ComposerMode,
    buffer: String,
    /// Cursor position in characters, `0..=buffer.chars().count()`.
    cursor: usize,
    attach_menu_open: bool,
}

impl Composer {
    /// Create an empty composer in plain-text mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> ComposerMode {
        self.mode
    }

    /// Draft text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the attach menu is shown.
    pub fn is_attach_menu_open(&self) -> bool {
        self.attach_menu_open
    }

    /// Whether a submit would produce a message.
    pub fn can_send(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    /// Process a key. Returns the submitted body if the key completed one.
    pub fn handle_key(&mut self, key: KeyInput) -> Option<MessageBody> {
        match key {
            KeyInput::Char(c) => {
                self.insert(c);
                None
            },
            KeyInput::Enter { shift } => self.enter(shift),
            KeyInput::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.buffer.remove(at);
                }
                None
            },
            KeyInput::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_offset(self.cursor);
                    self.buffer.remove(at);
                }
                None
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            },
            KeyInput::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                None
            },
            KeyInput::Home => {
                self.cursor = 0;
                None
            },
            KeyInput::End => {
                self.cursor = self.char_count();
                None
            },
            KeyInput::Tab => {
                self.toggle_attach_menu();
                None
            },
            KeyInput::Esc => {
                if self.attach_menu_open {
                    self.close_attach_menu();
                } else {
                    self.cancel_code();
                }
                None
            },
        }
    }

    /// Insert text at the cursor.
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert(c);
        }
    }

    /// Handle Enter. Plain text ignores the modifier variant; code inserts a
    /// newline for it.
    pub fn enter(&mut self, shift: bool) -> Option<MessageBody> {
        match (self.mode, shift) {
            (_, false) => self.submit(),
            (ComposerMode::PlainText, true) => None,
            (ComposerMode::Code, true) => {
                self.insert('\n');
                None
            },
        }
    }

    /// Submit the draft.
    ///
    /// Returns `None` for a blank buffer. Otherwise the trimmed buffer becomes
    /// a text or code body, the buffer is cleared and the mode returns to
    /// plain text.
    pub fn submit(&mut self) -> Option<MessageBody> {
        let content = self.buffer.trim();
        if content.is_empty() {
            return None;
        }

        let body = match self.mode {
            ComposerMode::PlainText => MessageBody::Text(content.to_string()),
            ComposerMode::Code => MessageBody::Code(content.to_string()),
        };
        self.buffer.clear();
        self.cursor = 0;
        self.mode = ComposerMode::PlainText;
        Some(body)
    }

    /// Show or hide the attach menu.
    pub fn toggle_attach_menu(&mut self) {
        self.attach_menu_open = !self.attach_menu_open;
    }

    /// Hide the attach menu.
    pub fn close_attach_menu(&mut self) {
        self.attach_menu_open = false;
    }

    /// "Insert code" menu selection: enter code mode and close the menu.
    pub fn select_insert_code(&mut self) {
        self.mode = ComposerMode::Code;
        self.attach_menu_open = false;
    }

    /// Leave code mode, keeping the draft.
    pub fn cancel_code(&mut self) {
        self.mode = ComposerMode::PlainText;
    }

    /// Discard the draft. The mode is unchanged.
    pub fn clear_draft(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Image picked from the attach menu.
    ///
    /// Produces an image body with an empty caption, closes the menu, and
    /// leaves the mode and draft untouched.
    pub fn pick_image(&mut self, image: ImageRef) -> MessageBody {
        self.attach_menu_open = false;
        MessageBody::Image { caption: String::new(), image }
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> Composer {
        let mut composer = Composer::new();
        composer.insert_str(text);
        composer
    }

    #[test]
    fn plain_enter_submits_trimmed_text() {
        let mut composer = typed("  hello  ");
        assert_eq!(composer.handle_key(KeyInput::Enter { shift: false }), Some(MessageBody::Text("hello".into())));
        assert_eq!(composer.buffer(), "");
        assert_eq!(composer.cursor(), 0);
    }

    #[test]
    fn plain_shift_enter_is_ignored() {
        let mut composer = typed("hello");
        assert_eq!(composer.handle_key(KeyInput::Enter { shift: true }), None);
        assert_eq!(composer.buffer(), "hello");
    }

    #[test]
    fn blank_submit_is_noop_in_both_modes() {
        let mut composer = typed("   ");
        assert!(!composer.can_send());
        assert_eq!(composer.submit(), None);
        assert_eq!(composer.buffer(), "   ");

        composer.select_insert_code();
        assert_eq!(composer.handle_key(KeyInput::Enter { shift: false }), None);
        assert_eq!(composer.mode(), ComposerMode::Code);
    }

    #[test]
    fn code_mode_round_trip() {
        let mut composer = Composer::new();
        composer.toggle_attach_menu();
        composer.select_insert_code();
        assert_eq!(composer.mode(), ComposerMode::Code);
        assert!(!composer.is_attach_menu_open());

        composer.insert_str("fn main() {");
        assert_eq!(composer.handle_key(KeyInput::Enter { shift: true }), None);
        composer.insert_str("}");
        assert_eq!(composer.buffer(), "fn main() {\n}");

        let body = composer.handle_key(KeyInput::Enter { shift: false });
        assert_eq!(body, Some(MessageBody::Code("fn main() {\n}".into())));
        assert_eq!(composer.mode(), ComposerMode::PlainText);
    }

    #[test]
    fn clear_draft_keeps_mode() {
        let mut composer = Composer::new();
        composer.select_insert_code();
        composer.insert_str("rm -rf /");
        composer.clear_draft();
        assert_eq!(composer.buffer(), "");
        assert_eq!(composer.cursor(), 0);
        assert_eq!(composer.mode(), ComposerMode::Code);
    }

    #[test]
    fn cancel_keeps_draft() {
        let mut composer = Composer::new();
        composer.select_insert_code();
        composer.insert_str("x = 1");
        composer.handle_key(KeyInput::Esc);
        assert_eq!(composer.mode(), ComposerMode::PlainText);
        assert_eq!(composer.buffer(), "x = 1");
    }

    #[test]
    fn esc_closes_menu_before_leaving_code() {
        let mut composer = Composer::new();
        composer.select_insert_code();
        composer.handle_key(KeyInput::Tab);
        assert!(composer.is_attach_menu_open());

        composer.handle_key(KeyInput::Esc);
        assert!(!composer.is_attach_menu_open());
        assert_eq!(composer.mode(), ComposerMode::Code);
    }

    #[test]
    fn image_pick_leaves_mode_and_draft() {
        let mut composer = typed("draft");
        composer.select_insert_code();
        composer.toggle_attach_menu();

        let image = ImageRef::new("file:///tmp/cat.png", "cat.png");
        let body = composer.pick_image(image.clone());
        assert_eq!(body, MessageBody::Image { caption: String::new(), image });
        assert_eq!(composer.mode(), ComposerMode::Code);
        assert_eq!(composer.buffer(), "draft");
        assert!(!composer.is_attach_menu_open());
    }

    #[test]
    fn cursor_editing_handles_multibyte() {
        let mut composer = typed("héllo");
        composer.handle_key(KeyInput::Home);
        composer.handle_key(KeyInput::Right);
        composer.handle_key(KeyInput::Delete);
        assert_eq!(composer.buffer(), "hllo");

        composer.handle_key(KeyInput::Char('é'));
        composer.handle_key(KeyInput::End);
        composer.handle_key(KeyInput::Backspace);
        assert_eq!(composer.buffer(), "héll");

        composer.handle_key(KeyInput::Left);
        composer.handle_key(KeyInput::Left);
        composer.handle_key(KeyInput::Char('-'));
        assert_eq!(composer.buffer(), "hé-ll");
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut composer = typed("a");
        composer.handle_key(KeyInput::Home);
        composer.handle_key(KeyInput::Backspace);
        assert_eq!(composer.buffer(), "a");
    }
}
