pub const CURSOR: char = '_';

/// A scrolling console: committed text plus an optional trailing cursor.
///
/// The cursor is never part of the committed text, so revealing a character
/// or editing the prompt line never has to strip it first.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    text: String,
    cursor_visible: bool,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// Drops everything after byte offset `at` and writes `tail` in its place.
    pub(crate) fn replace_from(&mut self, at: usize, tail: &str) {
        self.text.truncate(at);
        self.text.push_str(tail);
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }

    pub fn show_cursor(&mut self) {
        self.cursor_visible = true;
    }

    pub fn hide_cursor(&mut self) {
        self.cursor_visible = false;
    }

    /// Committed text only.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        if self.cursor_visible {
            out.push(CURSOR);
        }
        out
    }
}
