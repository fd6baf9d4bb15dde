//! Keyboard-driven console with a typewriter reply effect.
//!
//! One prompt line is editable at a time. Submitting it locks input until the
//! reply has been played back and a fresh prompt is shown.

pub mod screen;

use std::time::Duration;

pub use screen::{Screen, CURSOR};

pub const PROMPT: &str = "> ";
pub const TYPE_DELAY: Duration = Duration::from_millis(20);
pub const BANNER: &str = "OSINT LAB TERMINAL\nAsk about tools, techniques and methodology. Press Enter to send.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Input is locked; nothing changed.
    Rejected,
    /// Key has no effect here.
    Ignored,
    /// The pending input changed.
    Edited,
    /// The pending input was sent; input is now locked.
    Submitted(String),
}

#[derive(Debug, Clone)]
pub struct Terminal {
    screen: Screen,
    input: String,
    input_enabled: bool,
    // Byte offset where the editable input starts, while a prompt is open
    prompt_start: Option<usize>,
}

impl Terminal {
    pub fn new(banner: &str) -> Self {
        let mut terminal = Self {
            screen: Screen::new(),
            input: String::new(),
            input_enabled: false,
            prompt_start: None,
        };
        terminal.screen.append(banner);
        terminal.open_prompt();
        terminal
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if !self.input_enabled {
            return KeyOutcome::Rejected;
        }

        match key {
            Key::Char(c) if !c.is_control() => {
                self.input.push(c);
                self.redraw_input();
                KeyOutcome::Edited
            }
            Key::Backspace => {
                self.input.pop();
                self.redraw_input();
                KeyOutcome::Edited
            }
            Key::Enter if !self.input.trim().is_empty() => {
                self.input_enabled = false;
                self.prompt_start = None;
                self.screen.hide_cursor();
                KeyOutcome::Submitted(std::mem::take(&mut self.input))
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Feeds one console line as key presses. A line that submits nothing is
    /// dropped from the prompt, since the console has already moved past it.
    pub fn enter_line(&mut self, line: &str) -> Option<String> {
        let submitted = keys_for_line(line)
            .filter_map(|key| match self.handle_key(key) {
                KeyOutcome::Submitted(prompt) => Some(prompt),
                _ => None,
            })
            .last();

        if submitted.is_none() && self.input_enabled {
            self.input.clear();
            self.redraw_input();
        }
        submitted
    }

    /// Reveals `answer` one character at a time on a new line, calling
    /// `on_reveal` after each character. The cursor trails the revealed text
    /// and is gone once the last character is out.
    pub async fn play_answer<F>(&mut self, answer: &str, delay: Duration, mut on_reveal: F)
    where
        F: FnMut(&Screen, char),
    {
        self.screen.push('\n');
        self.screen.show_cursor();

        for c in answer.chars() {
            self.screen.push(c);
            on_reveal(&self.screen, c);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.screen.hide_cursor();
    }

    /// Opens a fresh prompt line and unlocks input.
    pub fn ready_for_input(&mut self) {
        self.screen.push('\n');
        self.open_prompt();
    }

    fn open_prompt(&mut self) {
        self.screen.append(PROMPT);
        self.prompt_start = Some(self.screen.len());
        self.input.clear();
        self.input_enabled = true;
        self.screen.show_cursor();
    }

    fn redraw_input(&mut self) {
        if let Some(start) = self.prompt_start {
            self.screen.replace_from(start, &self.input);
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(BANNER)
    }
}

/// Maps one typed line to the key presses that produce it, Enter included.
pub fn keys_for_line(line: &str) -> impl Iterator<Item = Key> + '_ {
    line.chars()
        .map(|c| if c == '\u{8}' { Key::Backspace } else { Key::Char(c) })
        .chain(std::iter::once(Key::Enter))
}
