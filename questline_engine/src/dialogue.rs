//! Dialogue Player
//!
//! Line-by-line state for the NPC conversation currently on screen.

use questline_data::PLACEHOLDER_LINE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialoguePlayer {
    lines: Vec<String>,
    index: usize,
}

impl DialoguePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a script and rewind to its first line.
    ///
    /// An empty script plays the placeholder line instead.
    pub fn start(&mut self, lines: &[String]) {
        self.start_with_placeholder(lines, PLACEHOLDER_LINE);
    }

    /// Like [`start`](Self::start) with a custom line for empty scripts.
    pub fn start_with_placeholder(&mut self, lines: &[String], placeholder: &str) {
        self.lines = if lines.is_empty() {
            vec![placeholder.to_string()]
        } else {
            lines.to_vec()
        };
        self.index = 0;
    }

    /// Step to the next line. Returns whether there is still a line to show.
    pub fn advance(&mut self) -> bool {
        if self.index < self.lines.len() {
            self.index += 1;
        }
        self.is_active()
    }

    pub fn is_active(&self) -> bool {
        self.index < self.lines.len()
    }

    pub fn current_line(&self) -> Option<&str> {
        self.lines.get(self.index).map(String::as_str)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.index = 0;
    }
}
