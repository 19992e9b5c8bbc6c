//! Output side: text blocks and buttons split into bounded messages.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::decision::DecisionId;

/// A clickable button; the token names the decision request it activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Visible label.
    pub label: String,
    /// Decision request id.
    pub token: DecisionId,
}

impl Button {
    /// Creates a button.
    pub fn new(label: impl Into<String>, token: DecisionId) -> Self {
        Self {
            label: label.into(),
            token,
        }
    }
}

/// Append-only output surface.
pub trait PresentationSink {
    /// Appends a text block.
    fn text(&mut self, text: &str);

    /// Appends a set of buttons.
    fn buttons(&mut self, buttons: &[Button]);
}

/// Per-message capacity of the chat surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MessageLimits {
    /// Maximum characters of text per message.
    #[serde(default = "default_max_chars")]
    max_chars: usize,
    /// Maximum buttons per message.
    #[serde(default = "default_max_buttons")]
    max_buttons: usize,
}

fn default_max_chars() -> usize {
    2000
}

fn default_max_buttons() -> usize {
    25
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_buttons: default_max_buttons(),
        }
    }
}

impl MessageLimits {
    /// Creates limits; zero values are raised to one.
    pub fn new(max_chars: usize, max_buttons: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            max_buttons: max_buttons.max(1),
        }
    }
}

/// One outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Text, blocks separated by newlines.
    pub text: String,
    /// Buttons under the text.
    pub buttons: Vec<Button>,
}

impl Message {
    fn is_empty(&self) -> bool {
        self.text.is_empty() && self.buttons.is_empty()
    }
}

/// Builds a sequence of messages that respect [`MessageLimits`].
///
/// Text appended after buttons starts a new message so reading order is
/// preserved.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    limits: MessageLimits,
    messages: Vec<Message>,
    current: Message,
}

impl MessageBuilder {
    /// Creates a builder.
    pub fn new(limits: MessageLimits) -> Self {
        Self {
            limits,
            messages: Vec::new(),
            current: Message::default(),
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.messages.push(std::mem::take(&mut self.current));
        }
    }

    fn push_chunk(&mut self, chunk: &str) {
        let used = self.current.text.chars().count();
        let separator = usize::from(used > 0);
        if !self.current.buttons.is_empty()
            || used + separator + chunk.chars().count() > self.limits.max_chars
        {
            self.flush();
        }
        if !self.current.text.is_empty() {
            self.current.text.push('\n');
        }
        self.current.text.push_str(chunk);
    }

    /// Finished messages.
    #[instrument(skip(self))]
    pub fn finish(mut self) -> Vec<Message> {
        self.flush();
        debug!(count = self.messages.len(), "Messages built");
        self.messages
    }
}

impl PresentationSink for MessageBuilder {
    fn text(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return;
        }
        for piece in chars.chunks(self.limits.max_chars.max(1)) {
            let chunk: String = piece.iter().collect();
            self.push_chunk(&chunk);
        }
    }

    fn buttons(&mut self, buttons: &[Button]) {
        for button in buttons {
            if self.current.buttons.len() >= self.limits.max_buttons.max(1) {
                self.flush();
            }
            self.current.buttons.push(button.clone());
        }
    }
}

/// Renders messages as plain text for a terminal.
pub fn render_plain(messages: &[Message]) -> String {
    let mut out = String::new();
    for (index, message) in messages.iter().enumerate() {
        if index > 0 {
            out.push_str("---\n");
        }
        if !message.text.is_empty() {
            out.push_str(&message.text);
            out.push('\n');
        }
        for button in &message.buttons {
            out.push_str(&format!("  [{}] {}\n", button.token, button.label));
        }
    }
    out
}
