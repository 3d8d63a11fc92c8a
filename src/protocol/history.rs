//! Conversation history serialization
//!
//! A history is the literal text the model was trained on: role markers
//! interleaved with message text. Replies are appended segment by segment so
//! the streamed segments and the stored history always agree.

use super::markers::{CONVERSATION_START, ME, THEM};
use super::state::Segment;

/// History string under construction for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    text: String,
    /// The text ends with a reply marker that no segment has filled yet
    open_reply: bool,
}

impl History {
    /// History after the other party sends `message`
    pub fn for_user_turn(prior: Option<&str>, message: &str) -> Self {
        let text = match prior {
            Some(prior) if !prior.is_empty() => format!("{prior}{THEM}{message}"),
            _ => format!("{CONVERSATION_START}{THEM}{message}"),
        };
        Self {
            text,
            open_reply: false,
        }
    }

    /// Fresh history where the replying party speaks first
    pub fn for_auto_start() -> Self {
        Self {
            text: format!("{CONVERSATION_START}{ME}"),
            open_reply: true,
        }
    }

    /// Text fed to the oracle: the history terminated by the reply marker
    pub fn prompt(&self) -> String {
        if self.open_reply {
            self.text.clone()
        } else {
            format!("{}{ME}", self.text)
        }
    }

    pub fn append(&mut self, segment: &Segment) {
        match segment {
            Segment::Reaction(reaction) => self.text.push_str(reaction.as_str()),
            Segment::Text(text) => {
                if !self.open_reply {
                    self.text.push_str(ME);
                }
                self.text.push_str(text);
            }
        }
        self.open_reply = false;
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
