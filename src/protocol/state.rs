//! Turn state types

use super::markers::Reaction;

/// One unit of a streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A complete message bubble
    Text(String),
    /// A standalone reaction token
    Reaction(Reaction),
}

impl Segment {
    /// Text as delivered to clients
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Reaction(reaction) => reaction.as_str(),
        }
    }
}

/// Reply generation state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Nothing sampled yet
    #[default]
    AwaitingUserTurn,

    /// Sampling tokens for the reply
    GeneratingReply {
        /// 1-based generation attempt
        attempt: u32,
        /// Text accumulated since the last emitted segment
        pending: String,
        /// Segments emitted during this attempt
        emitted: usize,
    },

    /// Reply finished with at least one segment
    TurnComplete { emitted: usize },

    /// Auto-start produced nothing; the default greeting was emitted
    AutoStartGreeting,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::TurnComplete { .. } | TurnState::AutoStartGreeting
        )
    }
}

/// Immutable inputs for a turn
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// The replying party opens the conversation
    pub auto_start: bool,
    /// Generation attempts before an empty reply becomes an error
    pub max_attempts: u32,
    /// Segment substituted when auto-start yields nothing
    pub greeting: String,
}

impl TurnContext {
    pub fn new(auto_start: bool, max_attempts: u32, greeting: impl Into<String>) -> Self {
        Self {
            auto_start,
            max_attempts,
            greeting: greeting.into(),
        }
    }
}
