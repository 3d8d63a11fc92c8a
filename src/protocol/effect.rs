//! Effects produced by turn transitions

use super::state::Segment;

/// Effects to be executed by the generator after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Stream a segment and append it to the history
    EmitSegment(Segment),

    /// Discard the attempt and sample again from the original prompt
    RestartGeneration { attempt: u32 },

    /// The reply is finished
    CompleteTurn,
}

impl Effect {
    pub fn emit_text(text: impl Into<String>) -> Self {
        Effect::EmitSegment(Segment::Text(text.into()))
    }
}
