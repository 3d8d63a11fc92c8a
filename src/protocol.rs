//! Conversation turn protocol
//!
//! A pure state machine decides what each sampled token means for the reply;
//! the generator feeds it samples and carries out its effects.

mod effect;
pub mod event;
pub mod generator;
pub mod history;
pub mod markers;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::TurnEvent;
pub use generator::{GenerationError, ReplyConfig, ReplyEvent, ReplyGenerator};
pub use history::History;
pub use state::{Segment, TurnContext, TurnState};
