//! Pure turn transition function
//!
//! Given the same state, context and event this always yields the same new
//! state and effects. Sampling, streaming and storage live in the generator.

use super::markers::{strip_reserved, TokenClass, TurnMarker};
use super::{Effect, Segment, TurnContext, TurnEvent, TurnState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No reply text after {attempts} generation attempts")]
    EmptyReply { attempts: u32 },
    #[error("Turn has not started")]
    NotStarted,
    #[error("Turn already started")]
    AlreadyStarted,
    #[error("Turn already finished")]
    TurnFinished,
}

pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: TurnEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::AwaitingUserTurn, TurnEvent::Begin) => {
            Ok(TransitionResult::new(TurnState::GeneratingReply {
                attempt: 1,
                pending: String::new(),
                emitted: 0,
            }))
        }

        (TurnState::AwaitingUserTurn, _) => Err(TransitionError::NotStarted),

        (state, _) if state.is_terminal() => Err(TransitionError::TurnFinished),

        (_, TurnEvent::Begin) => Err(TransitionError::AlreadyStarted),

        (
            TurnState::GeneratingReply {
                attempt,
                pending,
                emitted,
            },
            TurnEvent::Sampled(class),
        ) => match class {
            TokenClass::Text(text) => Ok(TransitionResult::new(TurnState::GeneratingReply {
                attempt: *attempt,
                pending: format!("{pending}{text}"),
                emitted: *emitted,
            })),

            // Reactions never merge with surrounding text
            TokenClass::Reaction(reaction) => Ok(TransitionResult::new(
                TurnState::GeneratingReply {
                    attempt: *attempt,
                    pending: pending.clone(),
                    emitted: emitted + 1,
                },
            )
            .with_effect(Effect::EmitSegment(Segment::Reaction(reaction)))),

            TokenClass::Boundary(marker) => {
                let flushed = flush(pending);
                let emitted = emitted + flushed.len();
                if marker.continues_turn() {
                    Ok(TransitionResult::new(TurnState::GeneratingReply {
                        attempt: *attempt,
                        pending: String::new(),
                        emitted,
                    })
                    .with_effects(flushed))
                } else {
                    finish(*attempt, emitted, flushed, context, marker)
                }
            }
        },

        (
            TurnState::GeneratingReply {
                attempt,
                pending,
                emitted,
            },
            TurnEvent::BudgetExhausted,
        ) => {
            let flushed = flush(pending);
            let emitted = emitted + flushed.len();
            finish(*attempt, emitted, flushed, context, TurnMarker::EndOfText)
        }

        (TurnState::TurnComplete { .. } | TurnState::AutoStartGreeting, _) => {
            Err(TransitionError::TurnFinished)
        }
    }
}

/// Emit accumulated text as one segment, if it has any content.
///
/// Plain tokens can spell a reserved marker between them; those spellings
/// are dropped so the history re-tokenizes to the same conversation.
fn flush(pending: &str) -> Vec<Effect> {
    let clean = strip_reserved(pending);
    let text = clean.trim();
    if text.is_empty() {
        vec![]
    } else {
        vec![Effect::emit_text(text)]
    }
}

/// End of an attempt: complete, fall back, retry, or give up
fn finish(
    attempt: u32,
    emitted: usize,
    flushed: Vec<Effect>,
    context: &TurnContext,
    marker: TurnMarker,
) -> Result<TransitionResult, TransitionError> {
    if emitted > 0 {
        return Ok(TransitionResult::new(TurnState::TurnComplete { emitted })
            .with_effects(flushed)
            .with_effect(Effect::CompleteTurn));
    }

    if context.auto_start {
        return Ok(TransitionResult::new(TurnState::AutoStartGreeting)
            .with_effect(Effect::emit_text(context.greeting.clone()))
            .with_effect(Effect::CompleteTurn));
    }

    if attempt < context.max_attempts.max(1) {
        tracing::debug!(attempt, stop = marker.as_str(), "Empty reply, retrying");
        let next = attempt + 1;
        return Ok(TransitionResult::new(TurnState::GeneratingReply {
            attempt: next,
            pending: String::new(),
            emitted: 0,
        })
        .with_effect(Effect::RestartGeneration { attempt: next }));
    }

    Err(TransitionError::EmptyReply { attempts: attempt })
}
