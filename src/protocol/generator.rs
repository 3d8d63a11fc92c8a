//! Reply generator
//!
//! Drives the pure turn state machine with real samples: prime the context
//! window with the prompt, sample until the machine completes the turn, and
//! stream each segment the moment it is emitted.

use super::history::History;
use super::markers::classify;
use super::transition::{transition, TransitionError};
use super::{Effect, Segment, TurnContext, TurnEvent, TurnState};
use crate::oracle::{OracleError, TokenOracle};
use crate::sampler::{Sampler, SamplerError, SamplingParams};
use crate::window::ContextWindow;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Reply generation settings
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    /// Tokens sampled per attempt before the reply is cut off
    pub max_tokens: usize,
    pub sampling: SamplingParams,
    /// Attempts before an empty reply is reported as an error
    pub max_attempts: u32,
    /// Substitute for an empty auto-start reply
    pub greeting: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            sampling: SamplingParams::top_k(3),
            max_attempts: 5,
            greeting: "Hey".to_string(),
        }
    }
}

/// Items on a reply stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Segment(Segment),
    Done { history: String },
    Error { message: String },
}

/// Errors that end a reply
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Sampling error: {0}")]
    Sampler(#[from] SamplerError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Client disconnected")]
    Cancelled,
}

/// Generates one reply against a token oracle
pub struct ReplyGenerator {
    oracle: Arc<dyn TokenOracle>,
    config: ReplyConfig,
}

impl ReplyGenerator {
    pub fn new(oracle: Arc<dyn TokenOracle>, config: ReplyConfig) -> Self {
        Self { oracle, config }
    }

    /// Generate a reply for `history`, returning the updated history string.
    ///
    /// Segments go to `events` as they are produced. Generation stops before
    /// the next oracle call once the receiving side has gone away.
    pub async fn generate<R: Rng + Send>(
        &self,
        mut history: History,
        auto_start: bool,
        sampler: &mut Sampler<R>,
        events: &mpsc::Sender<ReplyEvent>,
    ) -> Result<String, GenerationError> {
        let context = TurnContext::new(
            auto_start,
            self.config.max_attempts,
            self.config.greeting.clone(),
        );
        let prompt_tokens = self.oracle.encode(&history.prompt()).await?;
        let capacity = self.oracle.context_length();

        let mut state = transition(&TurnState::AwaitingUserTurn, &context, TurnEvent::Begin)?.new_state;

        'attempts: loop {
            let mut window = ContextWindow::from_tokens(&prompt_tokens, capacity);
            let mut sampled = 0;

            loop {
                let event = if sampled >= self.config.max_tokens {
                    TurnEvent::BudgetExhausted
                } else {
                    if events.is_closed() {
                        return Err(GenerationError::Cancelled);
                    }
                    let probabilities = self.oracle.distribution(window.tokens()).await?;
                    let id = sampler.sample(&probabilities, &self.config.sampling)?;
                    window.push(id);
                    sampled += 1;
                    let token = self.oracle.decode(&[id]).await?;
                    TurnEvent::Sampled(classify(&token))
                };

                let result = transition(&state, &context, event)?;
                state = result.new_state;

                for effect in result.effects {
                    match effect {
                        Effect::EmitSegment(segment) => {
                            history.append(&segment);
                            events
                                .send(ReplyEvent::Segment(segment))
                                .await
                                .map_err(|_| GenerationError::Cancelled)?;
                        }
                        Effect::RestartGeneration { attempt } => {
                            tracing::info!(attempt, "Reply was empty, sampling again");
                            continue 'attempts;
                        }
                        Effect::CompleteTurn => {
                            tracing::debug!(tokens = sampled, state = ?state, "Reply complete");
                            return Ok(history.into_string());
                        }
                    }
                }
            }
        }
    }
}
