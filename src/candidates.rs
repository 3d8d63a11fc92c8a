//! Multi-sample candidate generation
//!
//! Samples several independent replies to one prompt so a person can rank
//! them; the rankings feed preference training elsewhere.

use crate::oracle::{TokenId, TokenOracle};
use crate::protocol::markers::{is_turn_boundary, wrap_prompt};
use crate::protocol::GenerationError;
use crate::sampler::{Sampler, SamplingParams};
use crate::validation::{require_prompt, ValidationError};
use crate::window::ContextWindow;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Candidate generation settings
#[derive(Debug, Clone)]
pub struct CandidateConfig {
    pub count: usize,
    pub max_tokens: usize,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            count: 8,
            max_tokens: 100,
        }
    }
}

/// One finished sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub text: String,
    /// Sampled ids, stop token excluded
    pub tokens: Vec<TokenId>,
}

/// Items on a candidate stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateEvent {
    Token { index: usize, token: String },
    CandidateDone { index: usize, candidate: Candidate },
    AllDone { responses: Vec<Candidate> },
    Error { message: String },
}

pub struct CandidateGenerator {
    oracle: Arc<dyn TokenOracle>,
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(oracle: Arc<dyn TokenOracle>, config: CandidateConfig) -> Self {
        Self { oracle, config }
    }

    pub fn validate(prompt: &str, params: &SamplingParams) -> Result<(), ValidationError> {
        require_prompt(prompt)?;
        params.validate()?;
        Ok(())
    }

    /// Sample every candidate in turn, streaming tokens as they are drawn
    pub async fn generate<R: Rng + Send>(
        &self,
        prompt: &str,
        params: &SamplingParams,
        sampler: &mut Sampler<R>,
        events: &mpsc::Sender<CandidateEvent>,
    ) -> Result<Vec<Candidate>, GenerationError> {
        let prompt_tokens = self.oracle.encode(&wrap_prompt(prompt)).await?;
        let capacity = self.oracle.context_length();
        let mut responses = Vec::with_capacity(self.config.count);

        for index in 0..self.config.count {
            let mut window = ContextWindow::from_tokens(&prompt_tokens, capacity);
            let mut text = String::new();
            let mut tokens = Vec::new();

            for _ in 0..self.config.max_tokens {
                if events.is_closed() {
                    return Err(GenerationError::Cancelled);
                }
                let probabilities = self.oracle.distribution(window.tokens()).await?;
                let id = sampler.sample(&probabilities, params)?;
                window.push(id);

                let token = self.oracle.decode(&[id]).await?;
                if is_turn_boundary(&token) {
                    break;
                }
                tokens.push(id);
                text.push_str(&token);
                send(events, CandidateEvent::Token { index, token }).await?;
            }

            let candidate = Candidate {
                text: text.trim().to_string(),
                tokens,
            };
            send(
                events,
                CandidateEvent::CandidateDone {
                    index,
                    candidate: candidate.clone(),
                },
            )
            .await?;
            responses.push(candidate);
        }

        tracing::info!(count = responses.len(), "Generated ranking candidates");
        Ok(responses)
    }
}

async fn send(
    events: &mpsc::Sender<CandidateEvent>,
    event: CandidateEvent,
) -> Result<(), GenerationError> {
    events.send(event).await.map_err(|_| GenerationError::Cancelled)
}
