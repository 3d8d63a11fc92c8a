//! Request orchestration
//!
//! Ties the oracle, the session store and the three generators together.
//! Streaming operations report through an `mpsc` sender and always finish
//! with exactly one terminal event unless the receiver has gone away.

use crate::candidates::{CandidateEvent, CandidateGenerator};
use crate::config::EngineConfig;
use crate::explorer::TreeExplorer;
use crate::oracle::TokenOracle;
use crate::protocol::markers::find_reserved;
use crate::protocol::{GenerationError, History, ReplyEvent, ReplyGenerator};
use crate::sampler::{Sampler, SamplingParams};
use crate::session::SessionStore;
use crate::validation::ValidationError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

/// One conversational turn as requested by a client
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub session_id: String,
    pub message: String,
    /// Client-held history; takes precedence over the stored one when non-empty
    pub history: Option<String>,
    pub auto_start: bool,
}

impl TurnRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auto_start {
            return Ok(());
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if let Some(token) = find_reserved(&self.message) {
            return Err(ValidationError::ReservedToken { token });
        }
        Ok(())
    }
}

pub struct Engine {
    sessions: Arc<dyn SessionStore>,
    replies: ReplyGenerator,
    explorer: TreeExplorer,
    candidates: CandidateGenerator,
    seed: Option<u64>,
    requests: AtomicU64,
}

impl Engine {
    pub fn new(
        oracle: Arc<dyn TokenOracle>,
        sessions: Arc<dyn SessionStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            sessions,
            replies: ReplyGenerator::new(oracle.clone(), config.reply.clone()),
            explorer: TreeExplorer::new(oracle.clone(), config.tree_limits),
            candidates: CandidateGenerator::new(oracle, config.candidates.clone()),
            seed: config.seed,
            requests: AtomicU64::new(0),
        }
    }

    pub fn explorer(&self) -> &TreeExplorer {
        &self.explorer
    }

    /// Fresh sampler per request; seeded runs stay reproducible in order
    fn sampler(&self) -> Sampler {
        let request = self.requests.fetch_add(1, Ordering::Relaxed);
        Sampler::from_seed_option(self.seed.map(|seed| seed.wrapping_add(request)))
    }

    /// Generate one reply and persist the resulting history.
    ///
    /// The session stays checked out for the whole turn, so turns on the
    /// same id apply one after the other.
    pub async fn run_turn(&self, request: TurnRequest, events: mpsc::Sender<ReplyEvent>) {
        let span = tracing::info_span!(
            "turn",
            request_id = %Uuid::new_v4(),
            session_id = %request.session_id,
            auto_start = request.auto_start,
        );
        async move {
            let mut session = self.sessions.checkout(&request.session_id).await;
            let history = if request.auto_start {
                History::for_auto_start()
            } else {
                let prior = request
                    .history
                    .as_deref()
                    .filter(|h| !h.is_empty())
                    .or(session.history());
                History::for_user_turn(prior, request.message.trim())
            };

            let mut sampler = self.sampler();
            match self
                .replies
                .generate(history, request.auto_start, &mut sampler, &events)
                .await
            {
                Ok(history) => {
                    session.commit(history.clone());
                    tracing::info!(session_id = %session.id(), len = history.len(), "Turn complete");
                    let _ = events.send(ReplyEvent::Done { history }).await;
                }
                Err(GenerationError::Cancelled) => {
                    tracing::info!("Client went away, turn abandoned");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Turn failed");
                    let _ = events.send(ReplyEvent::Error { message: e.to_string() }).await;
                }
            }
        }
        .instrument(span)
        .await;
    }

    /// Forget a session; safe to call for unknown ids
    pub async fn reset(&self, session_id: &str) {
        let existed = self.sessions.delete(session_id).await;
        tracing::info!(session_id, existed, "Session reset");
    }

    pub async fn history(&self, session_id: &str) -> Option<String> {
        self.sessions.get(session_id).await
    }

    /// Sample ranking candidates, ending the stream with `AllDone` or `Error`
    pub async fn run_candidates(
        &self,
        prompt: String,
        params: SamplingParams,
        events: mpsc::Sender<CandidateEvent>,
    ) {
        let span = tracing::info_span!("candidates", request_id = %Uuid::new_v4());
        async move {
            let mut sampler = self.sampler();
            match self
                .candidates
                .generate(&prompt, &params, &mut sampler, &events)
                .await
            {
                Ok(responses) => {
                    let _ = events.send(CandidateEvent::AllDone { responses }).await;
                }
                Err(GenerationError::Cancelled) => {
                    tracing::info!("Client went away, candidates abandoned");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Candidate generation failed");
                    let _ = events
                        .send(CandidateEvent::Error { message: e.to_string() })
                        .await;
                }
            }
        }
        .instrument(span)
        .await;
    }
}
