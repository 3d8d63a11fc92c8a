//! Process configuration from the environment

use crate::candidates::CandidateConfig;
use crate::protocol::ReplyConfig;
use crate::sampler::SamplingParams;
use crate::validation::TreeLimits;
use std::str::FromStr;

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub port: u16,
    /// Base URL of the inference sidecar
    pub oracle_url: String,
    /// Model context window in tokens
    pub context_length: usize,
    pub reply: ReplyConfig,
    pub candidates: CandidateConfig,
    pub tree_limits: TreeLimits,
    /// Fixed sampler seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: 5002,
            oracle_url: "http://127.0.0.1:5003".to_string(),
            context_length: 256,
            reply: ReplyConfig::default(),
            candidates: CandidateConfig::default(),
            tree_limits: TreeLimits::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| parse::<usize>(key, &v));

        let reply = ReplyConfig {
            max_tokens: parsed("TURNLOOM_MAX_REPLY_TOKENS")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.reply.max_tokens),
            sampling: SamplingParams::top_k(
                parsed("TURNLOOM_REPLY_TOP_K")
                    .filter(|&k| k > 0)
                    .unwrap_or(3),
            ),
            max_attempts: lookup("TURNLOOM_MAX_EMPTY_ATTEMPTS")
                .and_then(|v| parse::<u32>("TURNLOOM_MAX_EMPTY_ATTEMPTS", &v))
                .filter(|&n| n > 0)
                .unwrap_or(defaults.reply.max_attempts),
            greeting: lookup("TURNLOOM_GREETING").unwrap_or(defaults.reply.greeting),
        };

        Self {
            port: lookup("TURNLOOM_PORT")
                .and_then(|v| parse("TURNLOOM_PORT", &v))
                .unwrap_or(defaults.port),
            oracle_url: lookup("TURNLOOM_ORACLE_URL").unwrap_or(defaults.oracle_url),
            context_length: parsed("TURNLOOM_CONTEXT_LENGTH")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.context_length),
            reply,
            candidates: defaults.candidates,
            tree_limits: defaults.tree_limits,
            seed: lookup("TURNLOOM_SEED").and_then(|v| parse("TURNLOOM_SEED", &v)),
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value, "Ignoring unparseable setting");
    }
    parsed
}
