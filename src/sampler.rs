//! Next-token sampling: temperature, top-k and nucleus (top-p)

use crate::oracle::TokenId;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use thiserror::Error;

/// Sampling errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SamplerError {
    #[error("Distribution is empty or has no probability mass")]
    EmptyDistribution,
    #[error("Temperature must be finite and > 0, got {0}")]
    InvalidTemperature(f32),
    #[error("top_k must be >= 1")]
    InvalidTopK,
    #[error("top_p must be within [0, 1], got {0}")]
    InvalidTopP(f32),
}

/// Candidate restriction strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingMode {
    /// Keep the k most probable tokens
    TopK(usize),
    /// Keep the smallest prefix whose mass first exceeds p
    Nucleus(f32),
}

/// Full sampling configuration for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub mode: SamplingMode,
}

impl SamplingParams {
    pub fn top_k(k: usize) -> Self {
        Self {
            temperature: 1.0,
            mode: SamplingMode::TopK(k),
        }
    }

    /// Build from the flat request shape (`use_top_k` picks the mode)
    pub fn from_flags(temperature: f32, use_top_k: bool, top_k: usize, top_p: f32) -> Self {
        let mode = if use_top_k {
            SamplingMode::TopK(top_k)
        } else {
            SamplingMode::Nucleus(top_p)
        };
        Self { temperature, mode }
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(SamplerError::InvalidTemperature(self.temperature));
        }
        match self.mode {
            SamplingMode::TopK(0) => Err(SamplerError::InvalidTopK),
            SamplingMode::Nucleus(p) if !(0.0..=1.0).contains(&p) => {
                Err(SamplerError::InvalidTopP(p))
            }
            _ => Ok(()),
        }
    }
}

/// The `k` most probable tokens, descending; ties keep ascending token id
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<(TokenId, f32)> {
    let mut ranked = ranked(probabilities);
    ranked.truncate(k);
    ranked
}

fn ranked(probabilities: &[f32]) -> Vec<(TokenId, f32)> {
    let mut ranked: Vec<(TokenId, f32)> = probabilities
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| TokenId::try_from(i).ok().map(|id| (id, p)))
        .collect();
    // Stable sort: equal probabilities stay in vocabulary order
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

/// Rescale a probability vector as `softmax(log(p) / temperature)`
fn apply_temperature(probabilities: &[f32], temperature: f32) -> Vec<f32> {
    if (temperature - 1.0).abs() < f32::EPSILON {
        return probabilities.to_vec();
    }
    let scaled: Vec<f32> = probabilities
        .iter()
        .map(|&p| if p > 0.0 { p.ln() / temperature } else { f32::NEG_INFINITY })
        .collect();
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return vec![0.0; probabilities.len()];
    }
    let exps: Vec<f32> = scaled.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Restrict a ranked distribution to its nucleus
fn nucleus(ranked: Vec<(TokenId, f32)>, top_p: f32) -> Vec<(TokenId, f32)> {
    let mut cumulative = 0.0_f32;
    let mut kept = Vec::new();
    for (id, p) in ranked {
        cumulative += p;
        kept.push((id, p));
        if cumulative > top_p {
            break;
        }
    }
    kept
}

/// Token sampler over an injectable random source
pub struct Sampler<R: Rng = StdRng> {
    rng: R,
}

impl Sampler<StdRng> {
    /// Reproducible sampler
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded when a seed is configured, entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl<R: Rng> Sampler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one token id from `probabilities`
    pub fn sample(
        &mut self,
        probabilities: &[f32],
        params: &SamplingParams,
    ) -> Result<TokenId, SamplerError> {
        params.validate()?;

        let tempered = apply_temperature(probabilities, params.temperature);
        let ranked = ranked(&tempered);

        let candidates = match params.mode {
            SamplingMode::TopK(k) => {
                let mut kept = ranked;
                kept.truncate(k);
                kept
            }
            SamplingMode::Nucleus(p) => nucleus(ranked, p),
        };

        let weights: Vec<f32> = candidates.iter().map(|(_, p)| *p).collect();
        // WeightedIndex renormalises the restricted set
        let index = WeightedIndex::new(&weights).map_err(|_| SamplerError::EmptyDistribution)?;
        Ok(candidates[index.sample(&mut self.rng)].0)
    }
}
