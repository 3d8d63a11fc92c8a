//! Request validation shared by the engine entry points
//!
//! Every check here runs before the oracle is touched.

use crate::sampler::SamplerError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("No prompt provided")]
    EmptyPrompt,
    #[error("No message provided")]
    EmptyMessage,
    #[error("Message must not contain the reserved token {token}")]
    ReservedToken { token: &'static str },
    #[error("k must be >= 1")]
    KTooSmall,
    #[error("k must be <= {max}")]
    KTooLarge { max: usize },
    #[error("n must be >= 1")]
    NTooSmall,
    #[error("n must be <= {max} for full tree generation. Use lazy loading for deeper trees.")]
    NTooLarge { max: usize },
    #[error("additional_k must be >= 1")]
    NothingToAdd,
    #[error("Invalid sampling parameters: {0}")]
    Sampling(#[from] SamplerError),
}

/// Admission limits for tree exploration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    pub max_k: usize,
    pub max_n: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_k: 500,
            max_n: 10,
        }
    }
}

impl TreeLimits {
    pub fn check_k(&self, k: usize) -> Result<(), ValidationError> {
        if k == 0 {
            return Err(ValidationError::KTooSmall);
        }
        if k > self.max_k {
            return Err(ValidationError::KTooLarge { max: self.max_k });
        }
        Ok(())
    }

    pub fn check_n(&self, n: usize) -> Result<(), ValidationError> {
        if n == 0 {
            return Err(ValidationError::NTooSmall);
        }
        if n > self.max_n {
            return Err(ValidationError::NTooLarge { max: self.max_n });
        }
        Ok(())
    }

    pub fn check(&self, k: usize, n: usize) -> Result<(), ValidationError> {
        self.check_k(k)?;
        self.check_n(n)
    }
}

pub fn require_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        Err(ValidationError::EmptyPrompt)
    } else {
        Ok(())
    }
}
