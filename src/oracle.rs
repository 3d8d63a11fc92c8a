//! Token oracle abstraction
//!
//! The oracle is the external language model: it maps a token sequence to a
//! next-token distribution and converts between text and token ids. Everything
//! else in the engine is written against [`TokenOracle`] so it can run against
//! a deterministic fake in tests.

mod error;
mod remote;

#[cfg(test)]
pub mod testing;

pub use error::OracleError;
pub use remote::RemoteOracle;

use async_trait::async_trait;
use std::sync::Arc;

/// Token identifier in the oracle's vocabulary
pub type TokenId = u32;

/// Next-token distribution model
#[async_trait]
pub trait TokenOracle: Send + Sync {
    /// Probabilities over the whole vocabulary for the token following `tokens`
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError>;

    /// Tokenize text, control tokens included
    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError>;

    /// Detokenize ids back to text
    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError>;

    /// Maximum number of tokens the model attends to
    fn context_length(&self) -> usize;
}

#[async_trait]
impl<T: TokenOracle + ?Sized> TokenOracle for Arc<T> {
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError> {
        (**self).distribution(tokens).await
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError> {
        (**self).encode(text).await
    }

    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError> {
        (**self).decode(tokens).await
    }

    fn context_length(&self) -> usize {
        (**self).context_length()
    }
}

/// Logging wrapper for oracles
pub struct LoggingOracle {
    inner: Arc<dyn TokenOracle>,
}

impl LoggingOracle {
    pub fn new(inner: Arc<dyn TokenOracle>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TokenOracle for LoggingOracle {
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError> {
        let start = std::time::Instant::now();
        let result = self.inner.distribution(tokens).await;
        let duration = start.elapsed();

        match &result {
            Ok(probabilities) => {
                tracing::debug!(
                    duration_ms = %duration.as_millis(),
                    input_tokens = tokens.len(),
                    vocab_size = probabilities.len(),
                    "Oracle distribution completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    input_tokens = tokens.len(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Oracle distribution failed"
                );
            }
        }

        result
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError> {
        let result = self.inner.encode(text).await;
        if let Err(e) = &result {
            tracing::error!(error = %e.message, chars = text.len(), "Oracle encode failed");
        }
        result
    }

    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError> {
        let result = self.inner.decode(tokens).await;
        if let Err(e) = &result {
            tracing::error!(error = %e.message, tokens = tokens.len(), "Oracle decode failed");
        }
        result
    }

    fn context_length(&self) -> usize {
        self.inner.context_length()
    }
}
