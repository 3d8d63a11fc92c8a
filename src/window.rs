//! Sliding context window
//!
//! Every token sequence handed to the oracle goes through a [`ContextWindow`],
//! which keeps only the most recent `capacity` tokens.

use crate::oracle::TokenId;

/// Bounded token buffer with drop-oldest eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    tokens: Vec<TokenId>,
    capacity: usize,
}

impl ContextWindow {
    /// Build a window from a sequence, keeping its most recent `capacity` tokens
    pub fn from_tokens(tokens: &[TokenId], capacity: usize) -> Self {
        let start = tokens.len().saturating_sub(capacity);
        Self {
            tokens: tokens[start..].to_vec(),
            capacity,
        }
    }

    /// Copy of this window with `token` appended
    #[must_use]
    pub fn pushed(&self, token: TokenId) -> Self {
        let mut next = self.clone();
        next.push(token);
        next
    }

    /// Append `token`, evicting the oldest token when full
    pub fn push(&mut self, token: TokenId) {
        if self.capacity == 0 {
            return;
        }
        if self.tokens.len() >= self.capacity {
            self.tokens.remove(0);
        }
        self.tokens.push(token);
    }

    /// Replay `path` on top of this window
    #[must_use]
    pub fn extended(&self, path: &[TokenId]) -> Self {
        let mut next = self.clone();
        for &token in path {
            next.push(token);
        }
        next
    }

    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }
}
