//! Events that drive a turn

use super::markers::TokenClass;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Start generating the reply
    Begin,
    /// The sampler produced a token
    Sampled(TokenClass),
    /// The per-reply token budget ran out
    BudgetExhausted,
}
