//! Deterministic oracles for testing
//!
//! Both fakes share a tiny tokenizer: ids 0..10 are the reserved control
//! tokens and every ASCII byte `b` is token `10 + b`.

use super::{OracleError, TokenId, TokenOracle};
use crate::protocol::markers::CONTROL_TOKENS;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const BYTE_OFFSET: TokenId = 10;
pub const VOCAB_SIZE: usize = 138;

/// Id of a control token in the fake vocabulary
pub fn control_id(token: &str) -> TokenId {
    let index = CONTROL_TOKENS
        .iter()
        .position(|t| *t == token)
        .unwrap_or_else(|| panic!("{token} is not a control token"));
    TokenId::try_from(index).unwrap()
}

/// Encode with the fake vocabulary
pub fn encode_fake(text: &str) -> Result<Vec<TokenId>, OracleError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    'outer: while !rest.is_empty() {
        for (index, control) in CONTROL_TOKENS.iter().enumerate() {
            if let Some(after) = rest.strip_prefix(control) {
                tokens.push(TokenId::try_from(index).unwrap());
                rest = after;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        let c = chars.next().unwrap();
        if !c.is_ascii() {
            return Err(OracleError::invalid_request(format!("non-ascii character {c:?}")));
        }
        tokens.push(BYTE_OFFSET + u32::from(c));
        rest = chars.as_str();
    }
    Ok(tokens)
}

/// Decode with the fake vocabulary
pub fn decode_fake(tokens: &[TokenId]) -> Result<String, OracleError> {
    let mut text = String::new();
    for &id in tokens {
        if id < BYTE_OFFSET {
            text.push_str(CONTROL_TOKENS[id as usize]);
        } else {
            let byte = u8::try_from(id - BYTE_OFFSET)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| OracleError::invalid_request(format!("unknown token {id}")))?;
            text.push(char::from(byte));
        }
    }
    Ok(text)
}

fn one_hot(id: TokenId) -> Vec<f32> {
    let mut probabilities = vec![0.0; VOCAB_SIZE];
    probabilities[id as usize] = 1.0;
    probabilities
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

// ============================================================================
// Hash oracle
// ============================================================================

/// Pure oracle: the distribution is a fixed function of the input sequence
pub struct HashOracle {
    context_length: usize,
    pub calls: AtomicUsize,
}

impl HashOracle {
    pub fn new(context_length: usize) -> Self {
        Self {
            context_length,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenOracle for HashOracle {
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let seed = tokens
            .iter()
            .fold(0xCBF2_9CE4_8422_2325_u64, |h, &t| splitmix64(h ^ u64::from(t)));

        let weights: Vec<f32> = (0..VOCAB_SIZE as u64)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let w = (splitmix64(seed ^ i) % 1000 + 1) as f32;
                w
            })
            .collect();
        let total: f32 = weights.iter().sum();
        Ok(weights.into_iter().map(|w| w / total).collect())
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError> {
        encode_fake(text)
    }

    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError> {
        decode_fake(tokens)
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

// ============================================================================
// Scripted oracle
// ============================================================================

/// Oracle that forces a queued sequence of tokens, then a fallback token
pub struct ScriptedOracle {
    script: Mutex<VecDeque<TokenId>>,
    fallback: TokenId,
    context_length: usize,
    fail_after: Mutex<Option<usize>>,
    /// Every sequence passed to `distribution`
    pub requests: Mutex<Vec<Vec<TokenId>>>,
}

impl ScriptedOracle {
    pub fn new(context_length: usize) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: control_id("<|endoftext|>"),
            context_length,
            fail_after: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue the tokens of `text` (control tokens included)
    pub fn then(self, text: &str) -> Self {
        let tokens = encode_fake(text).unwrap();
        self.script.lock().unwrap().extend(tokens);
        self
    }

    /// Queue `text` one ASCII byte per token, control tokens spelled out
    pub fn then_spelled(self, text: &str) -> Self {
        let tokens = text.bytes().map(|b| BYTE_OFFSET + u32::from(b));
        self.script.lock().unwrap().extend(tokens);
        self
    }

    /// Fail every distribution call once `calls` have succeeded
    pub fn failing_after(self, calls: usize) -> Self {
        *self.fail_after.lock().unwrap() = Some(calls);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<Vec<TokenId>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenOracle for ScriptedOracle {
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError> {
        let made = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(tokens.to_vec());
            requests.len() - 1
        };
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if made >= limit {
                return Err(OracleError::server_error("scripted failure"));
            }
        }
        let next = self.script.lock().unwrap().pop_front();
        Ok(one_hot(next.unwrap_or(self.fallback)))
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError> {
        encode_fake(text)
    }

    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError> {
        decode_fake(tokens)
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_tokenizer_round_trips_control_tokens() {
        let text = "<|ConversationStart|><|Them|>hi<|Me|>";
        let tokens = encode_fake(text).unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], control_id("<|ConversationStart|>"));
        assert_eq!(decode_fake(&tokens).unwrap(), text);
    }
}
