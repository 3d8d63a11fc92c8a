//! HTTP client for an inference sidecar
//!
//! The sidecar hosts the model weights and tokenizer and exposes three JSON
//! endpoints: `/distribution`, `/encode` and `/decode`.

use super::{OracleError, TokenId, TokenOracle};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Oracle backed by a remote inference server
pub struct RemoteOracle {
    client: Client,
    base_url: String,
    context_length: usize,
}

impl RemoteOracle {
    pub fn new(base_url: &str, context_length: usize) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| OracleError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            context_length,
        })
    }

    async fn post<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp, OracleError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    OracleError::network(format!("Connection failed: {e}"))
                } else {
                    OracleError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OracleError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            OracleError::invalid_response(format!("Failed to parse {endpoint} response: {e}"))
        })
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> OracleError {
    match status.as_u16() {
        400..=499 => OracleError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => OracleError::server_error(format!("Server error: {body}")),
        _ => OracleError::invalid_response(format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl TokenOracle for RemoteOracle {
    async fn distribution(&self, tokens: &[TokenId]) -> Result<Vec<f32>, OracleError> {
        let resp: DistributionResponse = self
            .post("distribution", &TokensBody { tokens })
            .await?;

        if resp.probabilities.is_empty() {
            return Err(OracleError::invalid_response(
                "Distribution response contained no probabilities",
            ));
        }
        if resp.probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(OracleError::invalid_response(
                "Distribution contained negative or non-finite probabilities",
            ));
        }
        Ok(resp.probabilities)
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>, OracleError> {
        let resp: EncodeResponse = self.post("encode", &EncodeBody { text }).await?;
        Ok(resp.tokens)
    }

    async fn decode(&self, tokens: &[TokenId]) -> Result<String, OracleError> {
        let resp: DecodeResponse = self.post("decode", &TokensBody { tokens }).await?;
        Ok(resp.text)
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

// Sidecar wire types

#[derive(Debug, Serialize)]
struct TokensBody<'a> {
    tokens: &'a [TokenId],
}

#[derive(Debug, Serialize)]
struct EncodeBody<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct DistributionResponse {
    probabilities: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    tokens: Vec<TokenId>,
}

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    text: String,
}
