//! API request and response types

use crate::explorer::{NodeRef, TreeNode};
use crate::oracle::TokenId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_session_id() -> String {
    "default".to_string()
}

fn default_k() -> usize {
    5
}

fn default_n() -> usize {
    5
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.9
}

/// Request for one conversational turn
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Client-held history overriding the stored one
    #[serde(default)]
    pub history: Option<String>,
    /// Let the model open the conversation
    #[serde(default)]
    pub auto_start: bool,
}

/// Request to clear a session
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

impl Default for ResetRequest {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
        }
    }
}

/// Request for a full probability tree
#[derive(Debug, Deserialize)]
pub struct BeamTreeRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_n")]
    pub n: usize,
}

/// Request to add one level below existing nodes
#[derive(Debug, Deserialize)]
pub struct ExpandDepthRequest {
    /// Wrapped prompt as returned by the tree endpoint
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub nodes: Vec<NodeRef>,
    #[serde(default = "default_k")]
    pub k: usize,
}

/// Request for more siblings at one node
#[derive(Debug, Deserialize)]
pub struct ExpandBreadthRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub path: Vec<TokenId>,
    pub current_k: usize,
    pub additional_k: usize,
    #[serde(default = "default_n")]
    pub n: usize,
}

/// Request for ranking candidates
#[derive(Debug, Deserialize)]
pub struct CandidatesRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_k")]
    pub top_k: usize,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub use_top_k: bool,
}

/// Response for depth expansion, keyed by comma-joined path
#[derive(Debug, Serialize)]
pub struct ExpandDepthResponse {
    pub children_map: BTreeMap<String, Vec<TreeNode>>,
}

/// Response for breadth expansion
#[derive(Debug, Serialize)]
pub struct ExpandBreadthResponse {
    pub new_tokens: Vec<TreeNode>,
}

/// Response with a session's stored history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Option<String>,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
