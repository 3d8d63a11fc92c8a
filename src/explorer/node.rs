//! Tree node types

use crate::oracle::TokenId;
use serde::{Deserialize, Serialize};

/// One continuation in the probability tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub token_id: TokenId,
    pub token_str: String,
    /// Conditional probability given the path to the parent
    pub probability: f64,
    /// Product of probabilities from the expansion root to this node
    #[serde(rename = "cumulative_prob")]
    pub cumulative_probability: f64,
    pub depth: usize,
    /// `None` once the requested depth is reached
    pub children: Option<Vec<TreeNode>>,
}

/// Fully built tree for a prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamTree {
    /// Prompt exactly as tokenized; expansion requests send it back
    pub prompt: String,
    pub children: Vec<TreeNode>,
}

/// Address of an already materialised node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeRef {
    /// Token ids from the root down to the node's parent
    pub path: Vec<TokenId>,
    pub token_id: TokenId,
}

impl NodeRef {
    /// Full path including the node itself
    pub fn full_path(&self) -> Vec<TokenId> {
        let mut path = self.path.clone();
        path.push(self.token_id);
        path
    }

    /// Stateless cross-request identifier, e.g. `"12,7,93"`
    pub fn path_key(&self) -> String {
        self.full_path()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
