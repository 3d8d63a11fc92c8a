//! Probability tree explorer
//!
//! Builds the oracle's top-k continuation tree for a prompt and extends it on
//! demand. Nothing is kept between requests: a node is identified by the
//! token-id path from the root, and every expansion replays prompt + path.

mod arena;
mod node;

pub use node::{BeamTree, NodeRef, TreeNode};

use crate::oracle::{OracleError, TokenId, TokenOracle};
use crate::protocol::markers::wrap_prompt;
use crate::validation::{require_prompt, TreeLimits, ValidationError};
use crate::window::ContextWindow;
use arena::{grow, Growth};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from tree exploration
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Exploration cancelled")]
    Cancelled,
}

/// Tree explorer over a token oracle
pub struct TreeExplorer {
    oracle: Arc<dyn TokenOracle>,
    limits: TreeLimits,
}

impl TreeExplorer {
    pub fn new(oracle: Arc<dyn TokenOracle>, limits: TreeLimits) -> Self {
        Self { oracle, limits }
    }

    async fn window_for(&self, prompt: &str, path: &[TokenId]) -> Result<ContextWindow, ExploreError> {
        let tokens = self.oracle.encode(prompt).await?;
        Ok(ContextWindow::from_tokens(&tokens, self.oracle.context_length()).extended(path))
    }

    /// Full tree: top `k` at each of `n` levels below the wrapped prompt
    pub async fn build(
        &self,
        prompt: &str,
        k: usize,
        n: usize,
        cancel: &CancellationToken,
    ) -> Result<BeamTree, ExploreError> {
        require_prompt(prompt)?;
        self.limits.check(k, n)?;

        let prompt = wrap_prompt(prompt);
        let window = self.window_for(&prompt, &[]).await?;
        let growth = Growth {
            first_k: k,
            skip: 0,
            k,
            levels: n,
            base_depth: 0,
            base_cumulative: 1.0,
        };
        let children = grow(self.oracle.as_ref(), window, &growth, cancel).await?;

        tracing::info!(k, n, top = children.len(), "Built beam tree");
        Ok(BeamTree { prompt, children })
    }

    /// One more level below each given node, keyed by path key.
    ///
    /// `prompt` is the literal prompt returned by [`TreeExplorer::build`].
    /// Child probabilities are relative to the expanded node.
    pub async fn expand_depth(
        &self,
        prompt: &str,
        nodes: &[NodeRef],
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, Vec<TreeNode>>, ExploreError> {
        require_prompt(prompt)?;
        self.limits.check_k(k)?;

        let mut children_map = BTreeMap::new();
        for node in nodes {
            let full_path = node.full_path();
            let window = self.window_for(prompt, &full_path).await?;
            let growth = Growth {
                first_k: k,
                skip: 0,
                k,
                levels: 1,
                base_depth: full_path.len(),
                base_cumulative: 1.0,
            };
            let children = grow(self.oracle.as_ref(), window, &growth, cancel).await?;
            children_map.insert(node.path_key(), children);
        }

        tracing::debug!(nodes = nodes.len(), k, "Expanded tree depth");
        Ok(children_map)
    }

    /// Widen the node at `path` from `current_k` to `current_k + additional_k`
    /// children, returning only the new ones with subtrees `n` levels deep.
    ///
    /// Subtrees branch by the widened k, so with an empty path the result is
    /// exactly the tail of `build` with that k.
    pub async fn expand_breadth(
        &self,
        prompt: &str,
        path: &[TokenId],
        current_k: usize,
        additional_k: usize,
        n: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<TreeNode>, ExploreError> {
        require_prompt(prompt)?;
        if additional_k == 0 {
            return Err(ValidationError::NothingToAdd.into());
        }
        let total_k = current_k.saturating_add(additional_k);
        self.limits.check(total_k, n)?;

        let window = self.window_for(prompt, path).await?;
        let growth = Growth {
            first_k: total_k,
            skip: current_k,
            k: total_k,
            levels: n,
            base_depth: path.len(),
            base_cumulative: 1.0,
        };
        let new_tokens = grow(self.oracle.as_ref(), window, &growth, cancel).await?;

        tracing::debug!(current_k, additional_k, n, added = new_tokens.len(), "Expanded tree breadth");
        Ok(new_tokens)
    }
}
