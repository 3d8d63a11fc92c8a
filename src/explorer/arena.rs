//! Iterative tree construction
//!
//! Nodes are created into a flat arena and linked by index while an explicit
//! stack of frames walks the tree, so the depth of the tree never becomes
//! call-stack depth. The nested [`TreeNode`] form is assembled at the end.

use super::{ExploreError, TreeNode};
use crate::oracle::{TokenId, TokenOracle};
use crate::sampler::top_k;
use crate::window::ContextWindow;
use tokio_util::sync::CancellationToken;

/// Shape of a forest to grow below one context window
#[derive(Debug, Clone)]
pub(super) struct Growth {
    /// Candidates fetched at the first level
    pub first_k: usize,
    /// Leading first-level candidates the caller already has
    pub skip: usize,
    /// Branching factor below the first level
    pub k: usize,
    /// Levels to materialise, counting the first
    pub levels: usize,
    /// Depth label of first-level nodes
    pub base_depth: usize,
    /// Cumulative probability of the node the forest hangs from
    pub base_cumulative: f64,
}

struct ArenaNode {
    token_id: TokenId,
    token_str: String,
    probability: f64,
    cumulative: f64,
    depth: usize,
    children: Option<Vec<usize>>,
}

enum Slot {
    Root,
    Node(usize),
}

struct Frame {
    window: ContextWindow,
    level: usize,
    depth: usize,
    cumulative: f64,
    slot: Slot,
}

pub(super) async fn grow(
    oracle: &dyn TokenOracle,
    window: ContextWindow,
    growth: &Growth,
    cancel: &CancellationToken,
) -> Result<Vec<TreeNode>, ExploreError> {
    let mut arena: Vec<ArenaNode> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut stack = vec![Frame {
        window,
        level: 1,
        depth: growth.base_depth,
        cumulative: growth.base_cumulative,
        slot: Slot::Root,
    }];

    while let Some(frame) = stack.pop() {
        if cancel.is_cancelled() {
            return Err(ExploreError::Cancelled);
        }

        let (k, skip) = if frame.level == 1 {
            (growth.first_k, growth.skip)
        } else {
            (growth.k, 0)
        };

        let probabilities = oracle.distribution(frame.window.tokens()).await?;
        let mut ids = Vec::with_capacity(k.saturating_sub(skip));

        let ranked = top_k(&probabilities, k).into_iter().skip(skip);
        // Tokens the oracle gives no mass never become nodes
        for (token_id, probability) in ranked.filter(|&(_, p)| p > 0.0) {
            let token_str = oracle.decode(&[token_id]).await?;
            let probability = f64::from(probability);
            let cumulative = frame.cumulative * probability;
            let index = arena.len();
            arena.push(ArenaNode {
                token_id,
                token_str,
                probability,
                cumulative,
                depth: frame.depth,
                children: None,
            });
            ids.push(index);

            if frame.level < growth.levels {
                stack.push(Frame {
                    window: frame.window.pushed(token_id),
                    level: frame.level + 1,
                    depth: frame.depth + 1,
                    cumulative,
                    slot: Slot::Node(index),
                });
            }
        }

        match frame.slot {
            Slot::Root => roots = ids,
            Slot::Node(parent) => arena[parent].children = Some(ids),
        }
    }

    Ok(assemble(arena, &roots))
}

/// Nest arena nodes; children always sit at higher indices than their parent
fn assemble(arena: Vec<ArenaNode>, roots: &[usize]) -> Vec<TreeNode> {
    let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (index, node) in arena.into_iter().enumerate().rev() {
        let children = node
            .children
            .map(|ids| ids.into_iter().filter_map(|c| built[c].take()).collect());
        built[index] = Some(TreeNode {
            token_id: node.token_id,
            token_str: node.token_str,
            probability: node.probability,
            cumulative_probability: node.cumulative,
            depth: node.depth,
            children,
        });
    }

    roots.iter().filter_map(|&i| built[i].take()).collect()
}
