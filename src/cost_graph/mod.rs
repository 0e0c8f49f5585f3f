//! Cost graph over candidate sharding strategies.
//!
//! One node per leaf strategy group, one edge per pair of nodes that
//! exchange data. Each edge stores a communication and a memory cost matrix
//! indexed by the strategies of its endpoints. The graph is built once,
//! simplified once by merging nodes that follow each other, and then read by
//! the solver and by strategy extraction.
//!
//! # Module Structure
//!
//! - [`edges`]: canonical edge storage and accumulation
//! - `build`: construction from a [`StrategyMap`](crate::StrategyMap)
//! - `merge`: node merging, path compression and index remapping

mod build;
pub mod edges;
mod merge;


use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::strategy::{GroupId, InstructionId, NodeIdx, StrategyIdx};

pub use edges::EdgeCost;

/// Two operations eligible for all-reduce reassociation.
pub type AssociativePair = (GroupId, GroupId);

/// A follow relation dropped because the two nodes have different
/// strategy counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFollow {
    pub node: NodeIdx,
    pub following: NodeIdx,
    pub instruction_id: InstructionId,
    pub following_instruction_id: InstructionId,
}

#[derive(Clone, Debug)]
pub struct CostGraph {
    /// Strategy count of each node.
    pub(crate) node_lens: Vec<usize>,
    pub(crate) adjacency: Vec<BTreeSet<NodeIdx>>,
    /// Keyed by `(low, high)`; matrices are `[len(low), len(high)]`.
    pub(crate) edge_costs: BTreeMap<(NodeIdx, NodeIdx), EdgeCost>,
    /// Per-strategy bias folded in from merged edges.
    pub(crate) extra_node_costs: Vec<Vec<f64>>,
    /// Maps a strategy of a node's merge destination to the node's own
    /// strategy.
    pub(crate) reindexing: HashMap<NodeIdx, Vec<StrategyIdx>>,
    pub(crate) merged_to: HashMap<NodeIdx, NodeIdx>,
    /// Final destination per node; `None` until `simplify` runs.
    pub(crate) follow_idx: Option<Vec<Option<NodeIdx>>>,
    pub(crate) to_merge_pairs: Vec<(NodeIdx, NodeIdx)>,
    pub(crate) skipped_follows: Vec<SkippedFollow>,
}

impl CostGraph {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_lens.len()
    }

    /// Number of strategies of `node`.
    #[must_use]
    pub fn node_len(&self, node: NodeIdx) -> usize {
        self.node_lens[node]
    }

    #[must_use]
    pub fn node_lens(&self) -> &[usize] {
        &self.node_lens
    }

    /// Neighbors of `node`, ascending.
    #[must_use]
    pub fn adjacency(&self, node: NodeIdx) -> &BTreeSet<NodeIdx> {
        &self.adjacency[node]
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_costs.len()
    }

    /// Canonical `(low, high)` keys of every edge, ascending.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx)> + '_ {
        self.edge_costs.keys().copied()
    }

    #[must_use]
    pub fn extra_node_cost(&self, node: NodeIdx) -> &[f64] {
        &self.extra_node_costs[node]
    }

    /// Follow pairs `(src, dst)` queued during build.
    #[must_use]
    pub fn pending_merges(&self) -> &[(NodeIdx, NodeIdx)] {
        &self.to_merge_pairs
    }

    #[must_use]
    pub fn skipped_follows(&self) -> &[SkippedFollow] {
        &self.skipped_follows
    }

    #[must_use]
    pub fn is_merged(&self, node: NodeIdx) -> bool {
        self.merged_to.contains_key(&node)
    }

    /// The node `node` was finally merged into, or `None` if it is its own
    /// representative.
    ///
    /// # Panics
    ///
    /// Panics if [`CostGraph::simplify`] has not run.
    #[must_use]
    pub fn follow_idx(&self, node: NodeIdx) -> Option<NodeIdx> {
        self.follow_table()[node]
    }

    /// Nodes the solver decides on: every node not merged into another.
    pub fn representatives(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        (0..self.node_count()).filter(|node| !self.merged_to.contains_key(node))
    }

    /// Copy each representative's solved index onto the nodes following it.
    ///
    /// `solution` is indexed by node; entries of merged nodes are ignored.
    /// The result still holds representative-space indices, to be passed
    /// through [`CostGraph::remap_index`].
    #[must_use]
    pub fn expand_solution(&self, solution: &[StrategyIdx]) -> Vec<StrategyIdx> {
        assert_eq!(solution.len(), self.node_count(), "Solution length mismatch");
        self.follow_table()
            .iter()
            .enumerate()
            .map(|(node, follow)| solution[follow.unwrap_or(node)])
            .collect()
    }

    /// Edge communication cost plus extra node cost when every node `i`
    /// takes its own strategy `choice[i]`.
    ///
    /// Merged nodes contribute their extra cost at their local (remapped)
    /// index, so a solver reading only representatives misses it.
    #[must_use]
    pub fn assignment_cost(&self, choice: &[StrategyIdx]) -> f64 {
        assert_eq!(choice.len(), self.node_count(), "Assignment length mismatch");
        let node_cost: f64 = choice
            .iter()
            .enumerate()
            .map(|(node, &s)| self.extra_node_costs[node][s])
            .sum();
        let edge_cost: f64 = self
            .edge_costs
            .iter()
            .map(|(&(i, j), cost)| cost.communication[(choice[i], choice[j])])
            .sum();
        node_cost + edge_cost
    }
}

impl fmt::Display for CostGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cost Graph:")?;
        for (i, len) in self.node_lens.iter().enumerate() {
            writeln!(f, "Node{}: {}", i, len)?;
        }
        writeln!(f)?;
        for (&(i, j), cost) in &self.edge_costs {
            writeln!(f, "Edge ({}, {}):", i, j)?;
            writeln!(f, "{}", cost.communication)?;
        }
        Ok(())
    }
}
