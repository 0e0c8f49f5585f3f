//! Node merging, path compression and index remapping.
//!
//! Merging `src` into `dst` moves all of `src`'s cost onto `dst`: the
//! `src`-`dst` edge becomes extra node cost on `dst`, and every other edge
//! of `src` is re-expressed in `dst`'s strategy space. A reindexing vector
//! records, for each `dst` strategy, which `src` strategy goes with it.

use log::{debug, trace};

use super::CostGraph;
use crate::matrix::Matrix;
use crate::strategy::{NodeIdx, StrategyIdx};

impl CostGraph {
    /// Fold `src` into `dst`, leaving `src` isolated.
    ///
    /// Extra node cost that `src` already collected stays on `src`, in its own
    /// strategy space; [`CostGraph::assignment_cost`] counts it there.
    ///
    /// # Panics
    ///
    /// Panics if `src == dst`, if the two are not adjacent, or if either has
    /// already been merged away.
    pub fn merge_node(&mut self, src: NodeIdx, dst: NodeIdx) {
        assert_ne!(src, dst, "Cannot merge node {} into itself", src);
        assert!(
            !self.merged_to.contains_key(&src),
            "Node {} is already merged into {}",
            src,
            self.merged_to[&src]
        );
        assert!(
            !self.merged_to.contains_key(&dst),
            "Merge target {} is already merged into {}",
            dst,
            self.merged_to[&dst]
        );
        assert!(
            self.adjacency[src].contains(&dst) && self.adjacency[dst].contains(&src),
            "Cannot merge node {} into non-adjacent node {}",
            src,
            dst
        );

        let edge = self.get(dst, src);
        let reindexing = self.follow_reindexing(&edge, src, dst);

        let neighbors: Vec<NodeIdx> = self.adjacency[src].iter().copied().collect();
        for &adj in &neighbors {
            if adj == dst {
                for (i, &j) in reindexing.iter().enumerate() {
                    self.extra_node_costs[dst][i] += edge[(i, j)];
                }
            } else {
                let moved = self.edge_cost(src, adj).select_rows(&reindexing);
                self.add_edge_cost(dst, adj, moved);
            }
        }
        for &adj in &neighbors {
            self.remove_edge(src, adj);
        }

        self.merged_to.insert(src, dst);
        self.reindexing.insert(src, reindexing);
        debug!(
            "Merged node {} into node {} ({} neighbors moved)",
            src,
            dst,
            neighbors.len() - 1
        );
    }

    /// For each `dst` strategy, the `src` strategy that follows it.
    ///
    /// Equal counts pair strategies up by position. Otherwise each `dst`
    /// strategy takes the cheapest `src` strategy on `edge` (`[dst, src]`),
    /// ties going to the highest index, which is where the replicated
    /// strategy sits.
    fn follow_reindexing(&self, edge: &Matrix, src: NodeIdx, dst: NodeIdx) -> Vec<StrategyIdx> {
        let (dst_len, src_len) = (self.node_lens[dst], self.node_lens[src]);
        if dst_len == src_len {
            return (0..dst_len).collect();
        }
        assert!(src_len > 0, "Cannot follow node {} with no strategies", src);
        (0..dst_len)
            .map(|i| {
                let row = edge.row(i);
                let mut best = 0;
                for (j, &cost) in row.iter().enumerate().skip(1) {
                    if cost <= row[best] {
                        best = j;
                    }
                }
                best
            })
            .collect()
    }

    /// Final merge destination of `node`, or `node` itself if it was never
    /// merged.
    ///
    /// Every node on the way is repointed straight at the destination, with
    /// its reindexing vector composed through the chain.
    pub fn resolve(&mut self, node: NodeIdx) -> NodeIdx {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(&next) = self.merged_to.get(&current) {
            path.push(current);
            current = next;
        }
        let root = current;

        // The last entry already points at the root. Walk back towards
        // `node`, each step composing through the freshly compressed parent.
        for k in (0..path.len().saturating_sub(1)).rev() {
            let (child, parent) = (path[k], path[k + 1]);
            let own = &self.reindexing[&child];
            let composed: Vec<StrategyIdx> = self.reindexing[&parent]
                .iter()
                .map(|&p| own[p])
                .collect();
            self.reindexing.insert(child, composed);
            self.merged_to.insert(child, root);
            trace!("Compressed merge path {} -> {}", child, root);
        }
        root
    }

    /// Merge every queued follow pair (when `enable`) and build the follow
    /// table.
    ///
    /// # Panics
    ///
    /// Panics if called twice.
    pub fn simplify(&mut self, enable: bool) {
        assert!(self.follow_idx.is_none(), "Cost graph was already simplified");

        if enable {
            let pairs = self.to_merge_pairs.clone();
            for (src, dst) in pairs {
                let dst = self.resolve(dst);
                self.merge_node(src, dst);
            }
        }

        let node_count = self.node_count();
        let follow_idx: Vec<Option<NodeIdx>> = (0..node_count)
            .map(|i| {
                if self.merged_to.contains_key(&i) {
                    Some(self.resolve(i))
                } else {
                    None
                }
            })
            .collect();
        self.follow_idx = Some(follow_idx);

        debug!(
            "Simplified cost graph: {} of {} nodes merged, {} edges left",
            self.merged_to.len(),
            node_count,
            self.edge_count()
        );
    }

    /// Translate a strategy index solved on `node`'s representative into
    /// `node`'s own strategy index.
    ///
    /// # Panics
    ///
    /// Panics if [`CostGraph::simplify`] has not run.
    #[must_use]
    pub fn remap_index(&self, node: NodeIdx, value: StrategyIdx) -> StrategyIdx {
        match self.follow_table()[node] {
            None => value,
            Some(_) => self.reindexing[&node][value],
        }
    }

    pub(crate) fn follow_table(&self) -> &[Option<NodeIdx>] {
        match &self.follow_idx {
            Some(table) => table,
            None => panic!("Cost graph queried before simplify"),
        }
    }
}
