//! Building the raw cost graph from enumerated strategies.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};

use super::{AssociativePair, CostGraph, EdgeCost, SkippedFollow};
use crate::config::Config;
use crate::matrix::Matrix;
use crate::strategy::{
    GroupId, NodeIdx, ShardingStrategy, StrategyGroup, StrategyGroupKind, StrategyIdx, StrategyMap,
};

impl CostGraph {
    /// Build the cost graph for every leaf of `strategy_map`.
    ///
    /// Operand edges carry the resharding costs of each consumer strategy.
    /// Follow relations between nodes of equal strategy count are queued for
    /// [`CostGraph::simplify`]; the rest are skipped with a warning. Each
    /// pair in `associative_pairs` then gets a discount edge.
    pub fn build(
        strategy_map: &StrategyMap,
        associative_pairs: &[AssociativePair],
        config: &Config,
    ) -> Self {
        let node_lens: Vec<usize> = strategy_map
            .leaves()
            .iter()
            .map(|&id| leaf(strategy_map, id, "cost graph node").1.len())
            .collect();
        let node_count = node_lens.len();

        let mut graph = CostGraph {
            extra_node_costs: node_lens.iter().map(|&len| vec![0.0; len]).collect(),
            adjacency: vec![BTreeSet::new(); node_count],
            node_lens,
            edge_costs: BTreeMap::new(),
            reindexing: HashMap::new(),
            merged_to: HashMap::new(),
            follow_idx: None,
            to_merge_pairs: Vec::new(),
            skipped_follows: Vec::new(),
        };

        for &id in strategy_map.leaves() {
            let group = strategy_map.group(id);
            let (node_idx, strategies) = leaf(strategy_map, id, "cost graph node");
            graph.add_operand_edges(strategy_map, group, node_idx, strategies);
            graph.queue_follow(strategy_map, group, node_idx);
        }

        for &pair in associative_pairs {
            graph.add_reassociation_discount(strategy_map, pair, config.reassociation_tolerance);
        }

        debug!(
            "Built cost graph: {} nodes, {} edges, {} pending merges, {} skipped follows",
            graph.node_count(),
            graph.edge_count(),
            graph.to_merge_pairs.len(),
            graph.skipped_follows.len()
        );
        graph
    }

    fn add_operand_edges(
        &mut self,
        strategy_map: &StrategyMap,
        group: &StrategyGroup,
        dst: NodeIdx,
        strategies: &[ShardingStrategy],
    ) {
        let operand_count = group.in_nodes.len();
        let tuple_operands = group
            .in_nodes
            .iter()
            .filter(|&&id| strategy_map.group(id).is_tuple())
            .count();
        assert!(
            operand_count <= 1 || tuple_operands <= 1,
            "Instruction {} has {} tuple operands among {} operands; \
             at most one tuple operand is supported",
            group.instruction_id,
            tuple_operands,
            operand_count
        );

        for (operand_idx, &operand) in group.in_nodes.iter().enumerate() {
            match &strategy_map.group(operand).kind {
                StrategyGroupKind::Leaf { node_idx: src, .. } => {
                    let cost = self.resharding_edge(*src, dst, operand_idx, strategies);
                    self.add_edge_cost(*src, dst, cost);
                }
                // One tuple among several operands: connect its elements
                // without cost so they stay adjacent to the consumer.
                StrategyGroupKind::Tuple { children } if operand_count > 1 => {
                    for &child in children {
                        let (src, _) = leaf(strategy_map, child, "tuple operand element");
                        let cost = EdgeCost::zeros(self.node_lens[src], self.node_lens[dst]);
                        self.add_edge_cost(src, dst, cost);
                    }
                }
                // Sole tuple operand: element `l` uses resharding costs `l`.
                StrategyGroupKind::Tuple { children } => {
                    for (element_idx, &child) in children.iter().enumerate() {
                        let (src, _) = leaf(strategy_map, child, "tuple operand element");
                        let cost = self.resharding_edge(src, dst, element_idx, strategies);
                        self.add_edge_cost(src, dst, cost);
                    }
                }
            }
        }
    }

    /// Edge `[len(src), len(dst)]` whose column `k` holds the resharding
    /// costs of `dst` strategy `k` for operand `operand_idx`.
    fn resharding_edge(
        &self,
        src: NodeIdx,
        dst: NodeIdx,
        operand_idx: usize,
        strategies: &[ShardingStrategy],
    ) -> EdgeCost {
        let node_count = self.node_lens.len();
        assert!(
            src < node_count && dst < node_count,
            "Edge ({}, {}) out of range for {} nodes",
            src,
            dst,
            node_count
        );
        let mut cost = EdgeCost::zeros(self.node_lens[src], self.node_lens[dst]);
        for (k, strategy) in strategies.iter().enumerate() {
            let communication = operand_costs(
                &strategy.communication_resharding_costs,
                operand_idx,
                dst,
                &strategy.name,
            );
            let memory =
                operand_costs(&strategy.memory_resharding_costs, operand_idx, dst, &strategy.name);
            fill_column(&mut cost.communication, k, communication);
            fill_column(&mut cost.memory, k, memory);
        }
        cost
    }

    fn queue_follow(
        &mut self,
        strategy_map: &StrategyMap,
        group: &StrategyGroup,
        node_idx: NodeIdx,
    ) {
        let Some(following) = group.following else {
            return;
        };
        let (target, _) = leaf(strategy_map, following, "followed group");
        let followed = strategy_map.group(following);

        if self.node_lens[node_idx] == self.node_lens[target] {
            self.to_merge_pairs.push((node_idx, target));
        } else {
            warn!(
                "Different strategy counts for instruction ID {} and following instruction ID {}",
                group.instruction_id, followed.instruction_id
            );
            self.skipped_follows.push(SkippedFollow {
                node: node_idx,
                following: target,
                instruction_id: group.instruction_id,
                following_instruction_id: followed.instruction_id,
            });
        }
    }

    /// Pre-discount the communication saved when both operations of a
    /// reassociation pair pick the same named strategy.
    fn add_reassociation_discount(
        &mut self,
        strategy_map: &StrategyMap,
        (src_group, dst_group): AssociativePair,
        tolerance: f64,
    ) {
        let (src, src_strategies) = leaf(strategy_map, src_group, "reassociation pair source");
        let (dst, dst_strategies) = leaf(strategy_map, dst_group, "reassociation pair destination");

        let src_by_name: HashMap<&str, StrategyIdx> = src_strategies
            .iter()
            .enumerate()
            .filter(|(_, s)| s.communication_cost > 0.0)
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        let mut cost = EdgeCost::zeros(self.node_lens[src], self.node_lens[dst]);
        for (j, dst_strategy) in dst_strategies.iter().enumerate() {
            if dst_strategy.communication_cost <= 0.0 {
                continue;
            }
            let Some(&i) = src_by_name.get(dst_strategy.name.as_str()) else {
                continue;
            };
            let src_cost = src_strategies[i].communication_cost;
            assert!(
                (src_cost - dst_strategy.communication_cost).abs() <= tolerance,
                "Reassociation pair ({}, {}): strategy {:?} costs {} and {} on the two sides",
                src,
                dst,
                dst_strategy.name,
                src_cost,
                dst_strategy.communication_cost
            );
            cost.communication[(i, j)] = -src_cost;
        }
        self.add_edge_cost(src, dst, cost);
    }
}

/// Node index and strategies of a group that must be a leaf.
fn leaf<'a>(
    strategy_map: &'a StrategyMap,
    id: GroupId,
    role: &str,
) -> (NodeIdx, &'a [ShardingStrategy]) {
    match &strategy_map.group(id).kind {
        StrategyGroupKind::Leaf {
            node_idx,
            strategies,
        } => (*node_idx, strategies),
        StrategyGroupKind::Tuple { .. } => {
            panic!("Expected a leaf strategy group for {}, found tuple {:?}", role, id)
        }
    }
}

fn operand_costs<'a>(
    per_operand: &'a [Vec<f64>],
    operand_idx: usize,
    node: NodeIdx,
    strategy_name: &str,
) -> &'a [f64] {
    per_operand.get(operand_idx).unwrap_or_else(|| {
        panic!(
            "Node {} strategy {:?}: operand index {} out of range ({} resharding cost vectors)",
            node,
            strategy_name,
            operand_idx,
            per_operand.len()
        )
    })
}

/// Write `costs` into column `col`. Costs longer than the column are
/// right-aligned, dropping the leading extras.
fn fill_column(matrix: &mut Matrix, col: usize, costs: &[f64]) {
    let start = costs.len().saturating_sub(matrix.rows());
    for (row, &value) in costs[start..].iter().enumerate() {
        matrix[(row, col)] = value;
    }
}
