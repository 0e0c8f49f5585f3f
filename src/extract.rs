//! Mapping solved strategy indices back onto operations.

use crate::cost_graph::CostGraph;
use crate::strategy::{
    GroupId, InstructionId, ShardingStrategy, StrategyGroupKind, StrategyIdx, StrategyMap,
};

/// The strategy chosen for a non-tuple operation.
///
/// `solution` holds one solved index per node, in representative space
/// (see [`CostGraph::expand_solution`]).
///
/// # Panics
///
/// Panics if the operation is unknown or is a tuple.
pub fn sharding_strategy<'a>(
    strategy_map: &'a StrategyMap,
    cost_graph: &CostGraph,
    instruction_id: InstructionId,
    solution: &[StrategyIdx],
) -> &'a ShardingStrategy {
    let id = lookup(strategy_map, instruction_id);
    assert!(
        !strategy_map.group(id).is_tuple(),
        "Instruction {} has a tuple strategy group; use sharding_strategy_for_tuple",
        instruction_id
    );
    leaf_strategy(strategy_map, cost_graph, id, solution)
}

/// The strategy chosen for element `index` of a tuple-shaped operation.
///
/// `index` walks nested tuples from the outside in and must end on a leaf.
///
/// # Panics
///
/// Panics if the operation is unknown, is not a tuple, or `index` does not
/// lead to a leaf.
pub fn sharding_strategy_for_tuple<'a>(
    strategy_map: &'a StrategyMap,
    cost_graph: &CostGraph,
    instruction_id: InstructionId,
    index: &[usize],
    solution: &[StrategyIdx],
) -> &'a ShardingStrategy {
    let mut id = lookup(strategy_map, instruction_id);
    assert!(
        strategy_map.group(id).is_tuple(),
        "Instruction {} does not have a tuple strategy group",
        instruction_id
    );
    for &element in index {
        match &strategy_map.group(id).kind {
            StrategyGroupKind::Tuple { children } => {
                assert!(
                    element < children.len(),
                    "Tuple index {} out of range for {} elements of instruction {}",
                    element,
                    children.len(),
                    instruction_id
                );
                id = children[element];
            }
            StrategyGroupKind::Leaf { .. } => panic!(
                "Tuple index {:?} descends past a leaf of instruction {}",
                index, instruction_id
            ),
        }
    }
    leaf_strategy(strategy_map, cost_graph, id, solution)
}

fn lookup(strategy_map: &StrategyMap, instruction_id: InstructionId) -> GroupId {
    strategy_map
        .get(instruction_id)
        .unwrap_or_else(|| panic!("No strategy group for instruction {}", instruction_id))
}

fn leaf_strategy<'a>(
    strategy_map: &'a StrategyMap,
    cost_graph: &CostGraph,
    id: GroupId,
    solution: &[StrategyIdx],
) -> &'a ShardingStrategy {
    match &strategy_map.group(id).kind {
        StrategyGroupKind::Leaf {
            node_idx,
            strategies,
        } => &strategies[cost_graph.remap_index(*node_idx, solution[*node_idx])],
        StrategyGroupKind::Tuple { .. } => {
            panic!("Strategy group {:?} is a tuple, expected a leaf", id)
        }
    }
}
