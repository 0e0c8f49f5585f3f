//! Strategy descriptions read from JSON.
//!
//! Building a graph from a [`StrategyMap`] assumes every reference is sound
//! and panics otherwise. Descriptions coming from a file are checked here
//! first so that a bad file is an ordinary error.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cost_graph::AssociativePair;
use crate::error::LoadError;
use crate::strategy::{
    GroupId, NodeIdx, RawStrategyMap, StrategyGroup, StrategyGroupKind, StrategyMap,
};

/// Everything needed to build a cost graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "RawGraphInput")]
pub struct GraphInput {
    pub strategies: StrategyMap,
    #[serde(default)]
    pub associative_pairs: Vec<AssociativePair>,
}

#[derive(Deserialize)]
struct RawGraphInput {
    strategies: RawStrategyMap,
    #[serde(default)]
    associative_pairs: Vec<AssociativePair>,
}

impl TryFrom<RawGraphInput> for GraphInput {
    type Error = LoadError;

    fn try_from(raw: RawGraphInput) -> Result<Self, Self::Error> {
        validate_groups(&raw.strategies.groups, &raw.associative_pairs)?;
        Ok(GraphInput {
            strategies: StrategyMap::from_groups(raw.strategies.groups),
            associative_pairs: raw.associative_pairs,
        })
    }
}

impl GraphInput {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let raw: RawGraphInput = serde_json::from_str(text)?;
        raw.try_into()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LoadError> {
        let raw: RawGraphInput = serde_json::from_value(value)?;
        raw.try_into()
    }
}

/// Check that `groups` and `pairs` can be built into a cost graph and
/// simplified without tripping any of the builder's assertions.
///
/// The reassociation cost tolerance is not checked here; it depends on the
/// [`Config`](crate::Config) the graph is built with.
pub(crate) fn validate_groups(
    groups: &[StrategyGroup],
    pairs: &[AssociativePair],
) -> Result<(), LoadError> {
    check_references(groups, pairs)?;
    check_node_indices(groups)?;
    check_leaf_roles(groups, pairs)?;
    for (idx, group) in groups.iter().enumerate() {
        check_operands(groups, GroupId(idx as u32), group)?;
    }
    for &(src, dst) in pairs {
        if src == dst {
            return Err(LoadError::SelfReference {
                group: src,
                role: "its reassociation partner",
            });
        }
    }
    check_follows(groups, pairs)
}

fn check_references(
    groups: &[StrategyGroup],
    pairs: &[AssociativePair],
) -> Result<(), LoadError> {
    let check = |from: GroupId, to: GroupId| {
        if to.index() < groups.len() {
            Ok(())
        } else {
            Err(LoadError::DanglingGroup { from, missing: to })
        }
    };

    for (idx, group) in groups.iter().enumerate() {
        let from = GroupId(idx as u32);
        for &operand in &group.in_nodes {
            check(from, operand)?;
        }
        if let Some(following) = group.following {
            check(from, following)?;
        }
        if let StrategyGroupKind::Tuple { children } = &group.kind {
            for &child in children {
                check(from, child)?;
            }
        }
    }
    for &(src, dst) in pairs {
        check(src, dst)?;
        check(dst, src)?;
    }
    Ok(())
}

/// Leaf node indices must be exactly `0..n`.
fn check_node_indices(groups: &[StrategyGroup]) -> Result<(), LoadError> {
    let mut leaves: Vec<(NodeIdx, GroupId)> = groups
        .iter()
        .enumerate()
        .filter_map(|(idx, group)| group.node_idx().map(|node| (node, GroupId(idx as u32))))
        .collect();
    leaves.sort();
    for (expected, &(node_idx, group)) in leaves.iter().enumerate() {
        if node_idx != expected {
            return Err(LoadError::NodeIndexGap { group, node_idx });
        }
    }
    Ok(())
}

/// Roles the graph builder requires to be leaves.
fn check_leaf_roles(
    groups: &[StrategyGroup],
    pairs: &[AssociativePair],
) -> Result<(), LoadError> {
    for group in groups {
        if let Some(following) = group.following {
            expect_leaf(groups, following, "a followed group")?;
        }
        for &operand in &group.in_nodes {
            if let StrategyGroupKind::Tuple { children } = &groups[operand.index()].kind {
                for &child in children {
                    expect_leaf(groups, child, "a tuple operand element")?;
                }
            }
        }
    }
    for &(src, dst) in pairs {
        expect_leaf(groups, src, "a reassociation pair member")?;
        expect_leaf(groups, dst, "a reassociation pair member")?;
    }
    Ok(())
}

fn expect_leaf(
    groups: &[StrategyGroup],
    group: GroupId,
    role: &'static str,
) -> Result<(), LoadError> {
    if groups[group.index()].is_tuple() {
        Err(LoadError::ExpectedLeaf { group, role })
    } else {
        Ok(())
    }
}

/// Operand shape of one leaf: no edge back onto itself, at most one tuple
/// operand next to others, and a resharding cost vector for every operand
/// that needs one.
fn check_operands(
    groups: &[StrategyGroup],
    id: GroupId,
    group: &StrategyGroup,
) -> Result<(), LoadError> {
    let Some(strategies) = group.strategies() else {
        return Ok(());
    };
    if group.following == Some(id) {
        return Err(LoadError::SelfReference {
            group: id,
            role: "the group it follows",
        });
    }

    let operands = group.in_nodes.len();
    let tuple_operands = group
        .in_nodes
        .iter()
        .filter(|&&op| groups[op.index()].is_tuple())
        .count();
    if operands > 1 && tuple_operands > 1 {
        return Err(LoadError::MultipleTupleOperands {
            group: id,
            tuple_operands,
            operands,
        });
    }

    let mut needed = 0;
    for (operand_idx, &operand) in group.in_nodes.iter().enumerate() {
        let sources: &[GroupId] = match &groups[operand.index()].kind {
            StrategyGroupKind::Leaf { .. } => {
                needed = needed.max(operand_idx + 1);
                std::slice::from_ref(&operand)
            }
            StrategyGroupKind::Tuple { children } => {
                if operands == 1 {
                    needed = needed.max(children.len());
                }
                children
            }
        };
        if sources.contains(&id) {
            return Err(LoadError::SelfReference {
                group: id,
                role: "an operand",
            });
        }
    }

    for strategy in strategies {
        let found = strategy
            .communication_resharding_costs
            .len()
            .min(strategy.memory_resharding_costs.len());
        if found < needed {
            return Err(LoadError::MissingReshardingCosts {
                group: id,
                strategy: strategy.name.clone(),
                needed,
                found,
            });
        }
    }
    Ok(())
}

/// Every followed group must share an edge with its follower, and follow
/// chains must end.
fn check_follows(
    groups: &[StrategyGroup],
    pairs: &[AssociativePair],
) -> Result<(), LoadError> {
    let mut connected: HashSet<(GroupId, GroupId)> = HashSet::new();
    let mut connect = |a: GroupId, b: GroupId| {
        connected.insert((a.min(b), a.max(b)));
    };
    for (idx, group) in groups.iter().enumerate() {
        let id = GroupId(idx as u32);
        if group.is_tuple() {
            continue;
        }
        for &operand in &group.in_nodes {
            match &groups[operand.index()].kind {
                StrategyGroupKind::Leaf { .. } => connect(operand, id),
                StrategyGroupKind::Tuple { children } => {
                    for &child in children {
                        connect(child, id);
                    }
                }
            }
        }
    }
    for &(src, dst) in pairs {
        connect(src, dst);
    }

    for (idx, group) in groups.iter().enumerate() {
        let id = GroupId(idx as u32);
        if group.is_tuple() {
            continue;
        }
        if let Some(following) = group.following {
            if !connected.contains(&(id.min(following), id.max(following))) {
                return Err(LoadError::FollowNotOperand {
                    group: id,
                    following,
                });
            }
        }
    }

    // 0: unvisited, 1: on the current chain, 2: chain known to end.
    let mut state = vec![0u8; groups.len()];
    for start in 0..groups.len() {
        let mut chain = Vec::new();
        let mut current = start;
        loop {
            match state[current] {
                1 => {
                    return Err(LoadError::FollowCycle {
                        group: GroupId(current as u32),
                    })
                }
                2 => break,
                _ => {}
            }
            state[current] = 1;
            chain.push(current);
            match groups[current].following {
                Some(next) => current = next.index(),
                None => break,
            }
        }
        for idx in chain {
            state[idx] = 2;
        }
    }
    Ok(())
}
