//! Candidate sharding strategies, as handed over by strategy enumeration.
//!
//! Groups live in a [`StrategyMap`] arena and reference each other by
//! [`GroupId`]. A group is either a leaf decision point (one cost-graph node
//! with its own strategies) or a tuple of child groups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::input::validate_groups;

/// Dense index of a cost-graph node.
pub type NodeIdx = usize;

/// Index of a strategy within one node's strategy list.
pub type StrategyIdx = usize;

/// Identity of the operation a group was enumerated for. Only used for
/// lookups and diagnostics.
pub type InstructionId = usize;

/// Identifier for a group in a [`StrategyMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub(crate) u32);

impl GroupId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One candidate way to shard an operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingStrategy {
    pub name: String,
    pub compute_cost: f64,
    pub communication_cost: f64,
    pub memory_cost: f64,
    /// Per operand: cost of resharding each operand strategy into this one.
    pub communication_resharding_costs: Vec<Vec<f64>>,
    /// Per operand: memory overhead of the same resharding.
    pub memory_resharding_costs: Vec<Vec<f64>>,
}

impl ShardingStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_communication_cost(mut self, cost: f64) -> Self {
        self.communication_cost = cost;
        self
    }

    /// Append the resharding costs for the next operand.
    #[must_use]
    pub fn with_operand(mut self, communication: Vec<f64>, memory: Vec<f64>) -> Self {
        self.communication_resharding_costs.push(communication);
        self.memory_resharding_costs.push(memory);
        self
    }
}

/// Shape of a group: a decision point, or a tuple of other groups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyGroupKind {
    Leaf {
        node_idx: NodeIdx,
        strategies: Vec<ShardingStrategy>,
    },
    Tuple {
        children: Vec<GroupId>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyGroup {
    pub instruction_id: InstructionId,
    #[serde(flatten)]
    pub kind: StrategyGroupKind,
    /// Operands, in operand order.
    #[serde(default)]
    pub in_nodes: Vec<GroupId>,
    /// The group whose decision this one must follow, if any.
    #[serde(default)]
    pub following: Option<GroupId>,
}

impl StrategyGroup {
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, StrategyGroupKind::Tuple { .. })
    }

    /// Node index of a leaf, `None` for a tuple.
    #[must_use]
    pub fn node_idx(&self) -> Option<NodeIdx> {
        match self.kind {
            StrategyGroupKind::Leaf { node_idx, .. } => Some(node_idx),
            StrategyGroupKind::Tuple { .. } => None,
        }
    }

    /// Strategies of a leaf, `None` for a tuple.
    #[must_use]
    pub fn strategies(&self) -> Option<&[ShardingStrategy]> {
        match &self.kind {
            StrategyGroupKind::Leaf { strategies, .. } => Some(strategies),
            StrategyGroupKind::Tuple { .. } => None,
        }
    }
}

/// Arena of strategy groups.
///
/// Leaves receive node indices `0..n` in insertion order, so
/// [`StrategyMap::leaves`] doubles as the node list of the cost graph.
/// Deserialized maps are validated and indexed before use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStrategyMap")]
pub struct StrategyMap {
    groups: Vec<StrategyGroup>,
    #[serde(skip)]
    leaves: Vec<GroupId>,
    #[serde(skip)]
    by_instruction: HashMap<InstructionId, GroupId>,
}

impl StrategyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf group and assign it the next node index.
    pub fn add_leaf(
        &mut self,
        instruction_id: InstructionId,
        strategies: Vec<ShardingStrategy>,
    ) -> GroupId {
        let node_idx = self.leaves.len();
        let id = self.push(StrategyGroup {
            instruction_id,
            kind: StrategyGroupKind::Leaf {
                node_idx,
                strategies,
            },
            in_nodes: Vec::new(),
            following: None,
        });
        self.leaves.push(id);
        id
    }

    /// Add a tuple group over existing groups.
    ///
    /// Lookups by instruction return the most recently added group, so a
    /// tuple added after its elements shadows them.
    pub fn add_tuple(&mut self, instruction_id: InstructionId, children: Vec<GroupId>) -> GroupId {
        self.push(StrategyGroup {
            instruction_id,
            kind: StrategyGroupKind::Tuple { children },
            in_nodes: Vec::new(),
            following: None,
        })
    }

    fn push(&mut self, group: StrategyGroup) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.by_instruction.insert(group.instruction_id, id);
        self.groups.push(group);
        id
    }

    pub fn set_operands(&mut self, id: GroupId, in_nodes: Vec<GroupId>) {
        self.groups[id.index()].in_nodes = in_nodes;
    }

    pub fn set_following(&mut self, id: GroupId, following: GroupId) {
        self.groups[id.index()].following = Some(following);
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> &StrategyGroup {
        &self.groups[id.index()]
    }

    #[must_use]
    pub fn groups(&self) -> &[StrategyGroup] {
        &self.groups
    }

    /// Leaf groups ordered by node index.
    #[must_use]
    pub fn leaves(&self) -> &[GroupId] {
        &self.leaves
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.leaves.len()
    }

    /// The group enumerated for `instruction_id`.
    #[must_use]
    pub fn get(&self, instruction_id: InstructionId) -> Option<GroupId> {
        self.by_instruction.get(&instruction_id).copied()
    }

    /// Index groups that already passed [`validate_groups`].
    pub(crate) fn from_groups(groups: Vec<StrategyGroup>) -> Self {
        let mut leaves: Vec<(NodeIdx, GroupId)> = Vec::new();
        let mut by_instruction = HashMap::new();
        for (idx, group) in groups.iter().enumerate() {
            let id = GroupId(idx as u32);
            by_instruction.insert(group.instruction_id, id);
            if let Some(node_idx) = group.node_idx() {
                leaves.push((node_idx, id));
            }
        }
        leaves.sort();
        Self {
            groups,
            leaves: leaves.into_iter().map(|(_, id)| id).collect(),
            by_instruction,
        }
    }
}

/// Serialized form of a [`StrategyMap`]: the groups alone.
#[derive(Deserialize)]
pub(crate) struct RawStrategyMap {
    pub(crate) groups: Vec<StrategyGroup>,
}

impl TryFrom<RawStrategyMap> for StrategyMap {
    type Error = LoadError;

    fn try_from(raw: RawStrategyMap) -> Result<Self, Self::Error> {
        validate_groups(&raw.groups, &[])?;
        Ok(Self::from_groups(raw.groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_get_dense_node_indices() {
        let mut map = StrategyMap::new();
        let a = map.add_leaf(10, vec![ShardingStrategy::new("R")]);
        let b = map.add_leaf(11, vec![ShardingStrategy::new("R")]);
        let t = map.add_tuple(12, vec![a, b]);
        let c = map.add_leaf(13, vec![ShardingStrategy::new("R")]);

        assert_eq!(map.node_count(), 3);
        assert_eq!(map.leaves(), &[a, b, c]);
        assert_eq!(map.group(c).node_idx(), Some(2));
        assert_eq!(map.group(t).node_idx(), None);
        assert!(map.group(t).is_tuple());
        assert_eq!(map.get(12), Some(t));
    }

    #[test]
    fn deserialized_map_is_indexed() {
        let map: StrategyMap = serde_json::from_str(
            r#"{ "groups": [
                { "instruction_id": 5, "kind": "leaf", "node_idx": 1, "strategies": [] },
                { "instruction_id": 4, "kind": "leaf", "node_idx": 0, "strategies": [] }
            ] }"#,
        )
        .unwrap();

        assert_eq!(map.node_count(), 2);
        assert_eq!(map.leaves(), &[GroupId(1), GroupId(0)]);
        assert_eq!(map.get(5), Some(GroupId(0)));
    }

    #[test]
    fn deserializing_sparse_node_indices_fails() {
        let err = serde_json::from_str::<StrategyMap>(
            r#"{ "groups": [
                { "instruction_id": 0, "kind": "leaf", "node_idx": 4, "strategies": [] }
            ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("node index 4"), "{err}");
    }
}
