use std::path::PathBuf;

use thiserror::Error;

use crate::strategy::{GroupId, NodeIdx};

/// Problems with a strategy description or config file.
///
/// These are caught before a graph is built. Inconsistencies found while
/// building or simplifying a graph are defects and panic instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid strategy description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Group {from:?} references missing group {missing:?}")]
    DanglingGroup { from: GroupId, missing: GroupId },
    #[error("Group {group:?} has node index {node_idx}, node indices must be dense from 0")]
    NodeIndexGap { group: GroupId, node_idx: NodeIdx },
    #[error("Group {group:?} is a tuple but {role} must be a leaf")]
    ExpectedLeaf { group: GroupId, role: &'static str },
    #[error("Group {group:?} names itself as {role}")]
    SelfReference { group: GroupId, role: &'static str },
    #[error("Group {group:?} follows group {following:?} but shares no edge with it")]
    FollowNotOperand { group: GroupId, following: GroupId },
    #[error("Follow chain through group {group:?} never ends")]
    FollowCycle { group: GroupId },
    #[error(
        "Group {group:?} strategy {strategy:?} has {found} resharding cost vectors, needs {needed}"
    )]
    MissingReshardingCosts {
        group: GroupId,
        strategy: String,
        needed: usize,
        found: usize,
    },
    #[error(
        "Group {group:?} has {tuple_operands} tuple operands among {operands}; \
         at most one is supported"
    )]
    MultipleTupleOperands {
        group: GroupId,
        tuple_operands: usize,
        operands: usize,
    },
}
