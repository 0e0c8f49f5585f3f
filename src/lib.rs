//! Cost graph for automatic sharding.
//!
//! Given candidate sharding strategies for every operation of a computation
//! graph, this crate builds the pairwise resharding-cost graph the strategy
//! solver optimizes over, shrinks it by merging nodes that must follow one
//! another, and maps solved indices back to every original operation.
//!
//! ```
//! use sharding_cost_graph::{Config, CostGraph, ShardingStrategy, StrategyMap};
//!
//! let mut map = StrategyMap::new();
//! let producer = map.add_leaf(0, vec![ShardingStrategy::new("S0"), ShardingStrategy::new("R")]);
//! let consumer = map.add_leaf(1, vec![
//!     ShardingStrategy::new("S0").with_operand(vec![0.0, 4.0], vec![0.0, 0.0]),
//!     ShardingStrategy::new("R").with_operand(vec![1.0, 0.0], vec![0.0, 0.0]),
//! ]);
//! map.set_operands(consumer, vec![producer]);
//!
//! let mut graph = CostGraph::build(&map, &[], &Config::default());
//! graph.simplify(true);
//! assert_eq!(graph.get(0, 1)[(1, 0)], 4.0);
//! ```

pub mod config;
pub mod cost_graph;
pub mod error;
pub mod extract;
pub mod input;
pub mod matrix;
pub mod strategy;

pub use config::Config;
pub use cost_graph::{AssociativePair, CostGraph, EdgeCost, SkippedFollow};
pub use error::LoadError;
pub use extract::{sharding_strategy, sharding_strategy_for_tuple};
pub use input::GraphInput;
pub use matrix::Matrix;
pub use strategy::{
    GroupId, InstructionId, NodeIdx, ShardingStrategy, StrategyGroup, StrategyGroupKind,
    StrategyIdx, StrategyMap,
};
