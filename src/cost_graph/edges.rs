//! Edge cost storage keyed by canonical `(low, high)` node pairs.

use log::trace;

use super::CostGraph;
use crate::matrix::Matrix;
use crate::strategy::NodeIdx;

/// Communication and memory cost of one edge, shaped `[len(a), len(b)]`
/// for the orientation `(a, b)` it was created or fetched in.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeCost {
    pub communication: Matrix,
    pub memory: Matrix,
}

impl EdgeCost {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            communication: Matrix::new(rows, cols),
            memory: Matrix::new(rows, cols),
        }
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            communication: self.communication.transpose(),
            memory: self.memory.transpose(),
        }
    }

    /// Re-express the rows through `indices`: row `i` of the result is row
    /// `indices[i]` of `self`, in both matrices.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            communication: self.communication.select_rows(indices),
            memory: self.memory.select_rows(indices),
        }
    }
}

impl CostGraph {
    #[must_use]
    pub fn has_edge(&self, i: NodeIdx, j: NodeIdx) -> bool {
        self.edge_costs.contains_key(&canonical(i, j))
    }

    /// Both cost matrices of edge `(i, j)`, oriented `[len(i), len(j)]`.
    ///
    /// # Panics
    ///
    /// Panics if there is no edge between `i` and `j`.
    #[must_use]
    pub fn edge_cost(&self, i: NodeIdx, j: NodeIdx) -> EdgeCost {
        let stored = self
            .edge_costs
            .get(&canonical(i, j))
            .unwrap_or_else(|| panic!("No edge between nodes {} and {}", i, j));
        if i <= j {
            stored.clone()
        } else {
            stored.transpose()
        }
    }

    /// Communication cost of edge `(i, j)`, oriented `[len(i), len(j)]`.
    #[must_use]
    pub fn get(&self, i: NodeIdx, j: NodeIdx) -> Matrix {
        self.edge_cost(i, j).communication
    }

    /// Memory cost of edge `(i, j)`, oriented `[len(i), len(j)]`.
    #[must_use]
    pub fn get_memory(&self, i: NodeIdx, j: NodeIdx) -> Matrix {
        self.edge_cost(i, j).memory
    }

    /// Add `cost` (oriented `[len(i), len(j)]`) onto edge `(i, j)`, creating
    /// the edge if it does not exist yet.
    pub fn add_edge_cost(&mut self, i: NodeIdx, j: NodeIdx, cost: EdgeCost) {
        assert_ne!(i, j, "Self-loop on node {} in cost graph", i);
        let (key, cost) = if i > j {
            ((j, i), cost.transpose())
        } else {
            ((i, j), cost)
        };
        let (lo, hi) = key;
        assert_eq!(
            cost.communication.shape(),
            (self.node_lens[lo], self.node_lens[hi]),
            "Edge ({}, {}) cost does not match node strategy counts",
            lo,
            hi
        );

        if let Some(existing) = self.edge_costs.get_mut(&key) {
            assert!(
                self.adjacency[lo].contains(&hi) && self.adjacency[hi].contains(&lo),
                "Edge ({}, {}) has costs but is missing from adjacency",
                lo,
                hi
            );
            existing.communication += &cost.communication;
            existing.memory += &cost.memory;
            trace!("Accumulated cost onto edge ({}, {})", lo, hi);
        } else {
            self.adjacency[lo].insert(hi);
            self.adjacency[hi].insert(lo);
            self.edge_costs.insert(key, cost);
            trace!("Created edge ({}, {})", lo, hi);
        }
    }

    /// Remove edge `(i, j)` from adjacency and from the cost store.
    ///
    /// # Panics
    ///
    /// Panics if the edge does not exist.
    pub fn remove_edge(&mut self, i: NodeIdx, j: NodeIdx) {
        let (lo, hi) = canonical(i, j);
        assert!(
            self.adjacency[lo].contains(&hi) && self.adjacency[hi].contains(&lo),
            "Removing edge ({}, {}) that is not in adjacency",
            lo,
            hi
        );
        let removed = self.edge_costs.remove(&(lo, hi));
        assert!(
            removed.is_some(),
            "Removing edge ({}, {}) that has no costs",
            lo,
            hi
        );
        self.adjacency[lo].remove(&hi);
        self.adjacency[hi].remove(&lo);
    }
}

#[inline]
fn canonical(i: NodeIdx, j: NodeIdx) -> (NodeIdx, NodeIdx) {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}
