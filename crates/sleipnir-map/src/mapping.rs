//! Logical-to-physical qubit mapping.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sleipnir_ir::{Node, Qubit};

use crate::error::{MapError, MapResult};

/// An injective, incrementally-built mapping from logical qubits to
/// physical nodes.
///
/// Both directions are indexed. Injectivity is enforced at every insert:
/// no two qubits may share a node. Placement seeds the mapping; routing
/// updates it through [`swap_nodes`](Self::swap_nodes) each time a SWAP is
/// inserted, so after routing it records the output permutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(Qubit, Node)>", into = "Vec<(Qubit, Node)>")]
pub struct QubitMapping {
    forward: FxHashMap<Qubit, Node>,
    reverse: FxHashMap<Node, Qubit>,
}

impl QubitMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity mapping `q[i] → node[i]` for `n` qubits.
    pub fn identity(n: u32) -> Self {
        let mut mapping = Self::new();
        for i in 0..n {
            mapping
                .insert(Qubit::new(i), Node::new(i))
                .expect("identity entries are disjoint");
        }
        mapping
    }

    /// Bind a qubit to a node.
    ///
    /// Fails if the qubit is already bound elsewhere or the node is already
    /// occupied by a different qubit. Re-inserting an existing pair is a
    /// no-op.
    pub fn insert(&mut self, qubit: Qubit, node: Node) -> MapResult<()> {
        match (self.forward.get(&qubit), self.reverse.get(&node)) {
            (Some(n), _) if *n == node => Ok(()),
            (Some(_), _) => Err(MapError::UnplacedQubit { qubit }),
            (_, Some(_)) => Err(MapError::UnplacedQubit { qubit }),
            (None, None) => {
                self.forward.insert(qubit.clone(), node.clone());
                self.reverse.insert(node, qubit);
                Ok(())
            }
        }
    }

    /// The node a qubit is bound to.
    pub fn physical(&self, qubit: &Qubit) -> Option<&Node> {
        self.forward.get(qubit)
    }

    /// The qubit occupying a node.
    pub fn logical(&self, node: &Node) -> Option<&Qubit> {
        self.reverse.get(node)
    }

    /// Exchange the occupants of two nodes.
    ///
    /// Either or both nodes may be unoccupied; occupied entries move to the
    /// other node. This is the mapping update for one inserted SWAP.
    pub fn swap_nodes(&mut self, a: &Node, b: &Node) {
        let qa = self.reverse.remove(a);
        let qb = self.reverse.remove(b);
        if let Some(q) = qa {
            self.forward.insert(q.clone(), b.clone());
            self.reverse.insert(b.clone(), q);
        }
        if let Some(q) = qb {
            self.forward.insert(q.clone(), a.clone());
            self.reverse.insert(a.clone(), q);
        }
    }

    /// Number of bound qubits.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether no qubit is bound.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Whether the qubit is bound.
    pub fn contains_qubit(&self, qubit: &Qubit) -> bool {
        self.forward.contains_key(qubit)
    }

    /// Whether the node is occupied.
    pub fn contains_node(&self, node: &Node) -> bool {
        self.reverse.contains_key(node)
    }

    /// Entries sorted by qubit.
    pub fn iter_sorted(&self) -> Vec<(Qubit, Node)> {
        let mut entries: Vec<(Qubit, Node)> = self
            .forward
            .iter()
            .map(|(q, n)| (q.clone(), n.clone()))
            .collect();
        entries.sort();
        entries
    }
}

impl From<QubitMapping> for Vec<(Qubit, Node)> {
    fn from(mapping: QubitMapping) -> Self {
        mapping.iter_sorted()
    }
}

impl From<Vec<(Qubit, Node)>> for QubitMapping {
    fn from(entries: Vec<(Qubit, Node)>) -> Self {
        let mut mapping = QubitMapping::new();
        for (qubit, node) in entries {
            // Colliding entries keep the first binding.
            let _ = mapping.insert(qubit, node);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut mapping = QubitMapping::new();
        mapping.insert(Qubit::new(0), Node::new(3)).unwrap();
        assert_eq!(mapping.physical(&Qubit::new(0)), Some(&Node::new(3)));
        assert_eq!(mapping.logical(&Node::new(3)), Some(&Qubit::new(0)));
    }

    #[test]
    fn test_injectivity_enforced() {
        let mut mapping = QubitMapping::new();
        mapping.insert(Qubit::new(0), Node::new(3)).unwrap();
        // Same pair again: fine.
        mapping.insert(Qubit::new(0), Node::new(3)).unwrap();
        // Node already occupied.
        assert!(mapping.insert(Qubit::new(1), Node::new(3)).is_err());
        // Qubit already bound elsewhere.
        assert!(mapping.insert(Qubit::new(0), Node::new(4)).is_err());
    }

    #[test]
    fn test_swap_nodes() {
        let mut mapping = QubitMapping::identity(2);
        mapping.swap_nodes(&Node::new(0), &Node::new(1));
        assert_eq!(mapping.physical(&Qubit::new(0)), Some(&Node::new(1)));
        assert_eq!(mapping.physical(&Qubit::new(1)), Some(&Node::new(0)));

        // Swapping with an empty node moves the occupant.
        mapping.swap_nodes(&Node::new(1), &Node::new(5));
        assert_eq!(mapping.physical(&Qubit::new(0)), Some(&Node::new(5)));
        assert!(!mapping.contains_node(&Node::new(1)));
    }

    #[test]
    fn test_serde_sorted_round_trip() {
        let mut mapping = QubitMapping::new();
        mapping.insert(Qubit::new(2), Node::new(0)).unwrap();
        mapping.insert(Qubit::new(0), Node::new(2)).unwrap();
        let json = serde_json::to_string(&mapping).unwrap();
        let back: QubitMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
        // Serialized order is sorted by qubit.
        assert!(json.find("q\",[0]").unwrap() < json.find("q\",[2]").unwrap());
    }
}
