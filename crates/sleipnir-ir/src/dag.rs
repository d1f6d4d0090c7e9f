//! DAG-based circuit representation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::unit::{ClbitId, QubitId};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge belongs to.
    pub wire: WireId,
}

/// DAG-based circuit representation.
///
/// The circuit is a directed acyclic graph where nodes are wire inputs,
/// wire outputs, or operations, and edges are wire segments. Appending an
/// operation splices it in just before the output nodes of its wires, so
/// iteration in topological order is exactly a commutation-respecting
/// command order.
///
/// A `wire_front` index maps each wire to the last node before its output
/// node, making `apply()` O(1) per wire instead of scanning the output
/// node's incoming edges.
#[derive(Debug)]
pub struct CircuitDag {
    /// The underlying graph.
    graph: DiGraph<DagNode, DagEdge, u32>,
    /// Map from qubit wire to its input node.
    qubit_inputs: FxHashMap<QubitId, NodeIndex>,
    /// Map from qubit wire to its output node.
    qubit_outputs: FxHashMap<QubitId, NodeIndex>,
    /// Map from classical wire to its input node.
    clbit_inputs: FxHashMap<ClbitId, NodeIndex>,
    /// Map from classical wire to its output node.
    clbit_outputs: FxHashMap<ClbitId, NodeIndex>,
    /// Wire front: the node just before each wire's output node.
    wire_front: FxHashMap<WireId, NodeIndex>,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::default(),
            qubit_inputs: FxHashMap::default(),
            qubit_outputs: FxHashMap::default(),
            clbit_inputs: FxHashMap::default(),
            clbit_outputs: FxHashMap::default(),
            wire_front: FxHashMap::default(),
        }
    }

    /// Add a qubit wire.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        if self.qubit_inputs.contains_key(&qubit) {
            return;
        }
        let wire = WireId::Qubit(qubit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.qubit_inputs.insert(qubit, in_node);
        self.qubit_outputs.insert(qubit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    /// Add a classical wire.
    pub fn add_clbit(&mut self, clbit: ClbitId) {
        if self.clbit_inputs.contains_key(&clbit) {
            return;
        }
        let wire = WireId::Clbit(clbit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.clbit_inputs.insert(clbit, in_node);
        self.clbit_outputs.insert(clbit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    /// Append an instruction at the logical end of its wires.
    #[allow(clippy::needless_pass_by_value, clippy::cast_possible_truncation)]
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        // Validate gate arity matches qubit count.
        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits() as usize;
            let got = instruction.qubits.len();
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: expected as u32,
                    got: got as u32,
                });
            }
        }

        for &qubit in &instruction.qubits {
            if !self.qubit_inputs.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if !self.clbit_inputs.contains_key(&clbit) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let op_node = self.graph.add_node(DagNode::Op(instruction.clone()));

        for &qubit in &instruction.qubits {
            let wire = WireId::Qubit(qubit);
            self.splice_before_output(op_node, wire, self.qubit_outputs[&qubit]);
        }
        for &clbit in &instruction.clbits {
            let wire = WireId::Clbit(clbit);
            self.splice_before_output(op_node, wire, self.clbit_outputs[&clbit]);
        }

        Ok(op_node)
    }

    /// Insert `op_node` between the wire front and the wire's output node.
    fn splice_before_output(&mut self, op_node: NodeIndex, wire: WireId, out_node: NodeIndex) {
        let prev_node = self.wire_front[&wire];
        if let Some(edge) = self.graph.find_edge(prev_node, out_node) {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(prev_node, op_node, DagEdge { wire });
        self.graph.add_edge(op_node, out_node, DagEdge { wire });
        self.wire_front.insert(wire, op_node);
    }

    /// Iterate over operations in a deterministic topological order.
    ///
    /// Kahn's algorithm with a min-index ready queue: among simultaneously
    /// ready nodes the one appended earliest comes first, so two structurally
    /// equal circuits iterate identically.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        let mut in_degree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = BinaryHeap::new();
        for node in self.graph.node_indices() {
            let deg = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .count();
            if deg == 0 {
                ready.push(Reverse(node));
            }
            in_degree.insert(node, deg);
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for succ in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let deg = in_degree
                    .get_mut(&succ)
                    .expect("successor tracked in in-degree map");
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        order.into_iter().filter_map(move |idx| {
            self.graph
                .node_weight(idx)
                .and_then(DagNode::instruction)
                .map(|inst| (idx, inst))
        })
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(DagNode::instruction)
    }

    /// Get the number of qubit wires.
    pub fn num_qubits(&self) -> usize {
        self.qubit_inputs.len()
    }

    /// Get the number of classical wires.
    pub fn num_clbits(&self) -> usize {
        self.clbit_inputs.len()
    }

    /// Get the number of operations.
    ///
    /// Total nodes minus the input and output nodes (2 per wire).
    pub fn num_ops(&self) -> usize {
        self.graph.node_count() - 2 * (self.num_qubits() + self.num_clbits())
    }

    /// Calculate the circuit depth (longest wire path through operations).
    pub fn depth(&self) -> usize {
        let mut op_depth: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut max_depth = 0;
        for (idx, _) in self.topological_ops() {
            let depth = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|pred| op_depth.get(&pred).copied().unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 1;
            op_depth.insert(idx, depth);
            max_depth = max_depth.max(depth);
        }
        max_depth
    }

    /// Iterate over qubit wires in index order.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        let mut keys: Vec<_> = self.qubit_inputs.keys().copied().collect();
        keys.sort();
        keys.into_iter()
    }

    /// Iterate over classical wires in index order.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        let mut keys: Vec<_> = self.clbit_inputs.keys().copied().collect();
        keys.sort();
        keys.into_iter()
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that the graph is acyclic, that every wire has its input and
    /// output nodes, and that every wire forms a single path from input to
    /// output.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("graph contains a cycle".into()));
        }

        let wires: Vec<WireId> = self
            .qubit_inputs
            .keys()
            .map(|&q| WireId::Qubit(q))
            .chain(self.clbit_inputs.keys().map(|&c| WireId::Clbit(c)))
            .collect();

        for wire in wires {
            let (start, end) = match wire {
                WireId::Qubit(q) => (self.qubit_inputs[&q], self.qubit_outputs[&q]),
                WireId::Clbit(c) => (self.clbit_inputs[&c], self.clbit_outputs[&c]),
            };
            // Walk the wire from input to output along its edges.
            let mut current = start;
            let mut steps = 0usize;
            while current != end {
                let next = self
                    .graph
                    .edges_directed(current, Direction::Outgoing)
                    .find(|e| e.weight().wire == wire)
                    .map(|e| e.target());
                match next {
                    Some(n) => current = n,
                    None => {
                        return Err(IrError::InvalidDag(format!(
                            "wire {wire:?} does not reach its output node"
                        )));
                    }
                }
                steps += 1;
                if steps > self.graph.node_count() {
                    return Err(IrError::InvalidDag(format!(
                        "wire {wire:?} path exceeds node count"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for CircuitDag {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CircuitDag {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            qubit_inputs: self.qubit_inputs.clone(),
            qubit_outputs: self.qubit_outputs.clone(),
            clbit_inputs: self.clbit_inputs.clone(),
            clbit_outputs: self.clbit_outputs.clone(),
            wire_front: self.wire_front.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;

    #[test]
    fn test_empty_dag() {
        let dag = CircuitDag::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth(), 0);
    }

    #[test]
    fn test_apply_gate() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();

        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth(), 2);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_topological_order_is_append_order_on_one_wire() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::single_qubit_gate(StandardGate::X, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::single_qubit_gate(StandardGate::Z, QubitId(0)))
            .unwrap();

        let names: Vec<_> = dag.topological_ops().map(|(_, i)| i.name()).collect();
        assert_eq!(names, vec!["h", "x", "z"]);
    }

    #[test]
    fn test_parallel_gates_depth() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(1)))
            .unwrap();
        assert_eq!(dag.depth(), 1);
    }

    #[test]
    fn test_gate_arity_mismatch() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        let result = dag.apply(Instruction::gate(StandardGate::CX, [QubitId(0)]));
        assert!(matches!(result, Err(IrError::QubitCountMismatch { .. })));
    }

    #[test]
    fn test_duplicate_qubit_rejected() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        let result = dag.apply(Instruction::gate(
            StandardGate::CX,
            [QubitId(0), QubitId(0)],
        ));
        assert!(matches!(result, Err(IrError::DuplicateQubit { .. })));
    }

    #[test]
    fn test_unknown_wire_rejected() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        let result = dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(7)));
        assert!(matches!(result, Err(IrError::QubitNotFound { .. })));
    }
}
