//! In-flight routing state.
//!
//! The frontier owns everything routing mutates: the remaining input
//! commands, the current placement of each logical wire, and the rewritten
//! output command list. The input circuit itself is never touched — the
//! manager commits the buffered output in one step at the end, so a failed
//! routing call leaves the caller's circuit exactly as it was.
//!
//! Output wires are physical nodes: output wire `k` carries the label of
//! one architecture node for the whole circuit, and SWAP insertion only
//! changes which logical qubit is *at* that node. Nodes first touched by a
//! routed SWAP get a fresh output wire on demand.

use rustc_hash::FxHashMap;
use sleipnir_ir::{Circuit, Instruction, Node, Qubit, QubitId, StandardGate, UnitId};

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};
use crate::mapping::QubitMapping;
use crate::slices::slice_layers;

/// A two-qubit interaction in one slice: the pending-command index plus
/// the current nodes of its two wires, in argument order.
pub(crate) type SliceInteraction = (usize, u32, u32);

/// Routing window over a circuit being rewritten onto an architecture.
pub struct RoutingFrontier<'a> {
    arch: &'a Architecture,
    /// Input commands in a deterministic topological order.
    pending: Vec<Instruction>,
    /// Commands already emitted or absorbed (e.g. into a BRIDGE).
    consumed: Vec<bool>,
    /// First index that may still be unconsumed.
    cursor: usize,
    /// Logical label of each input wire.
    wire_qubits: Vec<Qubit>,
    /// Current node (by index) of each input wire.
    position: Vec<u32>,
    /// Occupied node → input wire.
    occupant: FxHashMap<u32, u32>,
    /// Node → output wire, created on demand.
    out_wires: FxHashMap<u32, QubitId>,
    /// Output wire labels, in output wire order.
    out_labels: Vec<UnitId>,
    /// Classical wire labels, copied through.
    clbit_labels: Vec<UnitId>,
    /// Rewritten commands over output wires.
    routed: Vec<Instruction>,
    /// Name for the output circuit.
    name: String,
}

impl<'a> RoutingFrontier<'a> {
    /// Set up routing state for a circuit under a complete mapping.
    pub(crate) fn new(
        arch: &'a Architecture,
        circuit: &Circuit,
        mapping: &QubitMapping,
    ) -> MapResult<Self> {
        let pending = circuit.instructions();
        let consumed = vec![false; pending.len()];

        let mut wire_qubits = Vec::with_capacity(circuit.num_qubits());
        let mut position = Vec::with_capacity(circuit.num_qubits());
        let mut occupant = FxHashMap::default();
        let mut out_wires = FxHashMap::default();
        let mut out_labels = Vec::with_capacity(circuit.num_qubits());

        for (wire, label) in circuit.qubits().iter().enumerate() {
            let qubit = Qubit::from_unit(label.clone());
            let node = mapping
                .physical(&qubit)
                .ok_or_else(|| MapError::UnplacedQubit {
                    qubit: qubit.clone(),
                })?;
            let index = arch.index_of(node)?;
            if occupant.insert(index, wire as u32).is_some() {
                return Err(MapError::UnplacedQubit { qubit });
            }
            // Output wire `wire` is pinned to the qubit's starting node, so
            // an already-legal circuit keeps its wire order.
            out_wires.insert(index, QubitId(wire as u32));
            out_labels.push(node.unit().clone());
            wire_qubits.push(qubit);
            position.push(index);
        }

        Ok(Self {
            arch,
            pending,
            consumed,
            cursor: 0,
            wire_qubits,
            position,
            occupant,
            out_wires,
            out_labels,
            clbit_labels: circuit.clbits().to_vec(),
            routed: Vec::new(),
            name: circuit.name().to_string(),
        })
    }

    /// The architecture being routed onto.
    pub fn architecture(&self) -> &'a Architecture {
        self.arch
    }

    /// The next unconsumed command, if any.
    pub fn head(&mut self) -> Option<&Instruction> {
        while self.cursor < self.pending.len() && self.consumed[self.cursor] {
            self.cursor += 1;
        }
        self.pending.get(self.cursor)
    }

    pub(crate) fn head_index(&mut self) -> Option<usize> {
        self.head()?;
        Some(self.cursor)
    }

    /// The node currently holding an input wire's logical qubit.
    pub fn node_of_wire(&self, wire: QubitId) -> Option<&Node> {
        self.position
            .get(wire.0 as usize)
            .map(|&idx| self.arch.node_at(idx))
    }

    pub(crate) fn node_index_of_wire(&self, wire: QubitId) -> u32 {
        self.position[wire.0 as usize]
    }

    /// Whether a command can be emitted under the current placement:
    /// non-gate commands and single-qubit gates always; two-qubit gates on
    /// an architecture edge; BRIDGE gates whose both hops are edges.
    pub fn is_routable(&self, inst: &Instruction) -> bool {
        if !inst.is_gate() {
            return true;
        }
        match inst.qubits.len() {
            0 | 1 => true,
            2 => {
                let a = self.position[inst.qubits[0].0 as usize];
                let b = self.position[inst.qubits[1].0 as usize];
                self.arch.edge_exists_indexed(a, b)
            }
            3 if inst.as_gate().and_then(|g| g.as_standard()) == Some(StandardGate::Bridge) => {
                let c = self.position[inst.qubits[0].0 as usize];
                let m = self.position[inst.qubits[1].0 as usize];
                let t = self.position[inst.qubits[2].0 as usize];
                self.arch.edge_exists_indexed(c, m) && self.arch.edge_exists_indexed(m, t)
            }
            _ => false,
        }
    }

    /// Emit the head command rewritten onto output wires.
    pub(crate) fn emit_head(&mut self) {
        let Some(idx) = self.head_index() else {
            return;
        };
        let inst = self.pending[idx].clone();
        let qubits: Vec<QubitId> = inst
            .qubits
            .iter()
            .map(|w| self.out_wire(self.position[w.0 as usize]))
            .collect();
        self.routed.push(Instruction {
            kind: inst.kind,
            qubits,
            clbits: inst.clbits,
        });
        self.consumed[idx] = true;
    }

    /// Insert a SWAP between two nodes and update the placement.
    pub fn add_swap(&mut self, a: &Node, b: &Node) -> MapResult<()> {
        let ia = self.arch.index_of(a)?;
        let ib = self.arch.index_of(b)?;
        self.add_swap_indexed(ia, ib);
        Ok(())
    }

    pub(crate) fn add_swap_indexed(&mut self, a: u32, b: u32) {
        let out_a = self.out_wire(a);
        let out_b = self.out_wire(b);
        self.routed
            .push(Instruction::two_qubit_gate(StandardGate::Swap, out_a, out_b));

        let wa = self.occupant.remove(&a);
        let wb = self.occupant.remove(&b);
        if let Some(w) = wa {
            self.position[w as usize] = b;
            self.occupant.insert(b, w);
        }
        if let Some(w) = wb {
            self.position[w as usize] = a;
            self.occupant.insert(a, w);
        }
    }

    /// Replace the pending two-qubit gate at `gate_idx` with a BRIDGE
    /// through `middle`, keeping the gate's control/target order.
    pub(crate) fn add_bridge_indexed(&mut self, gate_idx: usize, middle: u32) {
        let inst = self.pending[gate_idx].clone();
        let control = self.position[inst.qubits[0].0 as usize];
        let target = self.position[inst.qubits[1].0 as usize];
        let args = [
            self.out_wire(control),
            self.out_wire(middle),
            self.out_wire(target),
        ];
        self.routed
            .push(Instruction::gate(StandardGate::Bridge, args));
        self.consumed[gate_idx] = true;
    }

    /// Two-qubit interactions of the remaining commands, grouped into
    /// parallel slices (slices without two-qubit gates are skipped), at
    /// most `max_slices` of them.
    pub(crate) fn interaction_slices(&self, max_slices: usize) -> Vec<Vec<SliceInteraction>> {
        let remaining: Vec<(usize, &Instruction)> = (self.cursor..self.pending.len())
            .filter(|&i| !self.consumed[i])
            .map(|i| (i, &self.pending[i]))
            .collect();
        let refs: Vec<&Instruction> = remaining.iter().map(|&(_, inst)| inst).collect();

        let mut slices = Vec::new();
        for layer in slice_layers(&refs) {
            let interactions: Vec<SliceInteraction> = layer
                .iter()
                .map(|&local| remaining[local])
                .filter(|(_, inst)| inst.is_two_qubit_gate())
                .map(|(idx, inst)| {
                    (
                        idx,
                        self.position[inst.qubits[0].0 as usize],
                        self.position[inst.qubits[1].0 as usize],
                    )
                })
                .collect();
            if !interactions.is_empty() {
                slices.push(interactions);
            }
            if slices.len() == max_slices {
                break;
            }
        }
        slices
    }

    pub(crate) fn pending_instruction(&self, idx: usize) -> &Instruction {
        &self.pending[idx]
    }

    /// Output wire for a node, created on first use.
    fn out_wire(&mut self, node: u32) -> QubitId {
        if let Some(&wire) = self.out_wires.get(&node) {
            return wire;
        }
        let wire = QubitId(self.out_labels.len() as u32);
        self.out_labels.push(self.arch.node_at(node).unit().clone());
        self.out_wires.insert(node, wire);
        wire
    }

    /// Whether every pending command has been consumed.
    pub(crate) fn is_done(&mut self) -> bool {
        self.head().is_none()
    }

    /// Build the output circuit and the final logical → physical mapping.
    pub(crate) fn finish(self) -> MapResult<(Circuit, QubitMapping)> {
        let mut circuit = Circuit::new(self.name);
        for label in &self.out_labels {
            circuit.add_qubit(label.clone())?;
        }
        for label in &self.clbit_labels {
            circuit.add_clbit(label.clone());
        }
        for inst in self.routed {
            circuit.append(inst)?;
        }

        let mut mapping = QubitMapping::new();
        for (wire, qubit) in self.wire_qubits.iter().enumerate() {
            let node = self.arch.node_at(self.position[wire]).clone();
            mapping.insert(qubit.clone(), node)?;
        }
        Ok((circuit, mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::QubitId;

    fn frontier_fixture<'a>(arch: &'a Architecture, circuit: &Circuit) -> RoutingFrontier<'a> {
        let mapping = QubitMapping::identity(circuit.num_qubits() as u32);
        RoutingFrontier::new(arch, circuit, &mapping).unwrap()
    }

    #[test]
    fn test_head_and_emit() {
        let arch = Architecture::line(3);
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let mut frontier = frontier_fixture(&arch, &circuit);
        assert_eq!(frontier.head().unwrap().name(), "h");
        frontier.emit_head();
        assert_eq!(frontier.head().unwrap().name(), "cx");
        frontier.emit_head();
        assert!(frontier.is_done());

        let (routed, mapping) = frontier.finish().unwrap();
        assert_eq!(routed.num_ops(), 2);
        assert_eq!(routed.qubits()[0], UnitId::node(0));
        assert_eq!(
            mapping.physical(&Qubit::new(0)),
            Some(&Node::new(0))
        );
    }

    #[test]
    fn test_swap_updates_positions() {
        let arch = Architecture::line(3);
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let mut frontier = frontier_fixture(&arch, &circuit);
        frontier.add_swap(&Node::new(1), &Node::new(2)).unwrap();
        assert_eq!(frontier.node_of_wire(QubitId(1)), Some(&Node::new(2)));

        // Node 2 had no wire before the swap: an ancilla output wire
        // appears for it.
        let (routed, mapping) = frontier.finish().unwrap();
        assert_eq!(routed.num_qubits(), 3);
        assert_eq!(
            mapping.physical(&Qubit::new(1)),
            Some(&Node::new(2))
        );
    }

    #[test]
    fn test_is_routable() {
        let arch = Architecture::line(3);
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let frontier = frontier_fixture(&arch, &circuit);
        let instructions = circuit.instructions();
        assert!(frontier.is_routable(&instructions[0]));
        assert!(!frontier.is_routable(&instructions[1]));
    }

    #[test]
    fn test_interaction_slices() {
        let arch = Architecture::line(4);
        let mut circuit = Circuit::with_size("t", 4, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(2), QubitId(3)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();

        let frontier = frontier_fixture(&arch, &circuit);
        let slices = frontier.interaction_slices(4);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), 2);
        assert_eq!(slices[1].len(), 1);
        assert_eq!(slices[1][0].1, 1);
        assert_eq!(slices[1][0].2, 2);
    }
}
