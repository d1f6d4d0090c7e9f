//! High-level circuit builder API.

use rustc_hash::FxHashMap;

use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{Gate, StandardGate};
use crate::instruction::Instruction;
use crate::unit::{ClbitId, QubitId, UnitId};

/// A quantum circuit: labelled wires plus a DAG of operations.
///
/// Instructions address wires positionally ([`QubitId`]/[`ClbitId`]); the
/// circuit owns label tables mapping each position to a [`UnitId`]. Binding
/// logical qubits to physical nodes is a relabelling of this table — the
/// instructions themselves never change when a wire is renamed.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    qubit_labels: Vec<UnitId>,
    clbit_labels: Vec<UnitId>,
    label_index: FxHashMap<UnitId, QubitId>,
    dag: CircuitDag,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubit_labels: vec![],
            clbit_labels: vec![],
            label_index: FxHashMap::default(),
            dag: CircuitDag::new(),
        }
    }

    /// Create a circuit with default-labelled wires `q[0..n]`, `c[0..m]`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        for i in 0..num_qubits {
            circuit
                .add_qubit(UnitId::qubit(i))
                .expect("default qubit labels are distinct");
        }
        for i in 0..num_clbits {
            circuit.add_clbit(UnitId::clbit(i));
        }
        circuit
    }

    /// Add a qubit wire with the given label.
    pub fn add_qubit(&mut self, label: UnitId) -> IrResult<QubitId> {
        if self.label_index.contains_key(&label) {
            return Err(IrError::DuplicateLabel { label });
        }
        let id = QubitId(u32::try_from(self.qubit_labels.len()).expect("wire count fits in u32"));
        self.label_index.insert(label.clone(), id);
        self.qubit_labels.push(label);
        self.dag.add_qubit(id);
        Ok(id)
    }

    /// Add a classical wire with the given label.
    pub fn add_clbit(&mut self, label: UnitId) -> ClbitId {
        let id = ClbitId(u32::try_from(self.clbit_labels.len()).expect("wire count fits in u32"));
        self.clbit_labels.push(label);
        self.dag.add_clbit(id);
        id
    }

    /// Circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubit wires.
    pub fn num_qubits(&self) -> usize {
        self.qubit_labels.len()
    }

    /// Number of classical wires.
    pub fn num_clbits(&self) -> usize {
        self.clbit_labels.len()
    }

    /// Qubit wire labels, in wire order.
    pub fn qubits(&self) -> &[UnitId] {
        &self.qubit_labels
    }

    /// Classical wire labels, in wire order.
    pub fn clbits(&self) -> &[UnitId] {
        &self.clbit_labels
    }

    /// The label of a qubit wire.
    pub fn qubit_label(&self, id: QubitId) -> Option<&UnitId> {
        self.qubit_labels.get(id.0 as usize)
    }

    /// Find the wire carrying the given label.
    pub fn find_qubit(&self, label: &UnitId) -> Option<QubitId> {
        self.label_index.get(label).copied()
    }

    /// Rename a qubit wire in place.
    ///
    /// Fails if the new label is already bound to a different wire.
    /// Relabelling to the wire's current label is a no-op.
    pub fn relabel_qubit(&mut self, id: QubitId, label: UnitId) -> IrResult<()> {
        let slot = id.0 as usize;
        if slot >= self.qubit_labels.len() {
            return Err(IrError::QubitNotFound {
                qubit: id,
                gate_name: None,
            });
        }
        if let Some(&existing) = self.label_index.get(&label) {
            if existing == id {
                return Ok(());
            }
            return Err(IrError::DuplicateLabel { label });
        }
        let old = std::mem::replace(&mut self.qubit_labels[slot], label.clone());
        self.label_index.remove(&old);
        self.label_index.insert(label, id);
        Ok(())
    }

    /// Append an arbitrary instruction at the logical end.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.dag.apply(instruction)?;
        Ok(self)
    }

    /// Apply a Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::H, qubit))
    }

    /// Apply a Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply a Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Z, qubit))
    }

    /// Apply an Rz rotation.
    pub fn rz(&mut self, angle: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::gate(
            Gate::with_params(StandardGate::Rz, [angle]),
            [qubit],
        ))
    }

    /// Apply a CX gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::CX, control, target))
    }

    /// Apply a CZ gate.
    pub fn cz(&mut self, q0: QubitId, q1: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::CZ, q0, q1))
    }

    /// Apply a SWAP gate.
    pub fn swap(&mut self, q0: QubitId, q1: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::Swap, q0, q1))
    }

    /// Apply a BRIDGE (distance-2 CX) across an intermediate wire.
    pub fn bridge(
        &mut self,
        control: QubitId,
        middle: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.append(Instruction::gate(
            StandardGate::Bridge,
            [control, middle, target],
        ))
    }

    /// Measure a qubit into a classical wire.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.append(Instruction::measure(qubit, clbit))
    }

    /// Apply a barrier over the given wires.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.append(Instruction::barrier(qubits))
    }

    /// Circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Number of operations.
    pub fn num_ops(&self) -> usize {
        self.dag.num_ops()
    }

    /// The underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Collect instructions in a deterministic commutation-respecting order.
    pub fn instructions(&self) -> Vec<Instruction> {
        self.dag.topological_ops().map(|(_, i)| i.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit.measure(QubitId(1), ClbitId(1)).unwrap();

        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_ops(), 4);
        assert_eq!(circuit.depth(), 3);
    }

    #[test]
    fn test_labels() {
        let circuit = Circuit::with_size("t", 3, 0);
        assert_eq!(circuit.qubit_label(QubitId(1)), Some(&UnitId::qubit(1)));
        assert_eq!(circuit.find_qubit(&UnitId::qubit(2)), Some(QubitId(2)));
        assert_eq!(circuit.find_qubit(&UnitId::node(0)), None);
    }

    #[test]
    fn test_relabel() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit
            .relabel_qubit(QubitId(0), UnitId::node(4))
            .unwrap();
        assert_eq!(circuit.qubit_label(QubitId(0)), Some(&UnitId::node(4)));
        assert_eq!(circuit.find_qubit(&UnitId::node(4)), Some(QubitId(0)));
        assert_eq!(circuit.find_qubit(&UnitId::qubit(0)), None);

        // Colliding label is rejected.
        let err = circuit.relabel_qubit(QubitId(1), UnitId::node(4));
        assert!(matches!(err, Err(IrError::DuplicateLabel { .. })));

        // Renaming to the current label is fine.
        circuit
            .relabel_qubit(QubitId(0), UnitId::node(4))
            .unwrap();
    }

    #[test]
    fn test_duplicate_wire_label_rejected() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        let err = circuit.add_qubit(UnitId::qubit(0));
        assert!(matches!(err, Err(IrError::DuplicateLabel { .. })));
    }

    #[test]
    fn test_instructions_order() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.z(QubitId(1)).unwrap();

        let names: Vec<_> = circuit
            .instructions()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["h", "cx", "z"]);
    }
}
