//! Parallel-slice layering of an instruction sequence.

use rustc_hash::FxHashMap;
use sleipnir_ir::{ClbitId, Instruction, QubitId};

/// Group instruction indices into successive parallel slices.
///
/// Slice `k` holds the instructions whose every wire has finished its work
/// in slices `0..k` (as-soon-as-possible layering). The input must already
/// be in a topological order; indices within a slice keep their relative
/// order. Barriers occupy a slice position on their wires like any other
/// command.
pub(crate) fn slice_layers(instructions: &[&Instruction]) -> Vec<Vec<usize>> {
    let mut qubit_level: FxHashMap<QubitId, usize> = FxHashMap::default();
    let mut clbit_level: FxHashMap<ClbitId, usize> = FxHashMap::default();
    let mut layers: Vec<Vec<usize>> = Vec::new();

    for (i, inst) in instructions.iter().enumerate() {
        let level = inst
            .qubits
            .iter()
            .map(|q| qubit_level.get(q).copied().unwrap_or(0))
            .chain(
                inst.clbits
                    .iter()
                    .map(|c| clbit_level.get(c).copied().unwrap_or(0)),
            )
            .max()
            .unwrap_or(0);
        if layers.len() <= level {
            layers.resize_with(level + 1, Vec::new);
        }
        layers[level].push(i);
        for q in &inst.qubits {
            qubit_level.insert(*q, level + 1);
        }
        for c in &inst.clbits {
            clbit_level.insert(*c, level + 1);
        }
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::StandardGate;

    #[test]
    fn test_disjoint_gates_share_a_slice() {
        let instructions = vec![
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(2), QubitId(3)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(1), QubitId(2)),
        ];
        let refs: Vec<&Instruction> = instructions.iter().collect();
        let layers = slice_layers(&refs);
        assert_eq!(layers, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_single_wire_chain() {
        let instructions = vec![
            Instruction::single_qubit_gate(StandardGate::H, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::X, QubitId(0)),
        ];
        let refs: Vec<&Instruction> = instructions.iter().collect();
        let layers = slice_layers(&refs);
        assert_eq!(layers, vec![vec![0], vec![1]]);
    }
}
