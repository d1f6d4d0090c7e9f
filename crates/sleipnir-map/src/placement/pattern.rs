//! Qubit-interaction (pattern) graph construction.

use rustc_hash::FxHashMap;
use sleipnir_ir::Circuit;

use crate::error::{MapError, MapResult};
use crate::slices::slice_layers;

/// A weighted interaction graph over a circuit's qubit wires.
///
/// Vertices are wire indices; an edge's weight accumulates
/// `max_depth - slice` for every two-qubit gate joining the pair in one of
/// the first `max_depth` slices, so early interactions dominate the
/// placement cost.
#[derive(Debug, Clone)]
pub(crate) struct PatternGraph {
    /// Number of vertices (circuit qubit wires).
    pub n: u32,
    /// Edges `(a, b, weight)` with `a < b`, sorted by descending weight
    /// then ascending pair.
    pub edges: Vec<(u32, u32, u64)>,
}

/// Build the interaction graph from the first slices of a circuit.
///
/// Fails with [`MapError::PatternTooWide`] on a non-barrier command wider
/// than two qubits; those must be decomposed before placement.
pub(crate) fn interaction_graph(
    circuit: &Circuit,
    max_depth: usize,
    max_gates: usize,
) -> MapResult<PatternGraph> {
    let instructions = circuit.instructions();
    let refs: Vec<&_> = instructions.iter().collect();
    let layers = slice_layers(&refs);

    let mut weights: FxHashMap<(u32, u32), u64> = FxHashMap::default();
    let mut gate_count = 0usize;
    'outer: for (depth, layer) in layers.iter().take(max_depth).enumerate() {
        for &idx in layer {
            let inst = &instructions[idx];
            if inst.is_barrier() || inst.qubits.len() < 2 {
                continue;
            }
            if inst.qubits.len() > 2 {
                return Err(MapError::PatternTooWide {
                    name: inst.name().to_string(),
                });
            }
            let (a, b) = (inst.qubits[0].0, inst.qubits[1].0);
            let key = (a.min(b), a.max(b));
            *weights.entry(key).or_insert(0) += (max_depth - depth) as u64;
            gate_count += 1;
            if gate_count >= max_gates {
                break 'outer;
            }
        }
    }

    let mut edges: Vec<(u32, u32, u64)> = weights
        .into_iter()
        .map(|((a, b), w)| (a, b, w))
        .collect();
    edges.sort_by(|x, y| y.2.cmp(&x.2).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));

    Ok(PatternGraph {
        n: u32::try_from(circuit.num_qubits()).expect("wire count fits in u32"),
        edges,
    })
}

impl PatternGraph {
    /// Thin the pattern to a maximum vertex degree.
    ///
    /// Edges are taken in stored (descending-weight) order; an edge is kept
    /// only while both endpoints are below the cap, so low-weight
    /// interactions are shed first.
    pub(crate) fn with_degree_cap(&self, cap: u32) -> Vec<(u32, u32, u64)> {
        if cap == 0 {
            return Vec::new();
        }
        let mut degree = vec![0u32; self.n as usize];
        let mut kept = Vec::new();
        for &(a, b, w) in &self.edges {
            if degree[a as usize] < cap && degree[b as usize] < cap {
                degree[a as usize] += 1;
                degree[b as usize] += 1;
                kept.push((a, b, w));
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::QubitId;

    #[test]
    fn test_early_gates_weigh_more() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();

        let pattern = interaction_graph(&circuit, 5, 100).unwrap();
        assert_eq!(pattern.edges.len(), 2);
        // Slice 0 edge (0,1) outweighs slice 1 edge (1,2).
        assert_eq!(pattern.edges[0], (0, 1, 5));
        assert_eq!(pattern.edges[1], (1, 2, 4));
    }

    #[test]
    fn test_repeated_interaction_accumulates() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(0)).unwrap();

        let pattern = interaction_graph(&circuit, 4, 100).unwrap();
        assert_eq!(pattern.edges, vec![(0, 1, 4 + 3)]);
    }

    #[test]
    fn test_barrier_ignored() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.barrier([QubitId(0), QubitId(1), QubitId(2)]).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let pattern = interaction_graph(&circuit, 3, 100).unwrap();
        assert_eq!(pattern.edges.len(), 1);
    }

    #[test]
    fn test_wide_gate_rejected() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit
            .bridge(QubitId(0), QubitId(1), QubitId(2))
            .unwrap();
        let err = interaction_graph(&circuit, 3, 100);
        assert!(matches!(err, Err(MapError::PatternTooWide { .. })));
    }

    #[test]
    fn test_degree_cap_sheds_light_edges() {
        let mut circuit = Circuit::with_size("t", 4, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.cx(QubitId(0), QubitId(3)).unwrap();

        let pattern = interaction_graph(&circuit, 5, 100).unwrap();
        let thinned = pattern.with_degree_cap(2);
        assert_eq!(thinned.len(), 2);
        // The heaviest two incident edges of vertex 0 survive.
        assert_eq!(thinned[0].2, 5);
        assert_eq!(thinned[1].2, 4);
    }
}
