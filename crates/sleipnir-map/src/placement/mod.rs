//! Initial qubit placement via weighted subgraph monomorphism.
//!
//! [`GraphPlacement`] builds a weighted interaction graph from the front of
//! the circuit and embeds it into a weighted view of the architecture. The
//! target weighting prefers close (and, with weighted edges, low-cost)
//! node pairs; when no exact embedding exists the solver is retried on
//! progressively thinner pattern graphs and progressively wider target
//! graphs until one is found. Qubits left out of the embedding are then
//! assigned to the free nodes nearest the placed region.

mod pattern;
mod wsm;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sleipnir_ir::{Circuit, Qubit};
use tracing::{debug, instrument};

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};
use crate::mapping::QubitMapping;
use pattern::{PatternGraph, interaction_graph};
use wsm::{WsmProblem, relabel};

/// Options for [`GraphPlacement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Number of circuit slices contributing to the interaction graph.
    pub max_pattern_depth: usize,
    /// Maximum number of two-qubit gates contributing to it.
    pub max_pattern_gates: usize,
    /// Search-node budget for each monomorphism search. A visit count,
    /// not a time limit, so placement stays reproducible.
    pub node_budget: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_pattern_depth: 5,
            max_pattern_gates: 100,
            node_budget: 10_000,
        }
    }
}

/// Result of a placement call.
///
/// A placement is always total and injective; `complete` records whether
/// the full interaction graph embedded exactly onto architecture edges.
/// When false the mapping is best-effort — the caller decides whether to
/// proceed or retry with a larger budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    /// The logical-to-physical assignment.
    pub mapping: QubitMapping,
    /// Whether every interaction-graph edge sits on an architecture edge.
    pub complete: bool,
}

/// Graph-monomorphism placement over one architecture.
pub struct GraphPlacement<'a> {
    arch: &'a Architecture,
    config: PlacementConfig,
}

impl<'a> GraphPlacement<'a> {
    /// Create a placement engine with default options.
    pub fn new(arch: &'a Architecture) -> Self {
        Self {
            arch,
            config: PlacementConfig::default(),
        }
    }

    /// Create a placement engine with explicit options.
    pub fn with_config(arch: &'a Architecture, config: PlacementConfig) -> Self {
        Self { arch, config }
    }

    /// Choose an injective logical-to-physical assignment for the circuit.
    ///
    /// Fails with [`MapError::CapacityExceeded`] when the circuit has more
    /// qubits than the architecture has nodes. Otherwise always returns a
    /// total, injective mapping: interaction structure the solver could not
    /// embed is covered by the nearest-free-node augmentation.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn place(&self, circuit: &Circuit) -> MapResult<QubitMapping> {
        Ok(self.place_outcome(circuit)?.mapping)
    }

    /// Like [`place`](Self::place), also reporting whether the embedding
    /// was exact.
    pub fn place_outcome(&self, circuit: &Circuit) -> MapResult<PlacementOutcome> {
        let n_qubits = circuit.num_qubits();
        let n_nodes = self.arch.num_nodes();
        if n_qubits > n_nodes {
            return Err(MapError::CapacityExceeded {
                required: n_qubits,
                available: n_nodes,
            });
        }

        let pattern = interaction_graph(
            circuit,
            self.config.max_pattern_depth,
            self.config.max_pattern_gates,
        )?;

        let (assignment, complete) = if pattern.edges.is_empty() {
            (FxHashMap::default(), true)
        } else {
            self.embed(&pattern)
        };
        debug!(
            embedded = assignment.len(),
            total = n_qubits,
            complete,
            "pattern embedding chosen"
        );

        Ok(PlacementOutcome {
            mapping: self.augment(circuit, assignment)?,
            complete,
        })
    }

    /// Thresholded pairwise distances for target-graph relaxation: index
    /// `r` admits node pairs up to the `r`-th distinct distance.
    fn relaxation_thresholds(&self) -> Vec<u64> {
        let n = self.arch.num_nodes() as u32;
        let mut distances: Vec<u64> = (0..n)
            .flat_map(|a| ((a + 1)..n).map(move |b| (a, b)))
            .map(|(a, b)| self.arch.dist_indexed(a, b))
            .filter(|&d| d != u64::MAX && d > 0)
            .collect();
        distances.sort_unstable();
        distances.dedup();
        distances
    }

    /// Target edges `(a, b, cost)` for all pairs within the distance
    /// threshold. The cost is the pairwise distance itself, so minimizing
    /// the weighted product puts heavy interactions on close, cheap pairs.
    fn target_edges(&self, threshold: u64) -> Vec<(u32, u32, u64)> {
        let n = self.arch.num_nodes() as u32;
        let mut edges = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                let d = self.arch.dist_indexed(a, b);
                if d != u64::MAX && d > 0 && d <= threshold {
                    edges.push((a, b, d));
                }
            }
        }
        edges
    }

    /// The relaxation loop: fullest pattern first against the tightest
    /// target, thinning and widening until some embedding is found.
    ///
    /// Returns wire-index → node-index assignments for the embedded
    /// qubits, and whether the full pattern embedded onto true edges
    /// (round zero, nothing thinned).
    fn embed(&self, pattern: &PatternGraph) -> (FxHashMap<u32, u32>, bool) {
        let thresholds = self.relaxation_thresholds();
        let n_target = self.arch.num_nodes() as u32;

        let mut pattern_graphs: Vec<Vec<(u32, u32, u64)>> = Vec::new();
        let mut last_edge_count = usize::MAX;
        let rounds = (pattern.n as usize).max(thresholds.len());
        for round in 0..rounds {
            let threshold = thresholds
                .get(round)
                .or(thresholds.last())
                .copied()
                .unwrap_or(0);
            let target_edges = self.target_edges(threshold);

            let cap = pattern.n.saturating_sub(round as u32 + 1);
            let thinned = pattern.with_degree_cap(cap);
            if thinned.len() != last_edge_count {
                last_edge_count = thinned.len();
                pattern_graphs.push(thinned);
            }

            for (graph_index, edges) in pattern_graphs.iter().enumerate() {
                if edges.is_empty() {
                    return (FxHashMap::default(), false);
                }
                if let Some(assignment) = self.try_embedding(edges, n_target, &target_edges) {
                    let exact =
                        round == 0 && graph_index == 0 && edges.len() == pattern.edges.len();
                    return (assignment, exact);
                }
            }
        }
        (FxHashMap::default(), false)
    }

    fn try_embedding(
        &self,
        pattern_edges: &[(u32, u32, u64)],
        n_target: u32,
        target_edges: &[(u32, u32, u64)],
    ) -> Option<FxHashMap<u32, u32>> {
        // Relabel the non-isolated pattern vertices densely.
        let (originals, to_dense) = relabel(
            pattern_edges
                .iter()
                .flat_map(|&(a, b, _)| [a, b]),
        );
        let dense_edges: Vec<(u32, u32, u64)> = pattern_edges
            .iter()
            .map(|&(a, b, w)| (to_dense[&a], to_dense[&b], w))
            .collect();

        let problem = WsmProblem::new(
            originals.len() as u32,
            &dense_edges,
            n_target,
            target_edges,
        );
        let outcome = problem.solve(self.config.node_budget);
        debug!(
            nodes_visited = outcome.nodes_visited,
            budget_exhausted = outcome.budget_exhausted,
            found = outcome.assignment.is_some(),
            "monomorphism search finished"
        );
        outcome.assignment.map(|assignment| {
            assignment
                .iter()
                .enumerate()
                .map(|(dense, &t)| (originals[dense], t))
                .collect()
        })
    }

    /// Extend a partial wire → node assignment to a total injective
    /// mapping: each leftover qubit goes to the free node nearest the
    /// already-placed region, ties and empty regions resolved by node
    /// order.
    fn augment(
        &self,
        circuit: &Circuit,
        assignment: FxHashMap<u32, u32>,
    ) -> MapResult<QubitMapping> {
        let n = self.arch.num_nodes() as u32;
        let mut used: Vec<bool> = vec![false; n as usize];
        let mut region: Vec<u32> = Vec::new();
        for (&_, &t) in &assignment {
            used[t as usize] = true;
            region.push(t);
        }
        region.sort_unstable();

        let mut mapping = QubitMapping::new();
        for (wire, label) in circuit.qubits().iter().enumerate() {
            let wire = wire as u32;
            let qubit = Qubit::from_unit(label.clone());
            let node_index = match assignment.get(&wire) {
                Some(&t) => t,
                None => {
                    let chosen = (0..n)
                        .filter(|&t| !used[t as usize])
                        .min_by_key(|&t| {
                            let to_region = region
                                .iter()
                                .map(|&r| self.arch.dist_indexed(t, r))
                                .min()
                                .unwrap_or(u64::MAX);
                            (to_region, t)
                        })
                        .ok_or(MapError::CapacityExceeded {
                            required: circuit.num_qubits(),
                            available: self.arch.num_nodes(),
                        })?;
                    used[chosen as usize] = true;
                    region.push(chosen);
                    chosen
                }
            };
            mapping.insert(qubit, self.arch.node_at(node_index).clone())?;
        }
        Ok(mapping)
    }
}

/// Place a circuit onto an architecture with the given options.
pub fn place(
    circuit: &Circuit,
    arch: &Architecture,
    config: &PlacementConfig,
) -> MapResult<QubitMapping> {
    GraphPlacement::with_config(arch, config.clone()).place(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::{Node, QubitId};

    fn assert_injective(mapping: &QubitMapping) {
        let entries = mapping.iter_sorted();
        let mut nodes: Vec<&Node> = entries.iter().map(|(_, n)| n).collect();
        nodes.sort();
        nodes.dedup();
        assert_eq!(nodes.len(), entries.len());
    }

    #[test]
    fn test_single_edge_pattern() {
        let arch = Architecture::from_index_couplings(&[(0, 1)]).unwrap();
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let mapping = GraphPlacement::new(&arch).place(&circuit).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_injective(&mapping);
        let a = mapping.physical(&Qubit::new(0)).unwrap();
        let b = mapping.physical(&Qubit::new(1)).unwrap();
        assert!(arch.valid_operation(&[a.clone(), b.clone()]));
    }

    #[test]
    fn test_capacity_exceeded() {
        let arch = Architecture::line(2);
        let circuit = Circuit::with_size("t", 3, 0);
        let err = GraphPlacement::new(&arch).place(&circuit);
        assert!(matches!(err, Err(MapError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_no_interactions_still_total() {
        let arch = Architecture::line(4);
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.h(QubitId(0)).unwrap();

        let mapping = GraphPlacement::new(&arch).place(&circuit).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_injective(&mapping);
    }

    #[test]
    fn test_line_circuit_on_line_architecture() {
        let arch = Architecture::line(4);
        let mut circuit = Circuit::with_size("t", 4, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        circuit.cx(QubitId(2), QubitId(3)).unwrap();

        let mapping = GraphPlacement::new(&arch).place(&circuit).unwrap();
        assert_injective(&mapping);
        // The chain pattern embeds exactly: every interacting pair lands on
        // an architecture edge.
        for (a, b) in [(0u32, 1u32), (1, 2), (2, 3)] {
            let na = mapping.physical(&Qubit::new(a)).unwrap().clone();
            let nb = mapping.physical(&Qubit::new(b)).unwrap().clone();
            assert!(arch.valid_operation(&[na, nb]));
        }
    }

    #[test]
    fn test_star_circuit_on_line_falls_back() {
        // A 4-star cannot embed in a path; placement must still return a
        // total injective mapping.
        let arch = Architecture::line(5);
        let mut circuit = Circuit::with_size("t", 5, 0);
        for i in 1..5 {
            circuit.cx(QubitId(0), QubitId(i)).unwrap();
        }

        let mapping = GraphPlacement::new(&arch).place(&circuit).unwrap();
        assert_eq!(mapping.len(), 5);
        assert_injective(&mapping);
    }

    #[test]
    fn test_deterministic() {
        let arch = Architecture::grid(2, 3);
        let mut circuit = Circuit::with_size("t", 4, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        circuit.cx(QubitId(2), QubitId(3)).unwrap();
        circuit.cx(QubitId(3), QubitId(0)).unwrap();

        let a = GraphPlacement::new(&arch).place(&circuit).unwrap();
        let b = GraphPlacement::new(&arch).place(&circuit).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_outcome_reports_completeness() {
        let arch = Architecture::line(4);

        let mut chain = Circuit::with_size("chain", 3, 0);
        chain.cx(QubitId(0), QubitId(1)).unwrap();
        chain.cx(QubitId(1), QubitId(2)).unwrap();
        let outcome = GraphPlacement::new(&arch).place_outcome(&chain).unwrap();
        assert!(outcome.complete);

        // A 4-star cannot embed in a path exactly.
        let mut star = Circuit::with_size("star", 5, 0);
        for i in 1..5 {
            star.cx(QubitId(0), QubitId(i)).unwrap();
        }
        let arch5 = Architecture::line(5);
        let outcome = GraphPlacement::new(&arch5).place_outcome(&star).unwrap();
        assert!(!outcome.complete);
        assert_eq!(outcome.mapping.len(), 5);
    }

    #[test]
    fn test_config_round_trip() {
        let config = PlacementConfig {
            max_pattern_depth: 3,
            max_pattern_gates: 20,
            node_budget: 500,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PlacementConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
