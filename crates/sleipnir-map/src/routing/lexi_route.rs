//! Lexicographic swap selection.
//!
//! Chooses one SWAP (or BRIDGE) to unblock the frontier. Candidate swaps
//! are the architecture edges touching any node in the frontier's first
//! interaction slice. Candidates that do not strictly decrease their
//! interaction's ordered distance pair are dropped; survivors are then
//! ranked by comparing, slice by slice up to the lookahead depth, the
//! descending-sorted vector of interaction distances each would produce.
//! Ties after the lookahead go to the greatest candidate pair, which makes
//! the choice deterministic in the node ordering.
//!
//! When the chosen swap touches exactly one interaction that is a CX at
//! distance two, and the lookahead (with that CX treated as complete)
//! strictly favours leaving the qubits in place, the CX is rewritten as a
//! BRIDGE across the intermediate node instead of moving anything.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use sleipnir_ir::StandardGate;
use tracing::trace;

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};
use crate::routing::frontier::{RoutingFrontier, SliceInteraction};

/// Insert the lexicographically best SWAP or BRIDGE for the current
/// frontier.
pub(crate) fn solve(frontier: &mut RoutingFrontier<'_>, depth: usize) -> MapResult<()> {
    let arch = frontier.architecture();
    let slices = frontier.interaction_slices(depth.max(1));
    let Some(first_slice) = slices.first() else {
        return Err(MapError::Infeasible);
    };

    // Partner and frontier-gate lookup for the first slice.
    let mut partner: FxHashMap<u32, u32> = FxHashMap::default();
    let mut gate_at: FxHashMap<u32, usize> = FxHashMap::default();
    for &(gate, a, b) in first_slice {
        partner.insert(a, b);
        partner.insert(b, a);
        gate_at.insert(a, gate);
        gate_at.insert(b, gate);
    }

    let mut candidates: BTreeSet<(u32, u32)> = BTreeSet::new();
    for &node in partner.keys() {
        for &(neighbour, _) in arch.neighbors_indexed(node) {
            candidates.insert((node.min(neighbour), node.max(neighbour)));
        }
    }
    if candidates.is_empty() {
        return Err(MapError::Infeasible);
    }

    retain_distance_decreasing(arch, &partner, &mut candidates);

    // Slice-by-slice elimination: keep the candidates whose distance
    // vector is minimal, advancing the comparison window while several
    // remain.
    let mut round = 0;
    while candidates.len() > 1 && round < slices.len() {
        let vectors: Vec<((u32, u32), Vec<u64>)> = candidates
            .iter()
            .map(|&swap| (swap, distance_vector(arch, &slices[round], Some(swap))))
            .collect();
        let best = vectors
            .iter()
            .map(|(_, v)| v)
            .min()
            .cloned()
            .expect("at least one candidate");
        candidates = vectors
            .into_iter()
            .filter(|(_, v)| *v == best)
            .map(|(swap, _)| swap)
            .collect();
        round += 1;
    }

    let chosen = *candidates
        .iter()
        .next_back()
        .expect("candidate set never drained");
    trace!(a = chosen.0, b = chosen.1, "swap chosen");

    if let Some((gate_idx, node, other)) = bridge_candidate(frontier, &partner, &gate_at, chosen)
    {
        if prefer_bridge(arch, &slices, chosen, gate_idx) {
            let path = arch
                .shortest_path_indexed(node, other)
                .ok_or(MapError::Infeasible)?;
            trace!(gate = gate_idx, middle = path[1], "bridging instead");
            frontier.add_bridge_indexed(gate_idx, path[1]);
            return Ok(());
        }
    }

    frontier.add_swap_indexed(chosen.0, chosen.1);
    Ok(())
}

/// Drop candidates that do not strictly decrease the ordered distance pair
/// of the interactions they touch. A swap between two interacting partners
/// is useless and always dropped. If the filter would drain the set, the
/// unfiltered set is kept.
fn retain_distance_decreasing(
    arch: &Architecture,
    partner: &FxHashMap<u32, u32>,
    candidates: &mut BTreeSet<(u32, u32)>,
) {
    let kept: BTreeSet<(u32, u32)> = candidates
        .iter()
        .copied()
        .filter(|&(a, b)| {
            let pa = partner.get(&a).copied().unwrap_or(a);
            if pa == b {
                return false;
            }
            let pb = partner.get(&b).copied().unwrap_or(b);
            if pb == a {
                return false;
            }
            let current = ordered_pair(arch.dist_indexed(a, pa), arch.dist_indexed(b, pb));
            let swapped = ordered_pair(arch.dist_indexed(b, pa), arch.dist_indexed(a, pb));
            swapped < current
        })
        .collect();
    if !kept.is_empty() {
        *candidates = kept;
    }
}

fn ordered_pair(a: u64, b: u64) -> (u64, u64) {
    if a > b { (a, b) } else { (b, a) }
}

/// Interaction distances of one slice under a hypothetical swap, sorted
/// descending for lexicographic comparison.
fn distance_vector(
    arch: &Architecture,
    slice: &[SliceInteraction],
    swap: Option<(u32, u32)>,
) -> Vec<u64> {
    let remap = |n: u32| match swap {
        Some((a, b)) if n == a => b,
        Some((a, b)) if n == b => a,
        _ => n,
    };
    let mut distances: Vec<u64> = slice
        .iter()
        .map(|&(_, a, b)| arch.dist_indexed(remap(a), remap(b)))
        .collect();
    distances.sort_unstable_by(|x, y| y.cmp(x));
    distances
}

/// Whether exactly one endpoint of the chosen swap sits in a CX
/// interaction at distance two; returns that interaction's frontier gate.
fn bridge_candidate(
    frontier: &RoutingFrontier<'_>,
    partner: &FxHashMap<u32, u32>,
    gate_at: &FxHashMap<u32, usize>,
    chosen: (u32, u32),
) -> Option<(usize, u32, u32)> {
    let arch = frontier.architecture();
    let mut found: Vec<(usize, u32, u32)> = Vec::new();
    for node in [chosen.0, chosen.1] {
        let Some(&other) = partner.get(&node) else {
            continue;
        };
        if other == chosen.0 || other == chosen.1 {
            continue;
        }
        if arch.dist_indexed(node, other) != 2 {
            continue;
        }
        let gate_idx = gate_at[&node];
        let is_plain_cx = frontier
            .pending_instruction(gate_idx)
            .as_gate()
            .and_then(|g| g.as_standard())
            == Some(StandardGate::CX);
        if is_plain_cx {
            found.push((gate_idx, node, other));
        }
    }
    // Both ends bridgeable is treated like neither: the swap helps both
    // interactions at once.
    match found.as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

/// Compare swapping against not swapping over the lookahead window, with
/// the bridged interaction treated as already complete. True only when the
/// first slice that separates the two strictly favours not swapping; a
/// window of ties keeps the SWAP.
fn prefer_bridge(
    arch: &Architecture,
    slices: &[Vec<SliceInteraction>],
    chosen: (u32, u32),
    bridged_gate: usize,
) -> bool {
    for slice in slices {
        let rest: Vec<SliceInteraction> = slice
            .iter()
            .copied()
            .filter(|&(gate, _, _)| gate != bridged_gate)
            .collect();
        if rest.is_empty() {
            continue;
        }
        let with_swap = distance_vector(arch, &rest, Some(chosen));
        let without = distance_vector(arch, &rest, None);
        if with_swap < without {
            return false;
        }
        if without < with_swap {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::Architecture;
    use crate::mapping::QubitMapping;
    use sleipnir_ir::{Circuit, QubitId};

    fn solve_once(arch: &Architecture, circuit: &Circuit, depth: usize) -> Vec<String> {
        let mapping = QubitMapping::identity(circuit.num_qubits() as u32);
        let mut frontier = RoutingFrontier::new(arch, circuit, &mapping).unwrap();
        solve(&mut frontier, depth).unwrap();
        let (routed, _) = frontier.finish().unwrap();
        routed
            .instructions()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    #[test]
    fn test_single_blocked_cx_inserts_one_swap_or_bridge() {
        let arch = Architecture::line(3);
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let ops = solve_once(&arch, &circuit, 10);
        assert_eq!(ops.len(), 1);
        assert!(ops[0] == "swap" || ops[0] == "bridge");
    }

    #[test]
    fn test_lone_distance_two_cx_swaps_on_tie() {
        // With nothing downstream the lookahead never strictly favours
        // holding still, so the SWAP wins the tie.
        let arch = Architecture::line(3);
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let ops = solve_once(&arch, &circuit, 10);
        assert_eq!(ops, vec!["swap".to_string()]);
    }

    #[test]
    fn test_bridge_when_every_swap_hurts_the_next_slice() {
        // On a 2x3 grid, both useful swaps for the blocked CX(0,2) drag a
        // qubit out of the already-adjacent next-slice pair (1,4), so the
        // lookahead strictly favours bridging the CX in place.
        let arch = Architecture::grid(2, 3);
        let mut circuit = Circuit::with_size("t", 5, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.barrier([QubitId(1), QubitId(4)]).unwrap();
        circuit.cx(QubitId(1), QubitId(4)).unwrap();

        let mapping = QubitMapping::identity(5);
        let mut frontier = RoutingFrontier::new(&arch, &circuit, &mapping).unwrap();
        solve(&mut frontier, 10).unwrap();
        let (routed, _) = frontier.finish().unwrap();
        let names: Vec<_> = routed
            .instructions()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert!(names.contains(&"bridge".to_string()));
        assert!(!names.contains(&"swap".to_string()));
    }

    #[test]
    fn test_distance_vector_ordering() {
        let arch = Architecture::line(5);
        let slice = vec![(0usize, 0u32, 3u32), (1usize, 1u32, 2u32)];
        assert_eq!(distance_vector(&arch, &slice, None), vec![3, 1]);
        // Swapping nodes 0 and 1 shortens the long pair and lengthens the
        // short one.
        assert_eq!(
            distance_vector(&arch, &slice, Some((0, 1))),
            vec![2, 2]
        );
    }
}
