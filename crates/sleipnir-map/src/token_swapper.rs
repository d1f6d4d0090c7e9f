//! Token-swapping solver.
//!
//! Given a target permutation over a subset of architecture nodes ("tokens"
//! sitting at start nodes that must reach target nodes), computes a sequence
//! of edge-adjacent swaps realizing it. Nodes outside the permutation's
//! domain are free and may be used as scratch space.
//!
//! The solver alternates two phases:
//!
//! 1. **Greedy**: among all edges that move some misplaced token strictly
//!    closer to its target, apply the one with the largest total decrease of
//!    the home distance L (the sum over tokens of distance-to-target).
//!    Adjacent two-cycles — tokens that are each other's target — are taken
//!    first, since a single swap homes both.
//! 2. **Cyclic shift**: when no single swap decreases L (a local optimum),
//!    decompose the residual mapping into abstract disjoint cycles, enact
//!    the cheapest cycle along shortest paths, and break off as soon as L
//!    has strictly decreased, then resume the greedy phase.
//!
//! Every round strictly decreases L, so the sequence length is bounded by
//! the initial L, itself at most diameter × misplaced-token count. The
//! returned sequence realizes the permutation exactly; length is short but
//! not guaranteed minimal.

use rustc_hash::FxHashMap;
use sleipnir_ir::Node;
use tracing::trace;

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};

/// Token-swapping solver over one architecture.
pub struct TokenSwapper<'a> {
    arch: &'a Architecture,
}

impl<'a> TokenSwapper<'a> {
    /// Create a solver for the given architecture.
    pub fn new(arch: &'a Architecture) -> Self {
        Self { arch }
    }

    /// Compute a swap sequence realizing the permutation.
    ///
    /// `permutation` maps each token's start node to its required target
    /// node; it must be injective. An empty or identity permutation yields
    /// an empty sequence. Targets must be reachable from their start nodes,
    /// otherwise [`MapError::Infeasible`] is returned.
    pub fn swaps(&self, permutation: &FxHashMap<Node, Node>) -> MapResult<Vec<(Node, Node)>> {
        let mut tokens: FxHashMap<u32, u32> = FxHashMap::default();
        let mut targets_seen: FxHashMap<u32, u32> = FxHashMap::default();
        for (start, target) in permutation {
            let s = self.arch.index_of(start)?;
            let t = self.arch.index_of(target)?;
            if self.arch.dist_indexed(s, t) == u64::MAX {
                return Err(MapError::Infeasible);
            }
            if targets_seen.insert(t, s).is_some() {
                // Two tokens demanding the same target node.
                return Err(MapError::Infeasible);
            }
            tokens.insert(s, t);
        }

        let initial = tokens.clone();
        let mut swaps = self.solve(&mut tokens)?;
        simplify(&mut swaps, &initial);
        debug_assert!(realizes(&initial, &swaps));

        Ok(swaps
            .into_iter()
            .map(|(a, b)| (self.arch.node_at(a).clone(), self.arch.node_at(b).clone()))
            .collect())
    }

    fn solve(&self, tokens: &mut FxHashMap<u32, u32>) -> MapResult<Vec<(u32, u32)>> {
        let mut swaps = Vec::new();
        // Each outer round strictly decreases L, which starts at no more
        // than diameter * token count; the cap only guards against a bug
        // breaking that invariant.
        let round_cap = (self.arch.diameter() as usize + 1) * (tokens.len() + 1);
        for _ in 0..round_cap {
            let misplaced = self.misplaced(tokens);
            if misplaced.is_empty() {
                return Ok(swaps);
            }
            if let Some(swap) = self.adjacent_two_cycle(tokens, &misplaced) {
                self.apply_swap(tokens, &mut swaps, swap);
                continue;
            }
            if let Some(swap) = self.best_greedy_swap(tokens, &misplaced) {
                self.apply_swap(tokens, &mut swaps, swap);
                continue;
            }
            trace!(misplaced = misplaced.len(), "greedy stuck, enacting cycle");
            self.cyclic_shift_progress(tokens, &mut swaps)?;
        }
        if self.misplaced(tokens).is_empty() {
            Ok(swaps)
        } else {
            Err(MapError::Infeasible)
        }
    }

    /// Misplaced tokens as sorted `(position, target)` pairs.
    fn misplaced(&self, tokens: &FxHashMap<u32, u32>) -> Vec<(u32, u32)> {
        let mut out: Vec<(u32, u32)> = tokens
            .iter()
            .filter(|(v, t)| v != t)
            .map(|(&v, &t)| (v, t))
            .collect();
        out.sort_unstable();
        out
    }

    /// An adjacent pair of tokens that are each other's target, if any.
    fn adjacent_two_cycle(
        &self,
        tokens: &FxHashMap<u32, u32>,
        misplaced: &[(u32, u32)],
    ) -> Option<(u32, u32)> {
        for &(v, t) in misplaced {
            if v < t
                && tokens.get(&t) == Some(&v)
                && self.arch.edge_exists_indexed(v, t)
            {
                return Some((v, t));
            }
        }
        None
    }

    /// The swap with the largest strict decrease of L, if one exists.
    ///
    /// Candidates are edges moving some misplaced token strictly closer to
    /// its target; the score also counts the displaced token at the other
    /// endpoint. Ties go to the smallest (node, node) pair.
    fn best_greedy_swap(
        &self,
        tokens: &FxHashMap<u32, u32>,
        misplaced: &[(u32, u32)],
    ) -> Option<(u32, u32)> {
        let mut best: Option<(i64, (u32, u32))> = None;
        for &(v, t) in misplaced {
            for &(u, _) in self.arch.neighbors_indexed(v) {
                if self.arch.dist_indexed(u, t) >= self.arch.dist_indexed(v, t) {
                    continue;
                }
                let decrease = self.swap_decrease(tokens, v, u);
                if decrease <= 0 {
                    continue;
                }
                let key = (v.min(u), v.max(u));
                match best {
                    Some((score, pair)) if (decrease, std::cmp::Reverse(key)) <= (score, std::cmp::Reverse(pair)) => {}
                    _ => best = Some((decrease, key)),
                }
            }
        }
        best.map(|(_, pair)| pair)
    }

    /// Total decrease of L from swapping the contents of `a` and `b`.
    fn swap_decrease(&self, tokens: &FxHashMap<u32, u32>, a: u32, b: u32) -> i64 {
        let mut decrease = 0i64;
        if let Some(&t) = tokens.get(&a) {
            decrease += self.arch.dist_indexed(a, t) as i64 - self.arch.dist_indexed(b, t) as i64;
        }
        if let Some(&t) = tokens.get(&b) {
            decrease += self.arch.dist_indexed(b, t) as i64 - self.arch.dist_indexed(a, t) as i64;
        }
        decrease
    }

    fn apply_swap(
        &self,
        tokens: &mut FxHashMap<u32, u32>,
        swaps: &mut Vec<(u32, u32)>,
        (a, b): (u32, u32),
    ) {
        exchange(tokens, a, b);
        swaps.push((a, b));
    }

    /// Enact the cheapest abstract cycle until L strictly decreases.
    ///
    /// The residual mapping decomposes into disjoint cycles of "arrows"
    /// position → target. A cycle either wraps around or ends at a free
    /// node; either way, performing the abstract swaps in reverse cycle
    /// order shifts every token in the cycle onto its target, so the full
    /// enactment strictly decreases L and an early break is safe.
    fn cyclic_shift_progress(
        &self,
        tokens: &mut FxHashMap<u32, u32>,
        swaps: &mut Vec<(u32, u32)>,
    ) -> MapResult<()> {
        let cycles = self.disjoint_cycles(tokens);
        let mut best: Option<(u64, &Vec<u32>)> = None;
        for cycle in &cycles {
            let cost: u64 = (1..cycle.len())
                .map(|i| self.arch.dist_indexed(cycle[i], cycle[i - 1]))
                .sum();
            if cost == 0 {
                continue;
            }
            match best {
                Some((c, _)) if c <= cost => {}
                _ => best = Some((cost, cycle)),
            }
        }
        let Some((_, cycle)) = best else {
            // No enactable cycle: the mapping should already be solved.
            return Err(MapError::Infeasible);
        };

        let mut l_decrease = 0i64;
        for ii in (1..cycle.len()).rev() {
            let (from, to) = (cycle[ii], cycle[ii - 1]);
            let path = self
                .arch
                .shortest_path_indexed(from, to)
                .ok_or(MapError::Infeasible)?;
            // Interchange the path ends: walk up, then back down, e.g. for
            // [x,a,b,y] the concrete swaps are xa ab by ab xa.
            for jj in 1..path.len() {
                l_decrease += self.swap_decrease(tokens, path[jj], path[jj - 1]);
                self.apply_swap(tokens, swaps, (path[jj], path[jj - 1]));
                if l_decrease > 0 {
                    return Ok(());
                }
            }
            for kk in (1..path.len() - 1).rev() {
                l_decrease += self.swap_decrease(tokens, path[kk], path[kk - 1]);
                self.apply_swap(tokens, swaps, (path[kk], path[kk - 1]));
                if l_decrease > 0 {
                    return Ok(());
                }
            }
        }
        // A full cycle enactment homes every cycle token.
        if l_decrease > 0 {
            Ok(())
        } else {
            Err(MapError::Infeasible)
        }
    }

    /// Decompose the mapping into disjoint abstract cycles.
    ///
    /// Follows arrows forwards from each unseen token; if the walk ends at
    /// a free node instead of wrapping, extends backwards through the
    /// reversed mapping so the free node closes the cycle.
    fn disjoint_cycles(&self, tokens: &FxHashMap<u32, u32>) -> Vec<Vec<u32>> {
        let reversed: FxHashMap<u32, u32> = tokens.iter().map(|(&v, &t)| (t, v)).collect();
        let mut seen: FxHashMap<u32, ()> = FxHashMap::default();
        let mut starts: Vec<u32> = tokens.keys().copied().collect();
        starts.sort_unstable();

        let mut cycles = Vec::new();
        for start in starts {
            if seen.contains_key(&start) {
                continue;
            }
            let mut cycle = vec![start];
            // Forwards until we wrap or hit a free node.
            let mut current = start;
            let mut wrapped = false;
            for _ in 0..=tokens.len() {
                match tokens.get(&current) {
                    Some(&target) if target == start => {
                        wrapped = true;
                        break;
                    }
                    Some(&target) => {
                        cycle.push(target);
                        current = target;
                    }
                    None => break,
                }
            }
            if !wrapped {
                // Backwards from the start through the reversed arrows.
                let mut head = start;
                for _ in 0..=tokens.len() {
                    match reversed.get(&head) {
                        Some(&source) if cycle.contains(&source) => break,
                        Some(&source) => {
                            cycle.insert(0, source);
                            head = source;
                        }
                        None => break,
                    }
                }
            }
            for &v in &cycle {
                seen.insert(v, ());
            }
            if cycle.len() >= 2 {
                cycles.push(cycle);
            }
        }
        cycles
    }
}

/// Exchange the tokens (if any) at two positions.
fn exchange(tokens: &mut FxHashMap<u32, u32>, a: u32, b: u32) {
    let ta = tokens.remove(&a);
    let tb = tokens.remove(&b);
    if let Some(t) = ta {
        tokens.insert(b, t);
    }
    if let Some(t) = tb {
        tokens.insert(a, t);
    }
}

/// Peephole cleanup: drop swaps touching two token-free nodes and cancel
/// adjacent identical swaps.
fn simplify(swaps: &mut Vec<(u32, u32)>, initial: &FxHashMap<u32, u32>) {
    let mut tokens = initial.clone();
    let mut kept: Vec<(u32, u32)> = Vec::with_capacity(swaps.len());
    for &(a, b) in swaps.iter() {
        if !tokens.contains_key(&a) && !tokens.contains_key(&b) {
            continue;
        }
        exchange(&mut tokens, a, b);
        kept.push((a, b));
    }

    let mut changed = true;
    while changed {
        changed = false;
        let mut i = 0;
        while i + 1 < kept.len() {
            if kept[i] == kept[i + 1] {
                kept.drain(i..=i + 1);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    *swaps = kept;
}

/// Whether replaying `swaps` over `initial` homes every token.
fn realizes(initial: &FxHashMap<u32, u32>, swaps: &[(u32, u32)]) -> bool {
    let mut tokens = initial.clone();
    for &(a, b) in swaps {
        exchange(&mut tokens, a, b);
    }
    tokens.iter().all(|(v, t)| v == t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(pairs: &[(u32, u32)]) -> FxHashMap<Node, Node> {
        pairs
            .iter()
            .map(|&(a, b)| (Node::new(a), Node::new(b)))
            .collect()
    }

    fn replay(arch: &Architecture, permutation: &FxHashMap<Node, Node>, swaps: &[(Node, Node)]) {
        let mut tokens: FxHashMap<Node, Node> = permutation.clone();
        for (a, b) in swaps {
            assert!(
                arch.valid_operation(&[a.clone(), b.clone()]),
                "swap ({a}, {b}) is not an architecture edge"
            );
            let ta = tokens.remove(a);
            let tb = tokens.remove(b);
            if let Some(t) = ta {
                tokens.insert(b.clone(), t);
            }
            if let Some(t) = tb {
                tokens.insert(a.clone(), t);
            }
        }
        for (position, target) in &tokens {
            assert_eq!(position, target, "token at {position} wanted {target}");
        }
    }

    #[test]
    fn test_empty_permutation() {
        let arch = Architecture::line(4);
        let swapper = TokenSwapper::new(&arch);
        assert!(swapper.swaps(&FxHashMap::default()).unwrap().is_empty());
    }

    #[test]
    fn test_identity_permutation() {
        let arch = Architecture::line(4);
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(0, 0), (1, 1)]);
        assert!(swapper.swaps(&p).unwrap().is_empty());
    }

    #[test]
    fn test_adjacent_exchange() {
        let arch = Architecture::line(3);
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(0, 1), (1, 0)]);
        let swaps = swapper.swaps(&p).unwrap();
        assert_eq!(swaps.len(), 1);
        replay(&arch, &p, &swaps);
    }

    #[test]
    fn test_end_exchange_on_three_node_path() {
        // Exchanging the two ends of a 3-node path needs exactly 3 swaps.
        let arch = Architecture::line(3);
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(0, 2), (2, 0)]);
        let swaps = swapper.swaps(&p).unwrap();
        assert!(swaps.len() >= 3);
        replay(&arch, &p, &swaps);
    }

    #[test]
    fn test_pinned_bystander_forces_cycle_fallback() {
        // Moving the token at 0 to 2 must route through 1, whose token is
        // pinned in place; no single swap decreases L, so the cyclic-shift
        // fallback has to kick in.
        let arch = Architecture::line(3);
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(0, 2), (1, 1)]);
        let swaps = swapper.swaps(&p).unwrap();
        replay(&arch, &p, &swaps);
        assert_eq!(swaps.len(), 3);
    }

    #[test]
    fn test_rotation_on_star() {
        let arch =
            Architecture::from_index_couplings(&[(0, 1), (0, 2), (0, 3)]).unwrap();
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(1, 2), (2, 3), (3, 1)]);
        let swaps = swapper.swaps(&p).unwrap();
        replay(&arch, &p, &swaps);
    }

    #[test]
    fn test_full_reversal_on_line() {
        let arch = Architecture::line(5);
        let swapper = TokenSwapper::new(&arch);
        let p = perm(&[(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)]);
        let swaps = swapper.swaps(&p).unwrap();
        replay(&arch, &p, &swaps);
    }

    #[test]
    fn test_disconnected_target_infeasible() {
        let arch = Architecture::from_index_couplings(&[(0, 1), (2, 3)]).unwrap();
        let swapper = TokenSwapper::new(&arch);
        let err = swapper.swaps(&perm(&[(0, 3)]));
        assert!(matches!(err, Err(MapError::Infeasible)));
    }

    #[test]
    fn test_colliding_targets_infeasible() {
        let arch = Architecture::line(3);
        let swapper = TokenSwapper::new(&arch);
        let err = swapper.swaps(&perm(&[(0, 2), (1, 2)]));
        assert!(matches!(err, Err(MapError::Infeasible)));
    }

    #[test]
    fn test_unknown_node_rejected() {
        let arch = Architecture::line(3);
        let swapper = TokenSwapper::new(&arch);
        let err = swapper.swaps(&perm(&[(0, 7)]));
        assert!(matches!(err, Err(MapError::NodeNotFound { .. })));
    }

    #[test]
    fn test_grid_rotation() {
        let arch = Architecture::grid(3, 3);
        let swapper = TokenSwapper::new(&arch);
        // Rotate the four corners.
        let p = perm(&[(0, 2), (2, 8), (8, 6), (6, 0)]);
        let swaps = swapper.swaps(&p).unwrap();
        replay(&arch, &p, &swaps);
    }
}
