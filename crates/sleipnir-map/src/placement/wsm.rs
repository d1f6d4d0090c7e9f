//! Branch-and-bound weighted subgraph monomorphism search.
//!
//! Finds an injective map from pattern vertices to target vertices such
//! that every pattern edge lands on a target edge, minimizing the sum of
//! `pattern_weight * target_weight` over mapped edges. The search extends a
//! partial assignment one pattern vertex at a time in a fixed order, prunes
//! candidates that violate adjacency with already-assigned neighbours, and
//! cuts branches whose cost lower bound cannot beat the incumbent.
//!
//! All orderings are by integer index, so the search is deterministic. The
//! node budget is a visit count, not a clock, keeping results reproducible.

use rustc_hash::FxHashMap;

/// A relabelled WSM instance: pattern vertices `0..n_pattern`, target
/// vertices `0..n_target`, adjacency lists carrying edge weights.
#[derive(Debug, Clone)]
pub(crate) struct WsmProblem {
    pub n_pattern: u32,
    pub n_target: u32,
    pub pattern_adj: Vec<Vec<(u32, u64)>>,
    pub target_adj: Vec<Vec<(u32, u64)>>,
}

/// Search result: the best complete assignment found, if any, plus search
/// effort statistics.
#[derive(Debug, Clone)]
pub(crate) struct WsmOutcome {
    /// `assignment[p]` is the target vertex of pattern vertex `p`.
    pub assignment: Option<Vec<u32>>,
    /// Cost of the returned assignment.
    pub cost: u64,
    /// Search nodes visited.
    pub nodes_visited: u64,
    /// Whether the node budget stopped the search early.
    pub budget_exhausted: bool,
}

impl WsmProblem {
    /// Build from edge lists.
    pub(crate) fn new(
        n_pattern: u32,
        pattern_edges: &[(u32, u32, u64)],
        n_target: u32,
        target_edges: &[(u32, u32, u64)],
    ) -> Self {
        let mut pattern_adj = vec![Vec::new(); n_pattern as usize];
        for &(a, b, w) in pattern_edges {
            pattern_adj[a as usize].push((b, w));
            pattern_adj[b as usize].push((a, w));
        }
        let mut target_adj = vec![Vec::new(); n_target as usize];
        for &(a, b, w) in target_edges {
            target_adj[a as usize].push((b, w));
            target_adj[b as usize].push((a, w));
        }
        for adj in pattern_adj.iter_mut().chain(target_adj.iter_mut()) {
            adj.sort_unstable();
        }
        Self {
            n_pattern,
            n_target,
            pattern_adj,
            target_adj,
        }
    }

    /// Run the search with the given node budget.
    pub(crate) fn solve(&self, node_budget: u64) -> WsmOutcome {
        // Pattern vertices in decreasing (degree, incident weight) order:
        // the most constrained vertices are assigned first.
        let mut order: Vec<u32> = (0..self.n_pattern).collect();
        order.sort_by_key(|&p| {
            let adj = &self.pattern_adj[p as usize];
            let weight: u64 = adj.iter().map(|&(_, w)| w).sum();
            (std::cmp::Reverse(adj.len()), std::cmp::Reverse(weight), p)
        });

        // Degree-filtered candidate domains.
        let domains: Vec<Vec<u32>> = order
            .iter()
            .map(|&p| {
                let degree = self.pattern_adj[p as usize].len();
                (0..self.n_target)
                    .filter(|&t| self.target_adj[t as usize].len() >= degree)
                    .collect()
            })
            .collect();

        let min_target_weight = self
            .target_adj
            .iter()
            .flatten()
            .map(|&(_, w)| w)
            .min()
            .unwrap_or(0);
        let total_pattern_weight: u64 = self
            .pattern_adj
            .iter()
            .flatten()
            .map(|&(_, w)| w)
            .sum::<u64>()
            / 2;

        let mut search = Search {
            problem: self,
            order: &order,
            domains: &domains,
            min_target_weight,
            total_pattern_weight,
            assignment: vec![u32::MAX; self.n_pattern as usize],
            used: vec![false; self.n_target as usize],
            best: None,
            best_cost: u64::MAX,
            nodes_visited: 0,
            node_budget,
            budget_exhausted: false,
        };
        search.descend(0, 0, 0);

        WsmOutcome {
            cost: if search.best.is_some() {
                search.best_cost
            } else {
                0
            },
            assignment: search.best,
            nodes_visited: search.nodes_visited,
            budget_exhausted: search.budget_exhausted,
        }
    }

    fn target_edge_weight(&self, a: u32, b: u32) -> Option<u64> {
        self.target_adj[a as usize]
            .binary_search_by_key(&b, |&(n, _)| n)
            .ok()
            .map(|i| self.target_adj[a as usize][i].1)
    }
}

struct Search<'a> {
    problem: &'a WsmProblem,
    order: &'a [u32],
    domains: &'a [Vec<u32>],
    min_target_weight: u64,
    total_pattern_weight: u64,
    assignment: Vec<u32>,
    used: Vec<bool>,
    best: Option<Vec<u32>>,
    best_cost: u64,
    nodes_visited: u64,
    node_budget: u64,
    budget_exhausted: bool,
}

impl Search<'_> {
    /// Extend the assignment at position `depth` in the vertex order.
    ///
    /// `scored_weight` is the pattern weight of edges already priced in
    /// (both endpoints assigned); the remainder is bounded below by the
    /// cheapest target edge weight.
    fn descend(&mut self, depth: usize, cost: u64, scored_weight: u64) {
        if self.budget_exhausted {
            return;
        }
        if depth == self.order.len() {
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best = Some(self.assignment.clone());
            }
            return;
        }
        let p = self.order[depth];
        let candidates: Vec<u32> = self.domains[depth]
            .iter()
            .copied()
            .filter(|&t| !self.used[t as usize])
            .collect();
        for t in candidates {
            self.nodes_visited += 1;
            if self.nodes_visited > self.node_budget {
                self.budget_exhausted = true;
                return;
            }

            // Adjacency with every assigned pattern neighbour, accumulating
            // the edge costs this assignment completes.
            let mut extension_cost = 0u64;
            let mut extension_weight = 0u64;
            let mut consistent = true;
            for &(pn, wp) in &self.problem.pattern_adj[p as usize] {
                let tn = self.assignment[pn as usize];
                if tn == u32::MAX {
                    continue;
                }
                match self.problem.target_edge_weight(t, tn) {
                    Some(wt) => {
                        extension_cost += wp * wt;
                        extension_weight += wp;
                    }
                    None => {
                        consistent = false;
                        break;
                    }
                }
            }
            if !consistent {
                continue;
            }

            let new_cost = cost + extension_cost;
            let new_scored = scored_weight + extension_weight;
            let remaining = self.total_pattern_weight - new_scored;
            if new_cost + remaining * self.min_target_weight >= self.best_cost {
                continue;
            }

            self.assignment[p as usize] = t;
            self.used[t as usize] = true;
            self.descend(depth + 1, new_cost, new_scored);
            self.used[t as usize] = false;
            self.assignment[p as usize] = u32::MAX;
            if self.budget_exhausted {
                return;
            }
        }
    }
}

/// Relabel a sparse vertex set to dense indices, keeping sorted order.
pub(crate) fn relabel(vertices: impl IntoIterator<Item = u32>) -> (Vec<u32>, FxHashMap<u32, u32>) {
    let mut originals: Vec<u32> = vertices.into_iter().collect();
    originals.sort_unstable();
    originals.dedup();
    let to_dense = originals
        .iter()
        .enumerate()
        .map(|(dense, &orig)| (orig, dense as u32))
        .collect();
    (originals, to_dense)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_edge_onto_single_edge() {
        let problem = WsmProblem::new(2, &[(0, 1, 3)], 2, &[(0, 1, 1)]);
        let outcome = problem.solve(1_000);
        let assignment = outcome.assignment.unwrap();
        assert_eq!(assignment.len(), 2);
        assert_ne!(assignment[0], assignment[1]);
        assert_eq!(outcome.cost, 3);
    }

    #[test]
    fn test_no_embedding() {
        // Triangle cannot embed in a path.
        let problem = WsmProblem::new(
            3,
            &[(0, 1, 1), (1, 2, 1), (0, 2, 1)],
            3,
            &[(0, 1, 1), (1, 2, 1)],
        );
        let outcome = problem.solve(10_000);
        assert!(outcome.assignment.is_none());
        assert!(!outcome.budget_exhausted);
    }

    #[test]
    fn test_prefers_cheap_target_edges() {
        // One pattern edge, two disjoint target edges with different costs.
        let problem = WsmProblem::new(
            2,
            &[(0, 1, 2)],
            4,
            &[(0, 1, 5), (2, 3, 1)],
        );
        let outcome = problem.solve(1_000);
        let assignment = outcome.assignment.unwrap();
        assert_eq!(outcome.cost, 2);
        assert!(assignment[0] >= 2 && assignment[1] >= 2);
    }

    #[test]
    fn test_budget_exhaustion_reported() {
        let problem = WsmProblem::new(
            3,
            &[(0, 1, 1), (1, 2, 1)],
            5,
            &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1)],
        );
        let outcome = problem.solve(2);
        assert!(outcome.budget_exhausted);
    }

    #[test]
    fn test_empty_pattern() {
        let problem = WsmProblem::new(0, &[], 3, &[(0, 1, 1), (1, 2, 1)]);
        let outcome = problem.solve(100);
        assert_eq!(outcome.assignment.unwrap(), Vec::<u32>::new());
        assert_eq!(outcome.cost, 0);
    }

    #[test]
    fn test_deterministic() {
        let problem = WsmProblem::new(
            3,
            &[(0, 1, 2), (1, 2, 1)],
            4,
            &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (0, 3, 1)],
        );
        let a = problem.solve(10_000);
        let b = problem.solve(10_000);
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.nodes_visited, b.nodes_visited);
    }

    #[test]
    fn test_relabel() {
        let (originals, to_dense) = relabel([7, 2, 9, 2]);
        assert_eq!(originals, vec![2, 7, 9]);
        assert_eq!(to_dense[&7], 1);
    }
}
