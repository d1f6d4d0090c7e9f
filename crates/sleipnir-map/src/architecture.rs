//! Device connectivity graph.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sleipnir_ir::{Node, UnitId};

use crate::error::{MapError, MapResult};

/// Marker for an unreachable entry in the distance matrix.
const UNREACHABLE: u64 = u64::MAX;
/// Marker for a missing entry in the predecessor matrix.
const NO_PRED: u32 = u32::MAX;

/// An undirected graph of device nodes with weighted edges.
///
/// Edge weights default to 1 and act as the distance metric: `distance`
/// returns weighted shortest-path costs. The graph is immutable after
/// construction; all-pairs distance and predecessor matrices are computed
/// up front (Dijkstra per source), so `distance` and `shortest_path` are
/// matrix lookups during routing.
///
/// Nodes are kept sorted, and every query that returns a collection returns
/// it in node order, so identical inputs always produce identical outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ArchitectureSpec", into = "ArchitectureSpec")]
pub struct Architecture {
    /// All nodes, sorted.
    nodes: Vec<Node>,
    /// Node → position in `nodes`.
    index: FxHashMap<Node, u32>,
    /// Adjacency lists `(neighbor, weight)`, each sorted by neighbor index.
    adjacency: Vec<Vec<(u32, u32)>>,
    /// Canonical edge list `(a, b, weight)` with `a < b`, sorted.
    edges: Vec<(u32, u32, u32)>,
    /// Edge orientations as declared at construction.
    directed: Vec<(u32, u32)>,
    /// All-pairs shortest-path distances; `UNREACHABLE` across components.
    dist: Vec<Vec<u64>>,
    /// `pred[s][t]` is the node before `t` on a shortest path from `s`.
    pred: Vec<Vec<u32>>,
    /// Largest finite pairwise distance.
    diameter: u64,
}

impl Architecture {
    /// Build from unweighted couplings (every edge weight 1).
    pub fn from_couplings(
        couplings: impl IntoIterator<Item = (Node, Node)>,
    ) -> MapResult<Self> {
        Self::from_weighted_couplings(couplings.into_iter().map(|(a, b)| (a, b, 1)))
    }

    /// Build from integer couplings, promoted to `node[i]` names.
    pub fn from_index_couplings(couplings: &[(u32, u32)]) -> MapResult<Self> {
        Self::from_couplings(
            couplings
                .iter()
                .map(|&(a, b)| (Node::new(a), Node::new(b))),
        )
    }

    /// Build from weighted couplings.
    ///
    /// Fails with [`MapError::InvalidArchitecture`] on a self-loop, a
    /// zero-weight edge, or a duplicate edge with a conflicting weight.
    /// Duplicate edges with equal weight are deduplicated.
    pub fn from_weighted_couplings(
        couplings: impl IntoIterator<Item = (Node, Node, u32)>,
    ) -> MapResult<Self> {
        let mut declared: Vec<(Node, Node, u32)> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();
        for (a, b, w) in couplings {
            if a == b {
                return Err(MapError::InvalidArchitecture {
                    reason: format!("self-loop on {a}"),
                });
            }
            if w == 0 {
                return Err(MapError::InvalidArchitecture {
                    reason: format!("zero-weight edge {a} -- {b}"),
                });
            }
            nodes.push(a.clone());
            nodes.push(b.clone());
            declared.push((a, b, w));
        }
        nodes.sort();
        nodes.dedup();

        let index: FxHashMap<Node, u32> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();

        let mut edge_weights: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut directed = Vec::new();
        for (a, b, w) in &declared {
            let (ia, ib) = (index[a], index[b]);
            directed.push((ia, ib));
            let key = (ia.min(ib), ia.max(ib));
            match edge_weights.get(&key) {
                Some(&existing) if existing != *w => {
                    return Err(MapError::InvalidArchitecture {
                        reason: format!(
                            "conflicting weights {existing} and {w} for edge {a} -- {b}"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    edge_weights.insert(key, *w);
                }
            }
        }
        directed.sort_unstable();
        directed.dedup();

        let mut edges: Vec<(u32, u32, u32)> = edge_weights
            .into_iter()
            .map(|((a, b), w)| (a, b, w))
            .collect();
        edges.sort_unstable();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for &(a, b, w) in &edges {
            adjacency[a as usize].push((b, w));
            adjacency[b as usize].push((a, w));
        }
        for list in &mut adjacency {
            list.sort_unstable();
        }

        let (dist, pred) = all_pairs_shortest_paths(&adjacency);
        let diameter = dist
            .iter()
            .flatten()
            .copied()
            .filter(|&d| d != UNREACHABLE)
            .max()
            .unwrap_or(0);

        Ok(Self {
            nodes,
            index,
            adjacency,
            edges,
            directed,
            dist,
            pred,
            diameter,
        })
    }

    /// A path graph `node[0] -- node[1] -- ... -- node[n-1]`.
    pub fn line(n: u32) -> Self {
        let couplings: Vec<(u32, u32)> = (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        Self::from_index_couplings(&couplings).expect("line couplings are well formed")
    }

    /// A rectangular grid with `rows * cols` nodes.
    pub fn grid(rows: u32, cols: u32) -> Self {
        let mut couplings = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let id = r * cols + c;
                if c + 1 < cols {
                    couplings.push((id, id + 1));
                }
                if r + 1 < rows {
                    couplings.push((id, id + cols));
                }
            }
        }
        Self::from_index_couplings(&couplings).expect("grid couplings are well formed")
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, sorted.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether the architecture contains the node.
    pub fn contains(&self, node: &Node) -> bool {
        self.index.contains_key(node)
    }

    /// Edges as `(a, b, weight)` triples, sorted, with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, u32)> + '_ {
        self.edges.iter().map(|&(a, b, w)| {
            (&self.nodes[a as usize], &self.nodes[b as usize], w)
        })
    }

    /// Largest finite pairwise distance.
    pub fn diameter(&self) -> u64 {
        self.diameter
    }

    /// Weighted shortest-path distance between two nodes.
    pub fn distance(&self, a: &Node, b: &Node) -> MapResult<u64> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let d = self.dist[ia as usize][ib as usize];
        if d == UNREACHABLE {
            return Err(MapError::Unreachable {
                from: a.clone(),
                to: b.clone(),
            });
        }
        Ok(d)
    }

    /// Neighbors of a node, sorted.
    pub fn neighbors(&self, node: &Node) -> MapResult<Vec<Node>> {
        let i = self.index_of(node)?;
        Ok(self.adjacency[i as usize]
            .iter()
            .map(|&(n, _)| self.nodes[n as usize].clone())
            .collect())
    }

    /// A shortest path between two nodes, inclusive of both endpoints.
    pub fn shortest_path(&self, from: &Node, to: &Node) -> MapResult<Vec<Node>> {
        let path = self.shortest_path_indexed(self.index_of(from)?, self.index_of(to)?);
        match path {
            Some(path) => Ok(path
                .into_iter()
                .map(|i| self.nodes[i as usize].clone())
                .collect()),
            None => Err(MapError::Unreachable {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }

    /// Nodes at exactly the given distance from `root`, sorted.
    pub fn nodes_at_distance(&self, root: &Node, distance: u64) -> MapResult<Vec<Node>> {
        let i = self.index_of(root)?;
        Ok(self.dist[i as usize]
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == distance && d != UNREACHABLE)
            .map(|(j, _)| self.nodes[j].clone())
            .collect())
    }

    /// Nodes of maximal degree, sorted.
    pub fn max_degree_nodes(&self) -> Vec<Node> {
        let max = self
            .adjacency
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, adj)| adj.len() == max)
            .map(|(i, _)| self.nodes[i].clone())
            .collect()
    }

    /// Whether the given argument list is a legal operation: one node, or
    /// two nodes joined by an edge (in either orientation).
    pub fn valid_operation(&self, nodes: &[Node]) -> bool {
        match nodes {
            [a] => self.contains(a),
            [a, b] => {
                let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
                    return false;
                };
                ia != ib && self.adjacency[ia as usize].iter().any(|&(n, _)| n == ib)
            }
            _ => false,
        }
    }

    /// Like [`valid_operation`](Self::valid_operation), but a two-node
    /// operation must match an edge orientation declared at construction.
    pub fn valid_operation_directed(&self, nodes: &[Node]) -> bool {
        match nodes {
            [a, b] => {
                let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
                    return false;
                };
                self.directed.binary_search(&(ia, ib)).is_ok()
            }
            _ => self.valid_operation(nodes),
        }
    }

    // ---- index-level access for the solvers ----

    pub(crate) fn index_of(&self, node: &Node) -> MapResult<u32> {
        self.index
            .get(node)
            .copied()
            .ok_or_else(|| MapError::NodeNotFound { node: node.clone() })
    }

    pub(crate) fn node_at(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    pub(crate) fn neighbors_indexed(&self, index: u32) -> &[(u32, u32)] {
        &self.adjacency[index as usize]
    }

    /// Distance by index; `u64::MAX` marks unreachable pairs.
    pub(crate) fn dist_indexed(&self, a: u32, b: u32) -> u64 {
        self.dist[a as usize][b as usize]
    }

    pub(crate) fn shortest_path_indexed(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }
        if self.dist[from as usize][to as usize] == UNREACHABLE {
            return None;
        }
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let p = self.pred[from as usize][current as usize];
            if p == NO_PRED {
                return None;
            }
            path.push(p);
            current = p;
        }
        path.reverse();
        Some(path)
    }

    pub(crate) fn edges_indexed(&self) -> &[(u32, u32, u32)] {
        &self.edges
    }

    pub(crate) fn edge_exists_indexed(&self, a: u32, b: u32) -> bool {
        self.adjacency[a as usize].iter().any(|&(n, _)| n == b)
    }
}

/// Dijkstra from every source. Deterministic: the heap orders by
/// `(distance, node index)`, so predecessor choices are stable.
fn all_pairs_shortest_paths(adjacency: &[Vec<(u32, u32)>]) -> (Vec<Vec<u64>>, Vec<Vec<u32>>) {
    let n = adjacency.len();
    let mut dist = vec![vec![UNREACHABLE; n]; n];
    let mut pred = vec![vec![NO_PRED; n]; n];

    for src in 0..n {
        let d = &mut dist[src];
        let p = &mut pred[src];
        d[src] = 0;
        let mut heap: BinaryHeap<Reverse<(u64, u32)>> = BinaryHeap::new();
        heap.push(Reverse((0, src as u32)));
        while let Some(Reverse((cost, node))) = heap.pop() {
            if cost > d[node as usize] {
                continue;
            }
            for &(next, w) in &adjacency[node as usize] {
                let candidate = cost + u64::from(w);
                if candidate < d[next as usize] {
                    d[next as usize] = candidate;
                    p[next as usize] = node;
                    heap.push(Reverse((candidate, next)));
                }
            }
        }
    }
    (dist, pred)
}

/// Serialized form: `{"nodes": [...], "links": [{"link": [a, b], "weight": w}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchitectureSpec {
    nodes: Vec<UnitId>,
    links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkSpec {
    link: (UnitId, UnitId),
    weight: u32,
}

impl From<Architecture> for ArchitectureSpec {
    fn from(arch: Architecture) -> Self {
        Self {
            nodes: arch.nodes.iter().map(|n| n.unit().clone()).collect(),
            links: arch
                .edges
                .iter()
                .map(|&(a, b, weight)| LinkSpec {
                    link: (
                        arch.nodes[a as usize].unit().clone(),
                        arch.nodes[b as usize].unit().clone(),
                    ),
                    weight,
                })
                .collect(),
        }
    }
}

impl TryFrom<ArchitectureSpec> for Architecture {
    type Error = MapError;

    fn try_from(spec: ArchitectureSpec) -> MapResult<Self> {
        let arch = Architecture::from_weighted_couplings(spec.links.into_iter().map(|l| {
            (
                Node::from_unit(l.link.0),
                Node::from_unit(l.link.1),
                l.weight,
            )
        }))?;
        // Declared isolated nodes are allowed in the document but the graph
        // built from links alone must account for each of them.
        for unit in spec.nodes {
            let node = Node::from_unit(unit);
            if !arch.contains(&node) {
                return Err(MapError::InvalidArchitecture {
                    reason: format!("node {node} appears in no link"),
                });
            }
        }
        Ok(arch)
    }
}
