//! Circuit routing: SWAP/BRIDGE insertion under a connectivity graph.
//!
//! The [`MappingManager`](manager::MappingManager) walks a circuit's
//! commands in a commutation-respecting order and keeps a current
//! logical-to-physical [`QubitMapping`](crate::mapping::QubitMapping).
//! Commands whose physical qubits are adjacent are rewritten onto nodes
//! directly; a blocked command is handed to the first configured
//! [`RoutingMethod`] that accepts it, which inserts SWAP or BRIDGE
//! commands and updates the mapping until the command becomes legal.

pub mod frontier;
mod lexi_route;
pub mod manager;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sleipnir_ir::Instruction;

use crate::error::{MapError, MapResult};
use frontier::RoutingFrontier;

/// A pluggable strategy for unblocking one frontier command.
///
/// Methods are dispatched through [`can_handle`](Self::can_handle) /
/// [`apply`](Self::apply): the routing manager walks its configured list
/// in order and applies the first method that accepts the blocked command.
#[derive(Clone)]
pub enum RoutingMethod {
    /// Lexicographic-heuristic token movement with slice lookahead and
    /// BRIDGE insertion.
    LexiRoute {
        /// Number of upcoming interaction slices consulted per decision.
        depth: usize,
    },
    /// Bring the blocked pair together along the cheapest target edge by
    /// running the token-swapping solver.
    TokenSwap,
    /// A user-supplied rewrite.
    Custom(CustomRoutingMethod),
}

impl RoutingMethod {
    /// Display name of the method.
    pub fn name(&self) -> &str {
        match self {
            RoutingMethod::LexiRoute { .. } => "LexiRoute",
            RoutingMethod::TokenSwap => "TokenSwap",
            RoutingMethod::Custom(custom) => &custom.name,
        }
    }

    /// Whether this method can unblock the given command.
    pub fn can_handle(&self, inst: &Instruction) -> bool {
        match self {
            RoutingMethod::LexiRoute { .. } | RoutingMethod::TokenSwap => {
                inst.is_two_qubit_gate()
            }
            RoutingMethod::Custom(custom) => (custom.can_handle)(inst),
        }
    }

    /// Insert replacement commands and update the placement.
    pub fn apply(&self, frontier: &mut RoutingFrontier<'_>) -> MapResult<()> {
        match self {
            RoutingMethod::LexiRoute { depth } => lexi_route::solve(frontier, *depth),
            RoutingMethod::TokenSwap => token_swap_route(frontier),
            RoutingMethod::Custom(custom) => (custom.apply)(frontier),
        }
    }
}

impl fmt::Debug for RoutingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMethod::LexiRoute { depth } => {
                f.debug_struct("LexiRoute").field("depth", depth).finish()
            }
            RoutingMethod::TokenSwap => f.write_str("TokenSwap"),
            RoutingMethod::Custom(custom) => {
                f.debug_struct("Custom").field("name", &custom.name).finish()
            }
        }
    }
}

/// A user-supplied routing strategy: a feasibility predicate plus a
/// frontier rewrite. Runtime-only; custom methods do not serialize.
#[derive(Clone)]
pub struct CustomRoutingMethod {
    name: String,
    can_handle: Arc<dyn Fn(&Instruction) -> bool + Send + Sync>,
    #[allow(clippy::type_complexity)]
    apply: Arc<dyn Fn(&mut RoutingFrontier<'_>) -> MapResult<()> + Send + Sync>,
}

impl CustomRoutingMethod {
    /// Create a custom method from its predicate and rewrite.
    pub fn new(
        name: impl Into<String>,
        can_handle: impl Fn(&Instruction) -> bool + Send + Sync + 'static,
        apply: impl Fn(&mut RoutingFrontier<'_>) -> MapResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            can_handle: Arc::new(can_handle),
            apply: Arc::new(apply),
        }
    }
}

/// Serializable routing-method configuration: a named variant tag plus
/// parameters, for persisting pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum RoutingConfig {
    /// See [`RoutingMethod::LexiRoute`].
    LexiRoute {
        /// Lookahead depth in interaction slices.
        depth: usize,
    },
    /// See [`RoutingMethod::TokenSwap`].
    TokenSwap,
}

impl RoutingConfig {
    /// The default method list: LexiRoute with a 10-slice lookahead.
    pub fn default_pipeline() -> Vec<RoutingConfig> {
        vec![RoutingConfig::LexiRoute { depth: 10 }]
    }
}

impl From<&RoutingConfig> for RoutingMethod {
    fn from(config: &RoutingConfig) -> Self {
        match *config {
            RoutingConfig::LexiRoute { depth } => RoutingMethod::LexiRoute { depth },
            RoutingConfig::TokenSwap => RoutingMethod::TokenSwap,
        }
    }
}

/// Route the head command by moving its two qubits onto the cheapest
/// target edge with the token-swapping solver.
fn token_swap_route(frontier: &mut RoutingFrontier<'_>) -> MapResult<()> {
    use crate::token_swapper::TokenSwapper;
    use rustc_hash::FxHashMap;

    let arch = frontier.architecture();
    let Some(idx) = frontier.head_index() else {
        return Ok(());
    };
    let inst = frontier.pending_instruction(idx).clone();
    let a = frontier.node_index_of_wire(inst.qubits[0]);
    let b = frontier.node_index_of_wire(inst.qubits[1]);

    // Cheapest edge to meet on, considering both orientations.
    let mut best: Option<(u64, (u32, u32))> = None;
    for &(u, v, _) in arch.edges_indexed() {
        for (x, y) in [(u, v), (v, u)] {
            let (da, db) = (arch.dist_indexed(a, x), arch.dist_indexed(b, y));
            if da == u64::MAX || db == u64::MAX {
                continue;
            }
            let cost = da + db;
            match best {
                Some((c, pair)) if (cost, (x, y)) >= (c, pair) => {}
                _ => best = Some((cost, (x, y))),
            }
        }
    }
    let Some((_, (x, y))) = best else {
        return Err(MapError::Infeasible);
    };

    // Both qubits are tokens even when one already sits on the target
    // edge: pinning it guarantees the pair is adjacent when the sequence
    // ends, whatever scratch moves the solver makes.
    let mut permutation = FxHashMap::default();
    permutation.insert(arch.node_at(a).clone(), arch.node_at(x).clone());
    permutation.insert(arch.node_at(b).clone(), arch.node_at(y).clone());
    let swaps = TokenSwapper::new(arch).swaps(&permutation)?;
    for (p, q) in &swaps {
        frontier.add_swap(p, q)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ir::{QubitId, StandardGate};

    #[test]
    fn test_can_handle() {
        let lexi = RoutingMethod::LexiRoute { depth: 3 };
        let cx = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        let h = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        let ccx = Instruction::gate(StandardGate::CCX, [QubitId(0), QubitId(1), QubitId(2)]);
        assert!(lexi.can_handle(&cx));
        assert!(!lexi.can_handle(&h));
        assert!(!lexi.can_handle(&ccx));
    }

    #[test]
    fn test_config_round_trip() {
        let configs = vec![
            RoutingConfig::LexiRoute { depth: 7 },
            RoutingConfig::TokenSwap,
        ];
        let json = serde_json::to_string(&configs).unwrap();
        assert!(json.contains(r#""name":"LexiRoute""#));
        let back: Vec<RoutingConfig> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, configs);
    }

    #[test]
    fn test_custom_method_dispatch() {
        let method = RoutingMethod::Custom(CustomRoutingMethod::new(
            "refuse-everything",
            |_| false,
            |_: &mut RoutingFrontier<'_>| Ok(()),
        ));
        let cx = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        assert!(!method.can_handle(&cx));
        assert_eq!(method.name(), "refuse-everything");
    }
}
