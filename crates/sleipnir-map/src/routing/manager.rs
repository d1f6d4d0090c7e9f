//! The routing manager: walks circuit commands and keeps them legal.

use sleipnir_ir::{Circuit, Instruction, Qubit};
use tracing::{debug, info, instrument};

use crate::architecture::Architecture;
use crate::error::{MapError, MapResult};
use crate::mapping::QubitMapping;
use crate::routing::frontier::RoutingFrontier;
use crate::routing::{RoutingConfig, RoutingMethod};

/// Result of a successful routing call.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// The final logical-to-physical permutation. SWAP insertion moves
    /// qubits, so this generally differs from the initial mapping.
    pub mapping: QubitMapping,
}

/// Routes circuits onto one architecture.
pub struct MappingManager<'a> {
    arch: &'a Architecture,
}

impl<'a> MappingManager<'a> {
    /// Create a manager for the given architecture.
    pub fn new(arch: &'a Architecture) -> Self {
        Self { arch }
    }

    /// Route `circuit` in place under `mapping`, using `methods` in order
    /// for blocked commands.
    ///
    /// Qubits missing from the mapping are bound on first use (nearest
    /// free node to their first interaction partner, node order as the
    /// fallback). On success the circuit's commands are rewritten onto
    /// physical node wires and `mapping` holds the output permutation; on
    /// error both are left untouched.
    #[instrument(skip_all, fields(circuit = circuit.name(), methods = methods.len()))]
    pub fn route(
        &self,
        circuit: &mut Circuit,
        mapping: &mut QubitMapping,
        methods: &[RoutingMethod],
    ) -> MapResult<bool> {
        let mut working = mapping.clone();
        self.bind_unplaced(circuit, &mut working)?;

        let mut frontier = RoutingFrontier::new(self.arch, circuit, &working)?;
        // Applications without the head advancing before the manager stops
        // trusting the configured heuristics and walks the pair together
        // along a shortest path.
        let stall_cap = 4 * (self.arch.diameter() as usize + 2);
        let mut stalls = 0usize;

        while let Some(idx) = frontier.head_index() {
            let inst = frontier.pending_instruction(idx).clone();
            if frontier.is_routable(&inst) {
                frontier.emit_head();
                stalls = 0;
                continue;
            }

            let Some(method) = methods.iter().find(|m| m.can_handle(&inst)) else {
                return Err(unroutable(circuit, &inst));
            };
            stalls += 1;
            if stalls > stall_cap {
                if inst.qubits.len() != 2 {
                    return Err(unroutable(circuit, &inst));
                }
                debug!(command = inst.name(), "heuristics stalled, forcing path swaps");
                self.force_route(&mut frontier, &inst)
                    .map_err(|_| unroutable(circuit, &inst))?;
                stalls = 0;
                continue;
            }
            debug!(command = inst.name(), method = method.name(), "routing blocked command");
            method.apply(&mut frontier).map_err(|err| match err {
                MapError::Infeasible => unroutable(circuit, &inst),
                other => other,
            })?;
        }

        let (routed, final_mapping) = frontier.finish()?;
        info!(
            ops = routed.num_ops(),
            qubits = routed.num_qubits(),
            "routing complete"
        );
        *circuit = routed;
        *mapping = final_mapping;
        Ok(true)
    }

    /// Bind every unmapped circuit qubit to a free node: nearest to the
    /// node of its first interaction partner when that is already placed,
    /// otherwise the first free node in node order.
    fn bind_unplaced(&self, circuit: &Circuit, mapping: &mut QubitMapping) -> MapResult<()> {
        for label in circuit.qubits() {
            let qubit = Qubit::from_unit(label.clone());
            if let Some(node) = mapping.physical(&qubit) {
                // Validate early so a bogus mapping fails before any work.
                self.arch.index_of(node)?;
            }
        }

        let instructions = circuit.instructions();
        for (wire, label) in circuit.qubits().iter().enumerate() {
            let qubit = Qubit::from_unit(label.clone());
            if mapping.contains_qubit(&qubit) {
                continue;
            }

            let partner_node = instructions
                .iter()
                .filter(|inst| inst.is_two_qubit_gate())
                .find_map(|inst| {
                    let wires = [inst.qubits[0].0 as usize, inst.qubits[1].0 as usize];
                    if !wires.contains(&wire) {
                        return None;
                    }
                    let other = if wires[0] == wire { wires[1] } else { wires[0] };
                    let other_label = circuit.qubits().get(other)?;
                    mapping
                        .physical(&Qubit::from_unit(other_label.clone()))
                        .cloned()
                })
                .map(|node| self.arch.index_of(&node))
                .transpose()?;

            let n = self.arch.num_nodes() as u32;
            let chosen = (0..n)
                .filter(|&t| !mapping.contains_node(self.arch.node_at(t)))
                .min_by_key(|&t| match partner_node {
                    Some(p) => (self.arch.dist_indexed(t, p), t),
                    None => (0, t),
                })
                .ok_or(MapError::CapacityExceeded {
                    required: circuit.num_qubits(),
                    available: self.arch.num_nodes(),
                })?;
            mapping.insert(qubit, self.arch.node_at(chosen).clone())?;
        }
        Ok(())
    }

    /// Last-resort progress: swap the head gate's first qubit along a
    /// shortest path until it neighbours its partner.
    fn force_route(
        &self,
        frontier: &mut RoutingFrontier<'_>,
        inst: &Instruction,
    ) -> MapResult<()> {
        let a = frontier.node_index_of_wire(inst.qubits[0]);
        let b = frontier.node_index_of_wire(inst.qubits[1]);
        let path = self
            .arch
            .shortest_path_indexed(a, b)
            .ok_or(MapError::Infeasible)?;
        for window in path.windows(2).take(path.len().saturating_sub(2)) {
            frontier.add_swap_indexed(window[0], window[1]);
        }
        Ok(())
    }
}

fn unroutable(circuit: &Circuit, inst: &Instruction) -> MapError {
    MapError::UnroutableCommand {
        name: inst.name().to_string(),
        qubits: inst
            .qubits
            .iter()
            .filter_map(|w| circuit.qubit_label(*w))
            .map(|label| Qubit::from_unit(label.clone()))
            .collect(),
    }
}

/// Route a circuit in place with the given method configurations.
///
/// Qubits start unbound and are placed on first use; pass an explicit
/// mapping through [`MappingManager::route`] to control the initial
/// placement. Returns the output permutation.
pub fn route(
    circuit: &mut Circuit,
    arch: &Architecture,
    configs: &[RoutingConfig],
) -> MapResult<RouteOutcome> {
    let methods: Vec<RoutingMethod> = configs.iter().map(RoutingMethod::from).collect();
    let mut mapping = QubitMapping::new();
    MappingManager::new(arch).route(circuit, &mut mapping, &methods)?;
    Ok(RouteOutcome { mapping })
}
