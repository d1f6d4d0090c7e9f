//! Sleipnir qubit placement and routing engine.
//!
//! This crate transforms circuits so they respect a device's connectivity
//! constraints: every two-qubit gate in the output acts on a pair of nodes
//! joined by an edge of the target [`Architecture`].
//!
//! # Pipeline
//!
//! ```text
//! Input Circuit + Architecture
//!       │
//!       ├── GraphPlacement   weighted-subgraph-monomorphism search for an
//!       │                    initial logical → physical assignment
//!       │
//!       └── MappingManager   walks commands in order; blocked two-qubit
//!                            gates dispatch to routing methods (LexiRoute,
//!                            TokenSwap, custom) that insert SWAP/BRIDGE
//!                            commands and update the mapping
//!       │
//!       ▼
//! Output Circuit (legal on the architecture) + output permutation
//! ```
//!
//! The engine is synchronous and deterministic: identical circuit,
//! architecture, and configuration always produce identical output. Search
//! budgets are node counts rather than timeouts for the same reason.
//!
//! # Example
//!
//! ```rust
//! use sleipnir_ir::{Circuit, QubitId};
//! use sleipnir_map::{Architecture, PassManager, PropertySet};
//!
//! let arch = Architecture::line(5);
//! let mut circuit = Circuit::with_size("demo", 5, 0);
//! circuit.cx(QubitId(0), QubitId(3)).unwrap();
//! circuit.cx(QubitId(2), QubitId(4)).unwrap();
//!
//! let mut props = PropertySet::new().with_architecture(arch.clone());
//! PassManager::standard().run(&mut circuit, &mut props).unwrap();
//!
//! for inst in circuit.instructions() {
//!     if inst.is_two_qubit_gate() {
//!         let args: Vec<_> = inst
//!             .qubits
//!             .iter()
//!             .map(|w| sleipnir_ir::Node::from_unit(circuit.qubit_label(*w).unwrap().clone()))
//!             .collect();
//!         assert!(arch.valid_operation(&args));
//!     }
//! }
//! ```

pub mod architecture;
pub mod error;
pub mod mapping;
pub mod pass;
pub mod placement;
pub mod routing;
pub mod token_swapper;

mod slices;

pub use architecture::Architecture;
pub use error::{MapError, MapResult};
pub use mapping::QubitMapping;
pub use pass::{
    Pass, PassConfig, PassManager, PipelineConfig, PlacementPass, PropertySet, RoutingPass,
};
pub use placement::{GraphPlacement, PlacementConfig, PlacementOutcome, place};
pub use routing::manager::{MappingManager, RouteOutcome, route};
pub use routing::{CustomRoutingMethod, RoutingConfig, RoutingMethod};
pub use token_swapper::TokenSwapper;
