//! Sleipnir circuit intermediate representation.
//!
//! This crate provides the circuit data structures consumed by the Sleipnir
//! placement and routing engine (`sleipnir-map`). The engine needs only a
//! narrow interface, and that is what this crate provides:
//!
//! - iterate commands in a commutation-respecting (topological) order;
//! - query the qubit and classical-bit wire lists;
//! - append a command at the logical end;
//! - rename a qubit wire label in place.
//!
//! # Wires and labels
//!
//! Instructions address wires positionally through [`QubitId`]/[`ClbitId`].
//! Each wire carries a [`UnitId`] label — a register name plus index tuple —
//! owned by the [`Circuit`]. A logical wire starts life labelled `q[i]`;
//! placement and routing rebind it to a device node label such as `node[3]`
//! by rewriting the label table, never the instructions.
//!
//! # Example
//!
//! ```rust
//! use sleipnir_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! assert_eq!(circuit.num_ops(), 2);
//! assert_eq!(circuit.depth(), 2);
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod unit;

pub use circuit::Circuit;
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use unit::{ClbitId, Node, Qubit, QubitId, UnitId};
