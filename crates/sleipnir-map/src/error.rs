//! Error types for placement and routing.

use sleipnir_ir::{IrError, Node, Qubit};
use thiserror::Error;

/// Errors that can occur during placement and routing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapError {
    /// Malformed architecture input, detected at construction.
    #[error("Invalid architecture: {reason}")]
    InvalidArchitecture {
        /// What was wrong with the input.
        reason: String,
    },

    /// A node was queried that the architecture does not contain.
    #[error("Node {node} not found in architecture")]
    NodeNotFound {
        /// The missing node.
        node: Node,
    },

    /// Two nodes lie in different connected components.
    #[error("No path between {from} and {to} in architecture")]
    Unreachable {
        /// Source node.
        from: Node,
        /// Destination node.
        to: Node,
    },

    /// A token-swapping target cannot be realized on its region.
    #[error("Token permutation is unrealizable on a disconnected region")]
    Infeasible,

    /// More logical qubits than the architecture has nodes.
    #[error("Circuit needs {required} nodes but architecture has {available}")]
    CapacityExceeded {
        /// Number of logical qubits to place.
        required: usize,
        /// Number of architecture nodes.
        available: usize,
    },

    /// No configured routing method could handle a blocked command.
    #[error("No routing method can handle command '{name}' on {qubits:?}")]
    UnroutableCommand {
        /// Name of the blocked command.
        name: String,
        /// The command's qubit arguments.
        qubits: Vec<Qubit>,
    },

    /// Interaction-graph weighting met a wider-than-two-qubit gate.
    #[error("Gate '{name}' acts on more than two qubits; decompose before placement")]
    PatternTooWide {
        /// Name of the offending gate.
        name: String,
    },

    /// A mapping entry required by routing is missing or inconsistent.
    #[error("Qubit {qubit} has no usable mapping entry")]
    UnplacedQubit {
        /// The unplaced qubit.
        qubit: Qubit,
    },

    /// A pass ran without an architecture in its property set.
    #[error("No architecture available for pass '{pass}'")]
    MissingArchitecture {
        /// The pass that needed it.
        pass: String,
    },

    /// Underlying circuit error.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result type for placement and routing operations.
pub type MapResult<T> = Result<T, MapError>;
