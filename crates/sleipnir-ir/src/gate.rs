//! Gate types.

use serde::{Deserialize, Serialize};

/// Built-in gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardGate {
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate.
    T,
    /// T-dagger gate.
    Tdg,
    /// Sqrt(X) gate.
    Sx,
    /// Sqrt(X)-dagger gate.
    Sxdg,
    /// X-rotation gate (1 angle parameter).
    Rx,
    /// Y-rotation gate (1 angle parameter).
    Ry,
    /// Z-rotation gate (1 angle parameter).
    Rz,
    /// Phase gate (1 angle parameter).
    Phase,
    /// Universal single-qubit gate (3 angle parameters).
    U,
    /// Controlled-NOT gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// Controlled Z-rotation gate (1 angle parameter).
    CRz,
    /// Controlled phase gate (1 angle parameter).
    CPhase,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// XX-rotation gate (1 angle parameter).
    Rxx,
    /// YY-rotation gate (1 angle parameter).
    Ryy,
    /// ZZ-rotation gate (1 angle parameter).
    Rzz,
    /// Distance-2 CX: control and target separated by one intermediate
    /// node, which is restored to its input state. Inserted by routing as
    /// an alternative to SWAP insertion.
    Bridge,
    /// Toffoli (CCNOT) gate.
    CCX,
    /// Controlled-SWAP (Fredkin) gate.
    CSwap,
}

impl StandardGate {
    /// Lowercase gate name.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Sx => "sx",
            StandardGate::Sxdg => "sxdg",
            StandardGate::Rx => "rx",
            StandardGate::Ry => "ry",
            StandardGate::Rz => "rz",
            StandardGate::Phase => "p",
            StandardGate::U => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::CRz => "crz",
            StandardGate::CPhase => "cp",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::Rxx => "rxx",
            StandardGate::Ryy => "ryy",
            StandardGate::Rzz => "rzz",
            StandardGate::Bridge => "bridge",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Number of qubits the gate acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::H
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::Sx
            | StandardGate::Sxdg
            | StandardGate::Rx
            | StandardGate::Ry
            | StandardGate::Rz
            | StandardGate::Phase
            | StandardGate::U => 1,
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::CRz
            | StandardGate::CPhase
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::Rxx
            | StandardGate::Ryy
            | StandardGate::Rzz => 2,
            StandardGate::Bridge | StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Number of angle parameters the gate expects.
    pub fn num_params(&self) -> u32 {
        match self {
            StandardGate::Rx
            | StandardGate::Ry
            | StandardGate::Rz
            | StandardGate::Phase
            | StandardGate::CRz
            | StandardGate::CPhase
            | StandardGate::Rxx
            | StandardGate::Ryy
            | StandardGate::Rzz => 1,
            StandardGate::U => 3,
            _ => 0,
        }
    }

    /// Whether a two-qubit gate acts identically under argument exchange.
    ///
    /// Directed gates (CX and friends) distinguish control from target;
    /// symmetric interactions do not. Single- and three-qubit gates return
    /// false.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            StandardGate::CZ
                | StandardGate::CPhase
                | StandardGate::Swap
                | StandardGate::ISwap
                | StandardGate::Rxx
                | StandardGate::Ryy
                | StandardGate::Rzz
        )
    }
}

/// A user-defined gate, known only by name and arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// Gate name.
    pub name: String,
    /// Number of qubits the gate acts on.
    pub num_qubits: u32,
}

impl CustomGate {
    /// Create a custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
        }
    }
}

/// The kind of a gate: built-in or user-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A built-in gate.
    Standard(StandardGate),
    /// A user-defined gate.
    Custom(CustomGate),
}

/// A gate with its angle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The gate kind.
    pub kind: GateKind,
    /// Angle parameters, in radians.
    pub params: Vec<f64>,
}

impl Gate {
    /// A parameter-free standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            params: vec![],
        }
    }

    /// A standard gate with angle parameters.
    pub fn with_params(gate: StandardGate, params: impl Into<Vec<f64>>) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            params: params.into(),
        }
    }

    /// A custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            params: vec![],
        }
    }

    /// Gate name.
    pub fn name(&self) -> &str {
        match &self.kind {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Number of qubits the gate acts on.
    pub fn num_qubits(&self) -> u32 {
        match &self.kind {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }

    /// The standard gate, if this is one.
    pub fn as_standard(&self) -> Option<StandardGate> {
        match &self.kind {
            GateKind::Standard(g) => Some(*g),
            GateKind::Custom(_) => None,
        }
    }

    /// Whether a two-qubit gate acts identically under argument exchange.
    /// Custom gates are conservatively treated as directed.
    pub fn is_symmetric(&self) -> bool {
        match &self.kind {
            GateKind::Standard(g) => g.is_symmetric(),
            GateKind::Custom(_) => false,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gate_arity() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::Bridge.num_qubits(), 3);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);
    }

    #[test]
    fn test_symmetry() {
        assert!(StandardGate::CZ.is_symmetric());
        assert!(StandardGate::Swap.is_symmetric());
        assert!(!StandardGate::CX.is_symmetric());
        assert!(!StandardGate::H.is_symmetric());
    }

    #[test]
    fn test_gate_params() {
        let gate = Gate::with_params(StandardGate::Rz, [0.5]);
        assert_eq!(gate.name(), "rz");
        assert_eq!(gate.params, vec![0.5]);
        assert_eq!(StandardGate::U.num_params(), 3);
    }

    #[test]
    fn test_custom_gate() {
        let gate = Gate::custom(CustomGate::new("echo", 2));
        assert_eq!(gate.name(), "echo");
        assert_eq!(gate.num_qubits(), 2);
        assert!(!gate.is_symmetric());
    }
}
