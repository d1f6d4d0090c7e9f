//! Identifiers for circuit wires and device nodes.
//!
//! A [`UnitId`] is a register-scoped name: a register string plus an index
//! tuple, totally ordered so that collections of units iterate in a stable
//! order. [`Qubit`] and [`Node`] wrap the same representation but are kept
//! as distinct types: a `Qubit` names a logical wire in a circuit, a `Node`
//! names a physical location on a device. Placement and routing are the only
//! places where one is bound to the other.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default register name for logical qubits.
pub const DEFAULT_QUBIT_REGISTER: &str = "q";
/// Default register name for classical bits.
pub const DEFAULT_CLBIT_REGISTER: &str = "c";
/// Default register name for device nodes.
pub const DEFAULT_NODE_REGISTER: &str = "node";

/// A register name plus an index tuple.
///
/// Ordering is lexicographic on the register name, then on the index tuple,
/// which makes any sorted collection of units deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId {
    register: String,
    index: Vec<u32>,
}

impl UnitId {
    /// Create a unit id from a register name and index tuple.
    pub fn new(register: impl Into<String>, index: impl Into<Vec<u32>>) -> Self {
        Self {
            register: register.into(),
            index: index.into(),
        }
    }

    /// A qubit unit in the default qubit register: `q[i]`.
    pub fn qubit(index: u32) -> Self {
        Self::new(DEFAULT_QUBIT_REGISTER, vec![index])
    }

    /// A classical-bit unit in the default classical register: `c[i]`.
    pub fn clbit(index: u32) -> Self {
        Self::new(DEFAULT_CLBIT_REGISTER, vec![index])
    }

    /// A device-node unit in the default node register: `node[i]`.
    pub fn node(index: u32) -> Self {
        Self::new(DEFAULT_NODE_REGISTER, vec![index])
    }

    /// The register name.
    pub fn register(&self) -> &str {
        &self.register
    }

    /// The index tuple.
    pub fn index(&self) -> &[u32] {
        &self.index
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.register)?;
        for i in &self.index {
            write!(f, "[{i}]")?;
        }
        Ok(())
    }
}

// Units serialize as a `[register, [indices...]]` pair, the format used by
// the architecture and mapping documents.
impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.register)?;
        tup.serialize_element(&self.index)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UnitIdVisitor;

        impl<'de> Visitor<'de> for UnitIdVisitor {
            type Value = UnitId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [register, [indices...]] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<UnitId, A::Error> {
                let register: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let index: Vec<u32> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(UnitId { register, index })
            }
        }

        deserializer.deserialize_tuple(2, UnitIdVisitor)
    }
}

/// A logical wire identifier in a circuit.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Qubit(UnitId);

impl Qubit {
    /// A qubit in the default register: `q[i]`.
    pub fn new(index: u32) -> Self {
        Self(UnitId::qubit(index))
    }

    /// Wrap an arbitrary unit id as a logical qubit.
    pub fn from_unit(unit: UnitId) -> Self {
        Self(unit)
    }

    /// The underlying unit id.
    pub fn unit(&self) -> &UnitId {
        &self.0
    }

    /// Unwrap into the underlying unit id.
    pub fn into_unit(self) -> UnitId {
        self.0
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical location on a device connectivity graph.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Node(UnitId);

impl Node {
    /// A node in the default register: `node[i]`.
    pub fn new(index: u32) -> Self {
        Self(UnitId::node(index))
    }

    /// Wrap an arbitrary unit id as a device node.
    pub fn from_unit(unit: UnitId) -> Self {
        Self(unit)
    }

    /// The underlying unit id.
    pub fn unit(&self) -> &UnitId {
        &self.0
    }

    /// Unwrap into the underlying unit id.
    pub fn into_unit(self) -> UnitId {
        self.0
    }
}

impl From<Qubit> for Node {
    /// Reinterpret an already-physical wire label as a node, keeping the
    /// register and index unchanged.
    fn from(qubit: Qubit) -> Self {
        Self(qubit.0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positional index of a qubit wire within one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Positional index of a classical wire within one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}
