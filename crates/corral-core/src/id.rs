//! Strongly-typed identifiers and the [`OperationKind`] tag.

use std::fmt;

/// Identifies a declared operation within one operations registry.
///
/// Allocated sequentially by the registry at `add()` time. Ids are only
/// unique within the registry that allocated them; two simulations may
/// both own an `OperationId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OperationId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Simulation step counter.
///
/// Owned by the simulation driver and passed to computes when a derived
/// quantity is requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestep(pub u64);

impl fmt::Display for Timestep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestep {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// The three roles an operation can play in a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Advances the simulation state. Exactly one may be active.
    Integrator,
    /// Produces read-only derived quantities on demand.
    Compute,
    /// Mutates state periodically under the execution loop's control.
    Updater,
}

impl OperationKind {
    /// Lower-case name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Integrator => "integrator",
            Self::Compute => "compute",
            Self::Updater => "updater",
        }
    }

    /// Parse a lower-case kind name as produced by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integrator" => Some(Self::Integrator),
            "compute" => Some(Self::Compute),
            "updater" => Some(Self::Updater),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            OperationKind::Integrator,
            OperationKind::Compute,
            OperationKind::Updater,
        ] {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OperationKind::from_name("analyzer"), None);
    }

    #[test]
    fn ids_order_by_allocation() {
        assert!(OperationId(1) < OperationId(2));
        assert_eq!(OperationId::from(7).to_string(), "7");
        assert_eq!(Timestep::default(), Timestep(0));
    }
}
