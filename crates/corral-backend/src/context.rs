//! The simulation context operations attach to.

use std::fmt;
use std::sync::Arc;

use corral_core::OpError;
use smallvec::SmallVec;

use crate::native::NativeSystem;

/// Periodic simulation box (triclinic).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimBox {
    /// Box length along x.
    pub lx: f64,
    /// Box length along y.
    pub ly: f64,
    /// Box length along z. Ignored in 2D.
    pub lz: f64,
    /// Tilt factor xy.
    pub xy: f64,
    /// Tilt factor xz.
    pub xz: f64,
    /// Tilt factor yz.
    pub yz: f64,
    /// 2 or 3.
    pub dimensions: u8,
}

impl SimBox {
    /// Cubic 3D box of side `l`.
    pub fn cube(l: f64) -> Self {
        Self {
            lx: l,
            ly: l,
            lz: l,
            xy: 0.0,
            xz: 0.0,
            yz: 0.0,
            dimensions: 3,
        }
    }

    /// Square 2D box of side `l`.
    pub fn square(l: f64) -> Self {
        Self {
            lz: 0.0,
            dimensions: 2,
            ..Self::cube(l)
        }
    }

    /// Volume in 3D, area in 2D. Tilt factors do not change the volume.
    pub fn volume(&self) -> f64 {
        if self.dimensions == 2 {
            self.lx * self.ly
        } else {
            self.lx * self.ly * self.lz
        }
    }

    fn validate(&self) -> Result<(), OpError> {
        if self.dimensions != 2 && self.dimensions != 3 {
            return Err(OpError::invalid(format!(
                "box dimensions must be 2 or 3, got {}",
                self.dimensions
            )));
        }
        let positive = |l: f64| l.is_finite() && l > 0.0;
        if !(positive(self.lx) && positive(self.ly) && (self.dimensions == 2 || positive(self.lz))) {
            return Err(OpError::invalid(format!(
                "box lengths must be finite and positive, got {self:?}"
            )));
        }
        Ok(())
    }
}

/// Live particle state as seen by the control plane.
///
/// Only the metadata operations need for validation and backend
/// construction: particle type names, particle count, and the box. The
/// particle arrays themselves stay in the native backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
    types: SmallVec<[String; 4]>,
    n_particles: usize,
    sim_box: SimBox,
}

impl ParticleState {
    /// Build a state. Type names must be non-empty and unique.
    pub fn new<I, S>(types: I, n_particles: usize, sim_box: SimBox) -> Result<Self, OpError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: SmallVec<[String; 4]> = types.into_iter().map(Into::into).collect();
        if types.is_empty() {
            return Err(OpError::invalid("at least one particle type is required"));
        }
        for (i, t) in types.iter().enumerate() {
            if t.is_empty() {
                return Err(OpError::invalid("particle type names must be non-empty"));
            }
            if types[..i].contains(t) {
                return Err(OpError::invalid(format!("duplicate particle type '{t}'")));
            }
        }
        sim_box.validate()?;
        Ok(Self {
            types,
            n_particles,
            sim_box,
        })
    }

    /// Particle type names in type-id order.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Type id of a type name.
    pub fn type_id(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name)
    }

    /// Number of particles.
    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    /// Current box.
    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    /// Replace the box (e.g. after a box-resize updater ran).
    pub fn set_box(&mut self, sim_box: SimBox) -> Result<(), OpError> {
        sim_box.validate()?;
        self.sim_box = sim_box;
        Ok(())
    }

    /// Update the particle count (e.g. after insertions/removals).
    pub fn set_n_particles(&mut self, n: usize) {
        self.n_particles = n;
    }
}

/// A live simulation: particle state plus the shared native system handle.
///
/// The handle's identity is fixed for the context's lifetime; the state
/// content may change.
pub struct SimulationContext {
    state: ParticleState,
    system: Arc<dyn NativeSystem>,
}

impl SimulationContext {
    /// Bind a state to a native system.
    pub fn new(state: ParticleState, system: Arc<dyn NativeSystem>) -> Self {
        Self { state, system }
    }

    /// Particle state.
    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    /// Mutable particle state.
    pub fn state_mut(&mut self) -> &mut ParticleState {
        &mut self.state
    }

    /// Shorthand for `state().types()`.
    pub fn types(&self) -> &[String] {
        self.state.types()
    }

    /// The native system all operations of this simulation share.
    pub fn system(&self) -> &Arc<dyn NativeSystem> {
        &self.system
    }
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_and_area() {
        assert_eq!(SimBox::cube(2.0).volume(), 8.0);
        assert_eq!(SimBox::square(3.0).volume(), 9.0);
    }

    #[test]
    fn duplicate_types_rejected() {
        let err = ParticleState::new(["A", "A"], 10, SimBox::cube(1.0)).unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));
        assert!(ParticleState::new(Vec::<String>::new(), 0, SimBox::cube(1.0)).is_err());
    }

    #[test]
    fn degenerate_box_rejected() {
        assert!(ParticleState::new(["A"], 1, SimBox::cube(0.0)).is_err());
        assert!(ParticleState::new(["A"], 1, SimBox::square(1.0)).is_ok());
        let mut state = ParticleState::new(["A", "B"], 4, SimBox::cube(1.0)).unwrap();
        assert!(state.set_box(SimBox::cube(f64::NAN)).is_err());
        assert_eq!(state.type_id("B"), Some(1));
    }
}
