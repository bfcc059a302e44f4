//! Simulation context fixtures.

use std::sync::Arc;

use corral_backend::{ParticleState, SimBox, SimulationContext};

use crate::system::MockSystem;

/// Types `A` and `B`, 100 particles, a cubic box of side 10.
pub fn two_type_state() -> ParticleState {
    ParticleState::new(["A", "B"], 100, SimBox::cube(10.0)).expect("fixture state is valid")
}

/// A context over [`two_type_state`] bound to a fresh [`MockSystem`].
pub fn mock_context() -> (SimulationContext, Arc<MockSystem>) {
    let system = MockSystem::new();
    let context = SimulationContext::new(two_type_state(), system.clone());
    (context, system)
}
