//! Native backend contract and backend selection for Corral.
//!
//! Everything Corral knows about the compute backend is expressed here:
//!
//! - [`native`]: the traits native objects and the native system implement
//!   (active-integrator installation, the periodic execution-loop contract,
//!   pull-based compute evaluation).
//! - [`context`]: the [`SimulationContext`] operations attach to.
//! - [`selector`]: the explicit `(operation, family, device) → constructor`
//!   dispatch tables populated by the backend at startup.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod native;
pub mod selector;

pub use context::{ParticleState, SimBox, SimulationContext};
pub use native::{
    BuildArgs, ComputeHandle, IntegratorBuild, IntegratorHandle, NativeCompute, NativeIntegrator,
    NativeObject, NativeSystem, NativeUpdater, Property, UpdaterHandle,
};
pub use selector::{
    BackendSelector, ComputeCtor, DispatchTable, FamilyKey, IntegratorCtor, UpdaterCtor,
};
