//! Corral: the control plane of a particle simulation.
//!
//! Corral decides which operations a simulation runs (one integrator,
//! any number of computes and updaters), binds each of them to a native
//! backend implementation for the active integrator family and device,
//! and keeps periodic updaters registered with the backend's execution
//! loop. The numerical kernels themselves live behind the
//! [`backend::NativeSystem`] and native object traits.
//!
//! This is the facade crate that re-exports the public API of every
//! Corral sub-crate.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use corral::prelude::*;
//! use corral::backend::{BuildArgs, IntegratorBuild, NativeIntegrator, NativeObject};
//! use corral::types::{BackendError, DeviceClass, ParamValue, Timestep};
//!
//! // The execution loop: accepts every directive and does nothing.
//! struct Loop;
//! impl NativeSystem for Loop {
//!     fn set_active_integrator(&self, _: IntegratorHandle) -> Result<(), BackendError> { Ok(()) }
//!     fn clear_active_integrator(&self) -> Result<(), BackendError> { Ok(()) }
//!     fn register_periodic(&self, _: UpdaterHandle, _: &str, _: Period) -> Result<(), BackendError> { Ok(()) }
//!     fn deregister_periodic(&self, _: &str) -> Result<(), BackendError> { Ok(()) }
//!     fn set_period(&self, _: &str, _: Period) -> Result<(), BackendError> { Ok(()) }
//!     fn get_period(&self, _: &str) -> Result<Period, BackendError> { Period::every(1).map_err(|e| BackendError::new("Loop", e.to_string())) }
//! }
//!
//! // A native HPMC sphere integrator.
//! struct Spheres;
//! impl NativeObject for Spheres {
//!     fn label(&self) -> &str { "Spheres" }
//!     fn set_param(&self, _: &str, _: &ParamValue) -> Result<(), BackendError> { Ok(()) }
//! }
//! impl NativeIntegrator for Spheres {
//!     fn family(&self) -> Family { Family::Hpmc(Shape::Sphere) }
//! }
//!
//! let mut selector = BackendSelector::new();
//! selector.register_integrator("hpmc", Family::Hpmc(Shape::Sphere), DeviceClass::Host, |_: &BuildArgs<'_>| {
//!     Ok(IntegratorBuild::bare(Arc::new(Spheres)))
//! });
//!
//! let mut config = SimulationConfig::default();
//! config.auto_sort = None;
//! let mut sim = Simulation::new(config, selector).unwrap();
//! let state = ParticleState::new(["A"], 64, SimBox::cube(8.0)).unwrap();
//! sim.initialize(state, Arc::new(Loop)).unwrap();
//!
//! let mut hpmc = HpmcIntegrator::new(Shape::Sphere, 1);
//! hpmc.set_diameter("A", 1.0).unwrap();
//! sim.add(hpmc);
//! sim.schedule().unwrap();
//! assert!(sim.operations().integrator().unwrap().is_attached());
//! assert_eq!(sim.advance(100).unwrap(), Timestep(100));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `corral-core` | Ids, devices, families, parameters, periods, errors |
//! | [`backend`] | `corral-backend` | Native object traits, context, backend selector |
//! | [`ops`] | `corral-ops` | Integrators, computes, updaters, periodic control |
//! | [`engine`] | `corral-engine` | Operations registry, configuration, simulation driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and errors (`corral-core`).
///
/// Contains [`types::OperationId`], [`types::Device`], [`types::Family`],
/// the parameter containers, [`types::Period`], and [`types::OpError`].
pub use corral_core as types;

/// Native backend contract and backend selection (`corral-backend`).
///
/// The [`backend::BackendSelector`] maps `(operation, family, device)` to
/// constructors; the native traits are what a backend implements.
pub use corral_backend as backend;

/// Operations (`corral-ops`).
///
/// [`ops::HpmcIntegrator`], [`ops::MdIntegrator`], [`ops::FreeVolume`],
/// [`ops::Sdf`], [`ops::Sort`], [`ops::RescaleTemp`], and
/// [`ops::ZeroMomentum`], plus the traits they implement.
pub use corral_ops as ops;

/// Registry and simulation driver (`corral-engine`).
pub use corral_engine as engine;

/// Common imports for typical Corral usage.
///
/// ```rust
/// use corral::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use corral_core::{Device, Family, OperationId, Period, Shape};

    // Errors
    pub use corral_core::{OpError, ParamError, UnsupportedConfig};

    // Backend
    pub use corral_backend::{
        BackendSelector, FamilyKey, IntegratorHandle, NativeSystem, ParticleState, Property,
        SimBox, UpdaterHandle,
    };

    // Operations
    pub use corral_ops::{
        Compute, FreeVolume, HpmcIntegrator, Integrator, MdIntegrator, MdMethod, Operation,
        RescaleTemp, Sdf, Sort, Toggle, Updater, ZeroMomentum,
    };

    // Engine
    pub use corral_engine::{OperationSpec, Operations, Simulation, SimulationConfig};
}
