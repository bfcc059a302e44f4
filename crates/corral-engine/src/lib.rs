//! Operations registry and simulation driver for Corral.
//!
//! [`Operations`] holds what a simulation has declared (at most one
//! integrator, any number of computes and updaters) and attaches it all
//! in dependency order. [`Simulation`] wraps the registry together with
//! its [`SimulationConfig`], the backend's dispatch tables, and the
//! simulation context created at initialization.
//!
//! Operations can be declared either as typed values or through the
//! untyped [`OperationSpec`] form.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod declaration;
pub mod logging;
pub mod registry;
pub mod simulation;

pub use config::{ConfigError, SimulationConfig, SortDefaults};
pub use declaration::OperationSpec;
pub use registry::Operations;
pub use simulation::Simulation;
