//! The native backend contract.
//!
//! Native objects are opaque: Corral constructs them through the
//! [`BackendSelector`](crate::BackendSelector), pushes live parameter
//! changes into them, and hands them to the [`NativeSystem`]. Any
//! parallelism (threads, accelerator streams) lives below these traits.
//!
//! All methods take `&self`; implementations that need mutation use
//! interior mutability. Handles are `Arc`s because the native system
//! keeps its own reference to the active integrator and to registered
//! updaters while the owning operation stays attached.

use std::sync::Arc;

use corral_core::{
    BackendError, Device, Family, ParamValue, ParameterDict, Period, Timestep, TypeParameter,
};

use crate::context::SimulationContext;

/// Behaviour shared by every native object.
pub trait NativeObject: Send + Sync {
    /// Backend label for logs and errors (e.g. `ComputeSDFSphere`).
    fn label(&self) -> &str;

    /// Push a live parameter change. Called only for keys declared live.
    fn set_param(&self, name: &str, value: &ParamValue) -> Result<(), BackendError>;
}

/// A native integrator.
pub trait NativeIntegrator: NativeObject {
    /// The family this object implements.
    fn family(&self) -> Family;
}

/// A value read back from a native compute.
#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    /// A single number.
    Scalar(f64),
    /// A histogram or other fixed-length series.
    Series(Vec<f64>),
}

/// A native compute. Evaluation is pull-based: the backend never pushes.
pub trait NativeCompute: NativeObject {
    /// Evaluate for `step`. Repeated calls for the same step may be cached.
    fn compute(&self, step: Timestep) -> Result<(), BackendError>;

    /// Read a property produced by the last [`compute`](Self::compute).
    fn property(&self, name: &str) -> Option<Property>;
}

/// A native updater, driven by the execution loop.
pub trait NativeUpdater: NativeObject {
    /// Apply the update for `step`.
    fn update(&self, step: Timestep) -> Result<(), BackendError>;
}

/// Shared handle to a native integrator.
pub type IntegratorHandle = Arc<dyn NativeIntegrator>;
/// Shared handle to a native compute.
pub type ComputeHandle = Arc<dyn NativeCompute>;
/// Shared handle to a native updater.
pub type UpdaterHandle = Arc<dyn NativeUpdater>;

/// Result of constructing a native integrator.
pub struct IntegratorBuild {
    /// The integrator itself.
    pub handle: IntegratorHandle,
    /// Computes created as a by-product (e.g. thermodynamic quantities for
    /// thermostatted methods). The registry keeps them alive.
    pub auxiliary: Vec<ComputeHandle>,
}

impl IntegratorBuild {
    /// An integrator with no auxiliary computes.
    pub fn bare(handle: IntegratorHandle) -> Self {
        Self {
            handle,
            auxiliary: Vec::new(),
        }
    }
}

/// The system-level half of the backend: integrator installation and the
/// periodic execution-loop contract.
///
/// Updaters are keyed by name. The execution loop owns the timer; Corral
/// only issues register/deregister/period directives.
pub trait NativeSystem: Send + Sync {
    /// Install the sole active integrator, replacing any prior one.
    fn set_active_integrator(&self, integrator: IntegratorHandle) -> Result<(), BackendError>;

    /// Uninstall the active integrator. A no-op when none is installed.
    fn clear_active_integrator(&self) -> Result<(), BackendError>;

    /// Start running `updater` under `name` at `period`.
    fn register_periodic(
        &self,
        updater: UpdaterHandle,
        name: &str,
        period: Period,
    ) -> Result<(), BackendError>;

    /// Stop running the updater registered under `name`.
    fn deregister_periodic(&self, name: &str) -> Result<(), BackendError>;

    /// Change the cadence of a registered updater.
    fn set_period(&self, name: &str, period: Period) -> Result<(), BackendError>;

    /// Cadence of a registered updater.
    fn get_period(&self, name: &str) -> Result<Period, BackendError>;
}

/// Everything a backend constructor receives.
#[derive(Clone, Copy)]
pub struct BuildArgs<'a> {
    /// The simulation being attached to.
    pub context: &'a SimulationContext,
    /// The device the simulation runs on.
    pub device: &'a Device,
    /// The operation's current parameter values.
    pub params: &'a ParameterDict,
    /// Per-type parameters, already validated against the context's types.
    pub type_params: &'a [TypeParameter],
    /// Parameter sets of sub-operations (e.g. MD integration methods).
    pub children: &'a [ParameterDict],
    /// The active integrator, for computes that sample through it.
    pub integrator: Option<&'a IntegratorHandle>,
}

impl<'a> BuildArgs<'a> {
    /// Arguments with no type parameters, children, or integrator.
    pub fn new(
        context: &'a SimulationContext,
        device: &'a Device,
        params: &'a ParameterDict,
    ) -> Self {
        Self {
            context,
            device,
            params,
            type_params: &[],
            children: &[],
            integrator: None,
        }
    }

    /// Attach per-type parameters.
    pub fn with_type_params(mut self, type_params: &'a [TypeParameter]) -> Self {
        self.type_params = type_params;
        self
    }

    /// Attach child parameter sets.
    pub fn with_children(mut self, children: &'a [ParameterDict]) -> Self {
        self.children = children;
        self
    }

    /// Attach the active integrator.
    pub fn with_integrator(mut self, integrator: Option<&'a IntegratorHandle>) -> Self {
        self.integrator = integrator;
        self
    }

    /// Look up a type parameter by name.
    pub fn type_param(&self, name: &str) -> Option<&'a TypeParameter> {
        self.type_params.iter().find(|tp| tp.name() == name)
    }
}
