//! The operation trait family.
//!
//! Every operation implements [`Operation`]. The kind-specific traits
//! ([`Integrator`], [`Compute`], [`Updater`]) add attachment and the
//! behaviour the registry drives. [`Declared`] is the closed set the
//! registry accepts.

use corral_backend::{
    BackendSelector, ComputeHandle, IntegratorHandle, NativeObject, Property, SimulationContext,
    UpdaterHandle,
};
use corral_core::{
    Device, Family, OpError, OperationId, OperationKind, ParamValue, ParameterDict, Period,
    Timestep,
};

use crate::attachment::{self, AttachState};
use crate::periodic::{PeriodicControl, Toggle};

/// The integrator currently installed on the native system.
#[derive(Clone)]
pub struct ActiveIntegrator {
    /// Its family.
    pub family: Family,
    /// Its native handle.
    pub handle: IntegratorHandle,
}

impl std::fmt::Debug for ActiveIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveIntegrator")
            .field("family", &self.family)
            .field("handle", &self.handle.label())
            .finish()
    }
}

/// What an attach call may consult.
#[derive(Clone, Copy)]
pub struct AttachContext<'a> {
    /// The live simulation.
    pub context: &'a SimulationContext,
    /// Backend dispatch tables.
    pub selector: &'a BackendSelector,
    /// The device the simulation runs on.
    pub device: &'a Device,
    /// The active integrator, if one is installed.
    pub integrator: Option<&'a ActiveIntegrator>,
}

impl<'a> AttachContext<'a> {
    /// Context with no active integrator.
    pub fn new(
        context: &'a SimulationContext,
        selector: &'a BackendSelector,
        device: &'a Device,
    ) -> Self {
        Self {
            context,
            selector,
            device,
            integrator: None,
        }
    }

    /// Set the active integrator.
    pub fn with_integrator(mut self, integrator: Option<&'a ActiveIntegrator>) -> Self {
        self.integrator = integrator;
        self
    }

    /// Family of the active integrator.
    pub fn family(&self) -> Option<Family> {
        self.integrator.map(|i| i.family)
    }
}

/// Behaviour common to every operation.
pub trait Operation: Send {
    /// Which of the three variants this is.
    fn kind(&self) -> OperationKind;

    /// Logical name, also the backend dispatch key (e.g. `"sdf"`).
    fn type_name(&self) -> &'static str;

    /// Registry-assigned id, `None` until added.
    fn id(&self) -> Option<OperationId>;

    /// Called once by the registry on `add`.
    fn assign_id(&mut self, id: OperationId);

    /// Staged parameters.
    fn params(&self) -> &ParameterDict;

    /// Write a parameter. While attached only live keys are accepted and
    /// they are pushed to the native object immediately.
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError>;

    /// Receive the simulation's particle type names and validate
    /// type-indexed parameters against them.
    fn cache_types(&mut self, _types: &[String]) -> Result<(), OpError> {
        Ok(())
    }

    /// Current attachment state.
    fn state(&self) -> AttachState;

    /// Whether attached.
    fn is_attached(&self) -> bool {
        self.state() == AttachState::Attached
    }

    /// Release backend resources. No-op when detached.
    fn detach(&mut self) -> Result<(), OpError>;

    /// `type_name#id` label used in logs and backend registration.
    fn label(&self) -> String {
        attachment::label(self.type_name(), self.id())
    }
}

/// The single integration scheme of a simulation.
pub trait Integrator: Operation {
    /// The family this integrator implements.
    fn family(&self) -> Family;

    /// Build the native integrator. Returns the auxiliary computes the
    /// backend created alongside it. The caller installs the handle.
    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<Vec<ComputeHandle>, OpError>;

    /// The native handle, when attached.
    fn handle(&self) -> Option<&IntegratorHandle>;

    /// Family and handle, when attached.
    fn active(&self) -> Option<ActiveIntegrator> {
        self.handle().map(|handle| ActiveIntegrator {
            family: self.family(),
            handle: handle.clone(),
        })
    }
}

/// A derived quantity evaluated on demand.
pub trait Compute: Operation {
    /// Build the native compute against the active integrator.
    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError>;

    /// The native handle, when attached.
    fn handle(&self) -> Option<&ComputeHandle>;

    /// Name of the property this compute produces.
    fn property_name(&self) -> &'static str;

    /// Evaluate at `step` and read the property. `Ok(None)` when detached.
    fn read(&self, step: Timestep) -> Result<Option<Property>, OpError> {
        let Some(handle) = self.handle() else {
            return Ok(None);
        };
        handle.compute(step)?;
        Ok(handle.property(self.property_name()))
    }
}

/// A periodic state modification.
pub trait Updater: Operation {
    /// Build the native updater and bind it to the execution loop.
    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError>;

    /// The native handle, when attached.
    fn handle(&self) -> Option<&UpdaterHandle>;

    /// Schedule control.
    fn periodic(&self) -> &PeriodicControl;

    /// Mutable schedule control.
    fn periodic_mut(&mut self) -> &mut PeriodicControl;

    /// See [`PeriodicControl::enable`].
    fn enable(&mut self) -> Result<Toggle, OpError> {
        self.periodic_mut().enable()
    }

    /// See [`PeriodicControl::disable`].
    fn disable(&mut self) -> Result<Toggle, OpError> {
        self.periodic_mut().disable()
    }

    /// See [`PeriodicControl::set_period`].
    fn set_period(&mut self, period: Period) -> Result<(), OpError> {
        self.periodic_mut().set_period(period)
    }

    /// See [`PeriodicControl::period`].
    fn period(&self) -> Result<Period, OpError> {
        self.periodic().period()
    }
}

/// A declared operation, ready for the registry.
pub enum Declared {
    /// An integrator.
    Integrator(Box<dyn Integrator>),
    /// A compute.
    Compute(Box<dyn Compute>),
    /// An updater.
    Updater(Box<dyn Updater>),
}

impl Declared {
    /// Which variant this is.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Integrator(_) => OperationKind::Integrator,
            Self::Compute(_) => OperationKind::Compute,
            Self::Updater(_) => OperationKind::Updater,
        }
    }

    /// Logical name of the wrapped operation.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integrator(op) => op.type_name(),
            Self::Compute(op) => op.type_name(),
            Self::Updater(op) => op.type_name(),
        }
    }

    /// Label of the wrapped operation.
    pub fn label(&self) -> String {
        match self {
            Self::Integrator(op) => op.label(),
            Self::Compute(op) => op.label(),
            Self::Updater(op) => op.label(),
        }
    }

    /// Write a parameter on the wrapped operation.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError> {
        match self {
            Self::Integrator(op) => op.set_param(name, value),
            Self::Compute(op) => op.set_param(name, value),
            Self::Updater(op) => op.set_param(name, value),
        }
    }
}

impl std::fmt::Debug for Declared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Declared")
            .field(&self.kind())
            .field(&self.label())
            .finish()
    }
}
