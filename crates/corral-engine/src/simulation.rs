//! The simulation driver.
//!
//! [`Simulation`] ties a [`SimulationConfig`], the backend's
//! [`BackendSelector`], the [`Operations`] registry, and (once initialized)
//! the [`SimulationContext`] together. The native execution loop does the
//! stepping; the driver only tracks the current timestep.

use std::sync::Arc;

use corral_backend::{BackendSelector, NativeSystem, ParticleState, Property, SimulationContext};
use corral_core::{OpError, OperationId, Period, Timestep};
use corral_ops::compute::{FREE_VOLUME, SDF};
use corral_ops::{Declared, Sort, Updater};
use tracing::info;

use crate::config::{ConfigError, SimulationConfig};
use crate::declaration::OperationSpec;
use crate::registry::Operations;

/// One simulation: configuration, backend tables, operations, and state.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    selector: BackendSelector,
    operations: Operations,
    context: Option<SimulationContext>,
    timestep: Timestep,
    auto_sort: Option<OperationId>,
}

impl Simulation {
    /// Validate `config` and create an uninitialized simulation.
    pub fn new(config: SimulationConfig, selector: BackendSelector) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            selector,
            operations: Operations::new(),
            context: None,
            timestep: Timestep::default(),
            auto_sort: None,
        })
    }

    /// Create the simulation context. Declares the automatic sorter when
    /// configured. Fails if already initialized.
    pub fn initialize(
        &mut self,
        state: ParticleState,
        system: Arc<dyn NativeSystem>,
    ) -> Result<(), OpError> {
        if self.context.is_some() {
            return Err(OpError::invalid("simulation is already initialized"));
        }
        if let Some(defaults) = &self.config.auto_sort {
            let mut sort = Sort::with_bin_width(defaults.bin_width)?;
            sort.set_period(Period::every(defaults.period)?)?;
            self.auto_sort = Some(self.operations.add(sort));
        }
        info!(
            types = ?state.types(),
            particles = state.n_particles(),
            device = %self.config.device,
            "simulation initialized"
        );
        self.context = Some(SimulationContext::new(state, system));
        Ok(())
    }

    /// Declare an operation.
    pub fn add(&mut self, op: impl Into<Declared>) -> OperationId {
        self.operations.add(op)
    }

    /// Declare an operation from its declarative form.
    pub fn add_spec(&mut self, spec: &OperationSpec) -> Result<OperationId, OpError> {
        self.operations.add_spec(spec)
    }

    /// Attach every operation. Not ready before [`initialize`](Self::initialize).
    pub fn schedule(&mut self) -> Result<(), OpError> {
        self.operations
            .schedule(self.context.as_ref(), &self.selector, &self.config.device)
    }

    /// Push particle type names to every operation.
    pub fn broadcast_types(&mut self) -> Result<(), OpError> {
        self.operations.broadcast_types(self.context.as_ref())
    }

    /// Record that the execution loop ran `steps` more steps.
    pub fn advance(&mut self, steps: u64) -> Result<Timestep, OpError> {
        if self.context.is_none() {
            return Err(OpError::not_ready("advance needs an initialized simulation"));
        }
        self.timestep = Timestep(self.timestep.0.saturating_add(steps));
        Ok(self.timestep)
    }

    /// Evaluate a compute at the current step. `Ok(None)` while detached.
    pub fn read(&self, id: OperationId) -> Result<Option<Property>, OpError> {
        let compute = self
            .operations
            .compute(id)
            .ok_or_else(|| OpError::invalid(format!("no compute with id {id}")))?;
        compute.read(self.timestep)
    }

    /// Free volume from a [`FreeVolume`](corral_ops::FreeVolume) compute.
    pub fn free_volume(&self, id: OperationId) -> Result<Option<f64>, OpError> {
        self.expect_type(id, FREE_VOLUME)?;
        match self.read(id)? {
            Some(Property::Scalar(v)) => Ok(Some(v)),
            Some(Property::Series(_)) => Err(OpError::invalid("free_volume is not a series")),
            None => Ok(None),
        }
    }

    /// Histogram from an [`Sdf`](corral_ops::Sdf) compute.
    pub fn sdf(&self, id: OperationId) -> Result<Option<Vec<f64>>, OpError> {
        self.expect_type(id, SDF)?;
        match self.read(id)? {
            Some(Property::Series(v)) => Ok(Some(v)),
            Some(Property::Scalar(_)) => Err(OpError::invalid("sdf is not a scalar")),
            None => Ok(None),
        }
    }

    fn expect_type(&self, id: OperationId, type_name: &str) -> Result<(), OpError> {
        match self.operations.compute(id) {
            Some(c) if c.type_name() == type_name => Ok(()),
            Some(c) => Err(OpError::invalid(format!(
                "compute {id} is '{}', not '{type_name}'",
                c.type_name()
            ))),
            None => Err(OpError::invalid(format!("no compute with id {id}"))),
        }
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Current timestep.
    pub fn timestep(&self) -> Timestep {
        self.timestep
    }

    /// Id of the automatically declared sorter.
    pub fn auto_sort(&self) -> Option<OperationId> {
        self.auto_sort
    }

    /// Configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Backend dispatch tables.
    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Declared operations.
    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    /// Mutable operations.
    pub fn operations_mut(&mut self) -> &mut Operations {
        &mut self.operations
    }

    /// The context, once initialized.
    pub fn context(&self) -> Option<&SimulationContext> {
        self.context.as_ref()
    }

    /// Mutable context, once initialized.
    pub fn context_mut(&mut self) -> Option<&mut SimulationContext> {
        self.context.as_mut()
    }
}
