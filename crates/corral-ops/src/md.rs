//! Molecular dynamics integrator and its integration methods.

use corral_backend::{BuildArgs, ComputeHandle, IntegratorHandle};
use corral_core::{
    Family, OpError, OperationId, OperationKind, ParamValue, ParameterDict,
};
use tracing::warn;

use crate::attachment::{AttachState, OpCore};
use crate::operation::{AttachContext, Declared, Integrator, Operation};

/// Dispatch key of the MD integrator.
pub const MD: &str = "md";

/// One integration method applied by the MD integrator.
#[derive(Clone, Debug, PartialEq)]
pub enum MdMethod {
    /// Constant energy (velocity Verlet).
    Nve,
    /// Nosé-Hoover thermostat at temperature `kt` with coupling time `tau`.
    Nvt {
        /// Temperature in energy units.
        kt: f64,
        /// Thermostat coupling time.
        tau: f64,
    },
    /// Langevin dynamics at temperature `kt`.
    Langevin {
        /// Temperature in energy units.
        kt: f64,
        /// Random number seed.
        seed: i64,
    },
}

impl MdMethod {
    /// Method name as seen by the backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nve => "nve",
            Self::Nvt { .. } => "nvt",
            Self::Langevin { .. } => "langevin",
        }
    }

    /// Whether the method controls temperature (and so needs a
    /// thermodynamic compute on the backend).
    pub fn is_thermostatted(&self) -> bool {
        !matches!(self, Self::Nve)
    }

    /// Parameter set handed to the backend as a child of the integrator.
    pub fn to_params(&self) -> ParameterDict {
        let mut params = ParameterDict::new();
        params.declare_value("method", false, self.name());
        match *self {
            Self::Nve => {}
            Self::Nvt { kt, tau } => {
                params.declare_value("kT", false, kt);
                params.declare_value("tau", false, tau);
            }
            Self::Langevin { kt, seed } => {
                params.declare_value("kT", false, kt);
                params.declare_value("seed", false, seed);
            }
        }
        params
    }

    fn validate(&self) -> Result<(), OpError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(OpError::invalid(format!(
                    "{} {name} must be finite and positive, got {v}",
                    self.name()
                )))
            }
        };
        match *self {
            Self::Nve => Ok(()),
            Self::Nvt { kt, tau } => {
                positive("kT", kt)?;
                positive("tau", tau)
            }
            Self::Langevin { kt, .. } => positive("kT", kt),
        }
    }
}

fn check_dt(value: &ParamValue) -> Result<(), OpError> {
    match value.as_float() {
        Some(dt) if !(dt.is_finite() && dt > 0.0) => Err(OpError::invalid(format!(
            "dt must be finite and positive, got {dt}"
        ))),
        _ => Ok(()),
    }
}

/// Molecular dynamics with a list of integration methods.
///
/// The time step `dt` is live. Methods are structural and can only change
/// while detached. Thermostatted methods make the backend build auxiliary
/// thermodynamic computes, which the registry keeps alive.
pub struct MdIntegrator {
    core: OpCore<IntegratorHandle>,
    methods: Vec<MdMethod>,
}

impl MdIntegrator {
    /// A detached integrator with time step `dt` and no methods. `dt` must
    /// be finite and positive.
    pub fn new(dt: f64) -> Result<Self, OpError> {
        check_dt(&ParamValue::Float(dt))?;
        let mut params = ParameterDict::new();
        params.declare_value("dt", true, dt);
        Ok(Self {
            core: OpCore::new(OperationKind::Integrator, MD, params),
            methods: Vec::new(),
        })
    }

    /// Append an integration method.
    pub fn add_method(&mut self, method: MdMethod) -> Result<&mut Self, OpError> {
        self.core.require_detached("integration methods")?;
        method.validate()?;
        self.methods.push(method);
        Ok(self)
    }

    /// Builder form of [`add_method`](Self::add_method).
    pub fn with_method(mut self, method: MdMethod) -> Result<Self, OpError> {
        self.add_method(method)?;
        Ok(self)
    }

    /// Remove every integration method.
    pub fn clear_methods(&mut self) -> Result<(), OpError> {
        self.core.require_detached("integration methods")?;
        self.methods.clear();
        Ok(())
    }

    /// The configured methods, in application order.
    pub fn methods(&self) -> &[MdMethod] {
        &self.methods
    }
}

impl Operation for MdIntegrator {
    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn type_name(&self) -> &'static str {
        self.core.type_name()
    }

    fn id(&self) -> Option<OperationId> {
        self.core.id()
    }

    fn assign_id(&mut self, id: OperationId) {
        self.core.assign_id(id);
    }

    fn params(&self) -> &ParameterDict {
        self.core.params()
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError> {
        if name == "dt" {
            check_dt(&value)?;
        }
        self.core.set_param(name, value)
    }

    fn state(&self) -> AttachState {
        self.core.state()
    }

    fn detach(&mut self) -> Result<(), OpError> {
        self.core.release();
        Ok(())
    }
}

impl Integrator for MdIntegrator {
    fn family(&self) -> Family {
        Family::Md
    }

    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<Vec<ComputeHandle>, OpError> {
        self.detach()?;
        self.core.params().require_complete()?;
        if self.methods.is_empty() {
            warn!(integrator = %self.core.label(), "no integration methods; particles will not move");
        }
        let ctor = ctx.selector.integrator(MD, Family::Md, ctx.device.class())?;
        let children: Vec<ParameterDict> = self.methods.iter().map(MdMethod::to_params).collect();
        let args = BuildArgs::new(ctx.context, ctx.device, self.core.params())
            .with_children(&children);
        let build = (**ctor)(&args)?;
        self.core.install(build.handle);
        Ok(build.auxiliary)
    }

    fn handle(&self) -> Option<&IntegratorHandle> {
        self.core.handle()
    }
}

impl From<MdIntegrator> for Declared {
    fn from(op: MdIntegrator) -> Self {
        Declared::Integrator(Box::new(op))
    }
}
