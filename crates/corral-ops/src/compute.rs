//! HPMC analysis computes: free volume and the scale distribution function.
//!
//! Both sample through the active HPMC integrator, so attach fails with
//! [`UnsupportedConfig`] when no integrator is installed or the installed
//! one is not HPMC. A detached compute reads as `None`.

use corral_backend::{BuildArgs, ComputeHandle, Property};
use corral_core::{
    FamilyClass, OpError, OperationId, OperationKind, ParamError, ParamValue, ParameterDict,
    Timestep, UnsupportedConfig,
};

use crate::attachment::{AttachState, OpCore};
use crate::operation::{ActiveIntegrator, AttachContext, Compute, Declared, Operation};

/// Dispatch key and property name of [`FreeVolume`].
pub const FREE_VOLUME: &str = "free_volume";
/// Dispatch key and property name of [`Sdf`].
pub const SDF: &str = "sdf";

/// The active integrator, if it is HPMC.
fn require_hpmc<'a>(
    ctx: &AttachContext<'a>,
    operation: &str,
) -> Result<&'a ActiveIntegrator, UnsupportedConfig> {
    let Some(active) = ctx.integrator else {
        return Err(UnsupportedConfig::MissingIntegrator {
            operation: operation.to_string(),
            required: FamilyClass::Hpmc,
        });
    };
    if !active.family.is(FamilyClass::Hpmc) {
        return Err(UnsupportedConfig::WrongIntegrator {
            operation: operation.to_string(),
            required: FamilyClass::Hpmc,
            found: active.family,
        });
    }
    Ok(active)
}

fn invalid(name: &str, reason: String) -> OpError {
    ParamError::InvalidValue {
        name: name.to_string(),
        reason,
    }
    .into()
}

// ── FreeVolume ─────────────────────────────────────────────────────

/// Monte Carlo estimate of the free volume available to a test particle.
///
/// Parameters: `test_particle_type` (a known particle type) and
/// `num_samples` (positive). Property: `free_volume` (scalar).
pub struct FreeVolume {
    core: OpCore<ComputeHandle>,
}

impl FreeVolume {
    /// A detached free-volume compute.
    pub fn new(test_particle_type: &str, num_samples: i64) -> Self {
        let mut params = ParameterDict::new();
        params.declare_value("test_particle_type", false, test_particle_type);
        params.declare_value("num_samples", false, num_samples);
        Self {
            core: OpCore::new(OperationKind::Compute, FREE_VOLUME, params),
        }
    }

    /// Evaluate and read the free volume. `None` when detached.
    pub fn free_volume(&self, step: Timestep) -> Result<Option<f64>, OpError> {
        match self.read(step)? {
            Some(Property::Scalar(v)) => Ok(Some(v)),
            Some(Property::Series(_)) => Err(OpError::invalid(
                "backend returned a series for free_volume",
            )),
            None => Ok(None),
        }
    }

    fn check_test_type(&self, types: &[String]) -> Result<(), OpError> {
        let test_type = self.core.params().str("test_particle_type")?;
        if !types.iter().any(|t| t == test_type) {
            return Err(ParamError::UnknownType {
                name: "test_particle_type".into(),
                type_name: test_type.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Operation for FreeVolume {
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
        self.core.set_param(name, value)
    }

    fn cache_types(&mut self, types: &[String]) -> Result<(), OpError> {
        self.check_test_type(types)
    }

    fn state(&self) -> AttachState {
        self.core.state()
    }

    fn detach(&mut self) -> Result<(), OpError> {
        self.core.release();
        Ok(())
    }
}

impl Compute for FreeVolume {
    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError> {
        self.detach()?;
        let active = require_hpmc(ctx, FREE_VOLUME)?;
        self.core.params().require_complete()?;
        self.check_test_type(ctx.context.types())?;
        let samples = self.core.params().int("num_samples")?;
        if samples <= 0 {
            return Err(invalid("num_samples", format!("must be positive, got {samples}")));
        }
        let ctor = ctx
            .selector
            .compute(FREE_VOLUME, Some(active.family), ctx.device.class())?;
        let args = BuildArgs::new(ctx.context, ctx.device, self.core.params())
            .with_integrator(Some(&active.handle));
        let handle = (**ctor)(&args)?;
        self.core.install(handle);
        Ok(())
    }

    fn handle(&self) -> Option<&ComputeHandle> {
        self.core.handle()
    }

    fn property_name(&self) -> &'static str {
        FREE_VOLUME
    }
}

impl From<FreeVolume> for Declared {
    fn from(op: FreeVolume) -> Self {
        Declared::Compute(Box::new(op))
    }
}

// ── Sdf ────────────────────────────────────────────────────────────

/// Scale distribution function: a histogram of the scale factors at
/// which particle pairs first overlap, used to measure pressure in
/// hard-particle systems.
///
/// Parameters: `xmax` (histogram extent) and `dx` (bin width), with
/// `0 < dx < xmax`. Property: `sdf` (one value per bin).
pub struct Sdf {
    core: OpCore<ComputeHandle>,
}

impl Sdf {
    /// A detached SDF compute.
    pub fn new(xmax: f64, dx: f64) -> Self {
        let mut params = ParameterDict::new();
        params.declare_value("xmax", false, xmax);
        params.declare_value("dx", false, dx);
        Self {
            core: OpCore::new(OperationKind::Compute, SDF, params),
        }
    }

    /// Number of histogram bins for the current parameters.
    pub fn bins(&self) -> Result<usize, OpError> {
        let (xmax, dx) = self.validated()?;
        Ok((xmax / dx).ceil() as usize)
    }

    /// Evaluate and read the histogram. `None` when detached.
    pub fn sdf(&self, step: Timestep) -> Result<Option<Vec<f64>>, OpError> {
        match self.read(step)? {
            Some(Property::Series(v)) => Ok(Some(v)),
            Some(Property::Scalar(_)) => Err(OpError::invalid("backend returned a scalar for sdf")),
            None => Ok(None),
        }
    }

    fn validated(&self) -> Result<(f64, f64), OpError> {
        let xmax = self.core.params().float("xmax")?;
        let dx = self.core.params().float("dx")?;
        if !(dx.is_finite() && dx > 0.0) {
            return Err(invalid("dx", format!("must be positive, got {dx}")));
        }
        if !(xmax.is_finite() && xmax > dx) {
            return Err(invalid("xmax", format!("must exceed dx ({dx}), got {xmax}")));
        }
        Ok((xmax, dx))
    }
}

impl Operation for Sdf {
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

impl Compute for Sdf {
    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError> {
        self.detach()?;
        let active = require_hpmc(ctx, SDF)?;
        self.core.params().require_complete()?;
        self.validated()?;
        let ctor = ctx
            .selector
            .compute(SDF, Some(active.family), ctx.device.class())?;
        let args = BuildArgs::new(ctx.context, ctx.device, self.core.params())
            .with_integrator(Some(&active.handle));
        let handle = (**ctor)(&args)?;
        self.core.install(handle);
        Ok(())
    }

    fn handle(&self) -> Option<&ComputeHandle> {
        self.core.handle()
    }

    fn property_name(&self) -> &'static str {
        SDF
    }
}

impl From<Sdf> for Declared {
    fn from(op: Sdf) -> Self {
        Declared::Compute(Box::new(op))
    }
}
