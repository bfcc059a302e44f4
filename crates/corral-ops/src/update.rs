//! Periodic updaters: particle sorting, temperature rescaling, momentum
//! zeroing.
//!
//! All three share [`UpdaterCore`]: attach builds the native updater and
//! binds it to the execution loop through [`PeriodicControl`]; detach
//! deregisters first and then drops the handle.

use std::num::NonZeroU64;

use corral_backend::{BuildArgs, UpdaterHandle};
use corral_core::{
    OpError, OperationId, OperationKind, ParamError, ParamValue, ParameterDict, Period,
};

use crate::attachment::{AttachState, OpCore};
use crate::operation::{AttachContext, Declared, Operation, Updater};
use crate::periodic::PeriodicControl;

/// Dispatch key of [`Sort`].
pub const SORT: &str = "sort";
/// Dispatch key of [`RescaleTemp`].
pub const RESCALE_TEMP: &str = "rescale_temp";
/// Dispatch key of [`ZeroMomentum`].
pub const ZERO_MOMENTUM: &str = "zero_momentum";

fn every(steps: u64) -> Period {
    Period::Fixed(NonZeroU64::new(steps).unwrap_or(NonZeroU64::MIN))
}

fn positive(name: &str, value: &ParamValue) -> Result<(), OpError> {
    match value.as_float() {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ParamError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be finite and positive, got {v}"),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Operation core plus schedule control, shared by every updater.
pub struct UpdaterCore {
    core: OpCore<UpdaterHandle>,
    periodic: PeriodicControl,
}

impl UpdaterCore {
    /// A detached, enabled updater core.
    pub fn new(type_name: &'static str, params: ParameterDict, period: Period) -> Self {
        Self {
            core: OpCore::new(OperationKind::Updater, type_name, params),
            periodic: PeriodicControl::new(type_name, period),
        }
    }

    /// Operation core.
    pub fn core(&self) -> &OpCore<UpdaterHandle> {
        &self.core
    }

    /// Record the registry id.
    pub fn assign_id(&mut self, id: OperationId) {
        self.core.assign_id(id);
    }

    /// Write a parameter (see [`OpCore::set_param`]).
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError> {
        self.core.set_param(name, value)
    }

    /// Build the native updater and register it when enabled.
    /// All-or-nothing: on failure the updater stays detached.
    pub fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError> {
        self.detach()?;
        self.core.params().require_complete()?;
        let type_name = self.core.type_name();
        let ctor = ctx
            .selector
            .updater(type_name, ctx.family(), ctx.device.class())?;
        let args = BuildArgs::new(ctx.context, ctx.device, self.core.params())
            .with_integrator(ctx.integrator.map(|active| &active.handle));
        let handle = (**ctor)(&args)?;
        self.periodic
            .bind(ctx.context.system().clone(), handle.clone(), self.core.label())?;
        self.core.install(handle);
        Ok(())
    }

    /// Deregister, then release the handle.
    pub fn detach(&mut self) -> Result<(), OpError> {
        self.periodic.unbind()?;
        self.core.release();
        Ok(())
    }

    /// Schedule control.
    pub fn periodic(&self) -> &PeriodicControl {
        &self.periodic
    }

    /// Mutable schedule control.
    pub fn periodic_mut(&mut self) -> &mut PeriodicControl {
        &mut self.periodic
    }
}

/// `Operation`, `Updater` and `From<_> for Declared` for a type holding an
/// `inner: UpdaterCore` and an associated `check(name, value)` run before
/// every parameter write.
macro_rules! updater_impls {
    ($ty:ident) => {
        impl Operation for $ty {
            fn kind(&self) -> OperationKind {
                OperationKind::Updater
            }

            fn type_name(&self) -> &'static str {
                self.inner.core().type_name()
            }

            fn id(&self) -> Option<OperationId> {
                self.inner.core().id()
            }

            fn assign_id(&mut self, id: OperationId) {
                self.inner.assign_id(id);
            }

            fn params(&self) -> &ParameterDict {
                self.inner.core().params()
            }

            fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError> {
                Self::check(name, &value)?;
                self.inner.set_param(name, value)
            }

            fn state(&self) -> AttachState {
                self.inner.core().state()
            }

            fn detach(&mut self) -> Result<(), OpError> {
                self.inner.detach()
            }
        }

        impl Updater for $ty {
            fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), OpError> {
                self.inner.attach(ctx)
            }

            fn handle(&self) -> Option<&UpdaterHandle> {
                self.inner.core().handle()
            }

            fn periodic(&self) -> &PeriodicControl {
                self.inner.periodic()
            }

            fn periodic_mut(&mut self) -> &mut PeriodicControl {
                self.inner.periodic_mut()
            }
        }

        impl From<$ty> for Declared {
            fn from(op: $ty) -> Self {
                Declared::Updater(Box::new(op))
            }
        }
    };
}

// ── Sort ───────────────────────────────────────────────────────────

/// Spatially sorts particles in memory for cache locality.
///
/// `bin_width` (live) is the sorting grid spacing. Runs every 500 steps
/// unless told otherwise.
pub struct Sort {
    inner: UpdaterCore,
}

impl Sort {
    /// Default cadence in steps.
    pub const DEFAULT_PERIOD: u64 = 500;
    /// Default grid spacing.
    pub const DEFAULT_BIN_WIDTH: f64 = 1.0;

    /// A detached sorter with default period and bin width.
    pub fn new() -> Self {
        Self::build(Self::DEFAULT_BIN_WIDTH)
    }

    /// A detached sorter with the given grid spacing, which must be finite
    /// and positive.
    pub fn with_bin_width(bin_width: f64) -> Result<Self, OpError> {
        Self::check("bin_width", &ParamValue::Float(bin_width))?;
        Ok(Self::build(bin_width))
    }

    fn build(bin_width: f64) -> Self {
        let mut params = ParameterDict::new();
        params.declare_value("bin_width", true, bin_width);
        Self {
            inner: UpdaterCore::new(SORT, params, every(Self::DEFAULT_PERIOD)),
        }
    }

    fn check(name: &str, value: &ParamValue) -> Result<(), OpError> {
        match name {
            "bin_width" => positive(name, value),
            _ => Ok(()),
        }
    }

    /// Current grid spacing.
    pub fn bin_width(&self) -> Result<f64, OpError> {
        Ok(self.inner.core().params().float("bin_width")?)
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new()
    }
}

updater_impls!(Sort);

// ── RescaleTemp ────────────────────────────────────────────────────

/// Rescales velocities to a target temperature `kT` (live). Runs every
/// step by default.
pub struct RescaleTemp {
    inner: UpdaterCore,
}

impl RescaleTemp {
    /// A detached rescaler targeting `kt`, which must be finite and
    /// positive.
    pub fn new(kt: f64) -> Result<Self, OpError> {
        Self::check("kT", &ParamValue::Float(kt))?;
        let mut params = ParameterDict::new();
        params.declare_value("kT", true, kt);
        Ok(Self {
            inner: UpdaterCore::new(RESCALE_TEMP, params, every(1)),
        })
    }

    fn check(name: &str, value: &ParamValue) -> Result<(), OpError> {
        match name {
            "kT" => positive(name, value),
            _ => Ok(()),
        }
    }

    /// Target temperature.
    pub fn kt(&self) -> Result<f64, OpError> {
        Ok(self.inner.core().params().float("kT")?)
    }
}

updater_impls!(RescaleTemp);

// ── ZeroMomentum ───────────────────────────────────────────────────

/// Removes net linear momentum. No parameters; runs every step by default.
pub struct ZeroMomentum {
    inner: UpdaterCore,
}

impl ZeroMomentum {
    /// A detached momentum zeroer.
    pub fn new() -> Self {
        Self {
            inner: UpdaterCore::new(ZERO_MOMENTUM, ParameterDict::new(), every(1)),
        }
    }

    fn check(_name: &str, _value: &ParamValue) -> Result<(), OpError> {
        Ok(())
    }
}

impl Default for ZeroMomentum {
    fn default() -> Self {
        Self::new()
    }
}

updater_impls!(ZeroMomentum);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_periods() {
        assert_eq!(Sort::new().periodic().schedule().period.fixed(), Some(500));
        assert_eq!(
            RescaleTemp::new(1.0).unwrap().periodic().schedule().period.fixed(),
            Some(1)
        );
        assert_eq!(ZeroMomentum::new().periodic().schedule().period.fixed(), Some(1));
        assert!(Sort::new().periodic().is_enabled());
    }

    #[test]
    fn detached_toggles_are_fatal() {
        let mut sort = Sort::new();
        assert!(matches!(sort.enable(), Err(OpError::NotAttached { .. })));
        assert!(matches!(sort.disable(), Err(OpError::NotAttached { .. })));
    }

    #[test]
    fn detached_set_period_only_records() {
        let mut sort = Sort::new();
        sort.set_period(every(10)).unwrap();
        assert_eq!(sort.period().unwrap().fixed(), Some(10));
    }

    #[test]
    fn live_values_validated_before_staging() {
        let mut rescale = RescaleTemp::new(1.0).unwrap();
        assert!(rescale.set_param("kT", ParamValue::Float(-2.0)).is_err());
        rescale.set_param("kT", ParamValue::Int(2)).unwrap();
        assert_eq!(rescale.kt().unwrap(), 2.0);

        let mut sort = Sort::new();
        assert!(sort.set_param("bin_width", ParamValue::Float(0.0)).is_err());
        assert!(sort.set_param("grid", ParamValue::Int(4)).is_err());
        assert_eq!(sort.bin_width().unwrap(), 1.0);
    }

    #[test]
    fn constructors_validate_like_set_param() {
        assert!(matches!(
            Sort::with_bin_width(-1.0),
            Err(OpError::Param(ParamError::InvalidValue { .. }))
        ));
        assert!(Sort::with_bin_width(f64::NAN).is_err());
        assert_eq!(Sort::with_bin_width(0.5).unwrap().bin_width().unwrap(), 0.5);

        assert!(matches!(
            RescaleTemp::new(-2.0),
            Err(OpError::Param(ParamError::InvalidValue { .. }))
        ));
        assert!(RescaleTemp::new(0.0).is_err());
        assert_eq!(RescaleTemp::new(1.5).unwrap().kt().unwrap(), 1.5);
    }

    #[test]
    fn shared_impls_report_own_type_name() {
        assert_eq!(Sort::new().type_name(), SORT);
        assert_eq!(RescaleTemp::new(1.0).unwrap().type_name(), RESCALE_TEMP);
        assert_eq!(ZeroMomentum::new().type_name(), ZERO_MOMENTUM);
        assert_eq!(Declared::from(ZeroMomentum::new()).kind(), OperationKind::Updater);
    }
}
