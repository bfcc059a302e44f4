//! Hard-particle Monte Carlo integrator.

use corral_backend::{BuildArgs, ComputeHandle, IntegratorHandle, NativeIntegrator, NativeObject};
use corral_core::{
    BackendError, Family, OpError, OperationId, OperationKind, ParamError, ParamKind, ParamValue,
    ParameterDict, Shape, TypeParameter,
};

use crate::attachment::{AttachState, OpCore};
use crate::operation::{AttachContext, Declared, Integrator, Operation};

/// Dispatch key of every HPMC integrator.
pub const HPMC: &str = "hpmc";

/// Hard-particle Monte Carlo for one particle shape.
///
/// Trial move sizes (`d`, `a`), the translation/rotation split
/// (`move_ratio`) and the number of trial moves per particle per step
/// (`nselect`) are live. The RNG `seed` is fixed once attached. Each
/// particle type needs a `diameter` (the circumscribing diameter for
/// non-spherical shapes).
pub struct HpmcIntegrator {
    shape: Shape,
    core: OpCore<IntegratorHandle>,
    diameter: TypeParameter,
}

impl HpmcIntegrator {
    /// A detached integrator with default move sizes.
    pub fn new(shape: Shape, seed: i64) -> Self {
        let mut params = ParameterDict::new();
        params.declare_value("d", true, 0.1);
        params.declare_value("a", true, 0.1);
        params.declare_value("move_ratio", true, 0.5);
        params.declare_value("nselect", true, 4);
        params.declare_value("seed", false, seed);
        Self {
            shape,
            core: OpCore::new(OperationKind::Integrator, HPMC, params),
            diameter: TypeParameter::new("diameter", ParamKind::Float),
        }
    }

    /// The particle shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Set the diameter of one particle type.
    pub fn set_diameter(&mut self, type_name: &str, diameter: f64) -> Result<(), OpError> {
        self.core.require_detached("shape parameters")?;
        if !(diameter.is_finite() && diameter >= 0.0) {
            return Err(ParamError::InvalidValue {
                name: format!("diameter[{type_name}]"),
                reason: format!("must be finite and non-negative, got {diameter}"),
            }
            .into());
        }
        self.diameter.set(type_name, diameter)?;
        Ok(())
    }

    /// The per-type diameters.
    pub fn diameter(&self) -> &TypeParameter {
        &self.diameter
    }
}

impl Operation for HpmcIntegrator {
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
        self.diameter.cache_types(types)?;
        Ok(())
    }

    fn state(&self) -> AttachState {
        self.core.state()
    }

    fn detach(&mut self) -> Result<(), OpError> {
        self.core.release();
        Ok(())
    }
}

impl Integrator for HpmcIntegrator {
    fn family(&self) -> Family {
        Family::Hpmc(self.shape)
    }

    fn attach(&mut self, ctx: &AttachContext<'_>) -> Result<Vec<ComputeHandle>, OpError> {
        self.detach()?;
        self.core.params().require_complete()?;
        self.diameter.require_complete()?;
        let family = self.family();
        let ctor = ctx
            .selector
            .integrator(HPMC, family, ctx.device.class())?;
        let args = BuildArgs::new(ctx.context, ctx.device, self.core.params())
            .with_type_params(std::slice::from_ref(&self.diameter));
        let build = (**ctor)(&args)?;
        if build.handle.family() != family {
            return Err(BackendError::new(
                build.handle.label(),
                format!("constructed for {} but {family} was requested", build.handle.family()),
            )
            .into());
        }
        self.core.install(build.handle);
        Ok(build.auxiliary)
    }

    fn handle(&self) -> Option<&IntegratorHandle> {
        self.core.handle()
    }
}

impl From<HpmcIntegrator> for Declared {
    fn from(op: HpmcIntegrator) -> Self {
        Declared::Integrator(Box::new(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::Device;
    use corral_test_utils::{mock_context, mock_selector};

    #[test]
    fn diameters_validated_and_frozen_while_attached() {
        let (selector, _) = mock_selector();
        let (context, _system) = mock_context();
        let device = Device::host();
        let mut hpmc = HpmcIntegrator::new(Shape::Ellipsoid, 5);
        assert!(matches!(
            hpmc.set_diameter("A", -1.0),
            Err(OpError::Param(ParamError::InvalidValue { .. }))
        ));
        hpmc.set_diameter("A", 1.0).unwrap();
        hpmc.set_diameter("B", 2.0).unwrap();
        hpmc.cache_types(context.types()).unwrap();

        let auxiliary = hpmc
            .attach(&AttachContext::new(&context, &selector, &device))
            .unwrap();
        assert!(auxiliary.is_empty());
        assert_eq!(hpmc.family(), Family::Hpmc(Shape::Ellipsoid));
        assert_eq!(
            hpmc.handle().unwrap().label(),
            "IntegratorHPMCMonoEllipsoid"
        );
        assert!(matches!(
            hpmc.set_diameter("A", 3.0),
            Err(OpError::InvalidArgument { .. })
        ));

        hpmc.detach().unwrap();
        hpmc.set_diameter("A", 3.0).unwrap();
    }

    #[test]
    fn unregistered_shape_is_unsupported() {
        let (selector, built) = mock_selector();
        let (context, _system) = mock_context();
        let device = Device::host();
        let mut hpmc = HpmcIntegrator::new(Shape::SphereUnion, 5);
        hpmc.set_diameter("A", 1.0).unwrap();
        hpmc.set_diameter("B", 1.0).unwrap();
        hpmc.cache_types(context.types()).unwrap();
        let err = hpmc
            .attach(&AttachContext::new(&context, &selector, &device))
            .err()
            .expect("attach should fail");
        assert!(matches!(err, OpError::Unsupported(_)), "{err}");
        assert_eq!(hpmc.state(), AttachState::Detached);
        assert_eq!(built.count(), 0);
    }
}
