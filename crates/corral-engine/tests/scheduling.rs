//! Integration test: attaching declared operations through the registry.
//!
//! Drives [`Operations::schedule`] against the mock backend and checks
//! the attachment ordering rules: nothing is built before a context
//! exists, there is only ever one integrator, and computes are checked
//! against the integrator that is actually installed.

use corral_backend::{NativeCompute, NativeObject, Property};
use corral_core::{
    Device, Family, FamilyClass, OpError, ParamValue, Shape, Timestep, UnsupportedConfig,
};
use corral_engine::{OperationSpec, Operations};
use corral_ops::{
    AttachState, Compute, FreeVolume, HpmcIntegrator, Integrator, MdIntegrator, MdMethod,
    Operation, Sdf, Sort,
};
use corral_test_utils::{mock_context, mock_selector, SystemCall};
use proptest::prelude::*;

fn sphere() -> HpmcIntegrator {
    let mut hpmc = HpmcIntegrator::new(Shape::Sphere, 7);
    hpmc.set_diameter("A", 1.0).unwrap();
    hpmc.set_diameter("B", 0.5).unwrap();
    hpmc
}

// ── Readiness ────────────────────────────────────────────────────────

#[test]
fn schedule_without_context_builds_nothing() {
    let (selector, built) = mock_selector();
    let mut ops = Operations::new();
    ops.add(sphere());
    let sdf = ops.add(Sdf::new(1.0, 0.125));
    ops.add(Sort::new());

    let err = ops.schedule(None, &selector, &Device::host()).unwrap_err();
    assert!(matches!(err, OpError::NotReady { .. }), "{err}");
    assert_eq!(built.count(), 0);
    assert_eq!(ops.integrator().unwrap().state(), AttachState::Detached);
    assert_eq!(ops.compute(sdf).unwrap().read(Timestep(0)).unwrap(), None);

    let err = ops.broadcast_types(None).unwrap_err();
    assert!(matches!(err, OpError::NotReady { .. }));
}

#[test]
fn schedule_attaches_everything_and_installs_integrator() {
    let (selector, built) = mock_selector();
    let (context, system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    let fv = ops.add(FreeVolume::new("A", 100));
    let sort = ops.add(Sort::new());

    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();

    assert_eq!(built.count(), 3);
    assert!(ops.integrator().unwrap().is_attached());
    assert!(ops.compute(fv).unwrap().is_attached());
    assert!(ops.updater(sort).unwrap().is_attached());
    assert_eq!(
        system.active_integrator().as_deref(),
        Some("IntegratorHPMCMonoSphere")
    );
    assert_eq!(system.registered(), vec![format!("sort#{sort}")]);
    assert_eq!(
        ops.compute(fv).unwrap().read(Timestep(10)).unwrap(),
        Some(Property::Scalar(1000.0))
    );
}

#[test]
fn accelerator_device_uses_accelerator_lane() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    ops.schedule(Some(&context), &selector, &Device::accelerator(0)).unwrap();
    assert_eq!(
        system.active_integrator().as_deref(),
        Some("IntegratorHPMCMonoSphereGPU")
    );
}

// ── Backend selection failures ───────────────────────────────────────

#[test]
fn missing_accelerator_backend_is_unsupported() {
    let (selector, _) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    let sdf = ops.add(Sdf::new(1.0, 0.125));

    let err = ops
        .schedule(Some(&context), &selector, &Device::accelerator(0))
        .unwrap_err();
    match err {
        OpError::Unsupported(UnsupportedConfig::NoBackend {
            operation, device, ..
        }) => {
            assert_eq!(operation, "sdf");
            assert_eq!(device, Device::accelerator(0).class());
        }
        other => panic!("expected NoBackend, got {other:?}"),
    }
    assert!(ops.integrator().unwrap().is_attached());
    assert_eq!(ops.compute(sdf).unwrap().state(), AttachState::Detached);
}

#[test]
fn hpmc_compute_without_integrator_is_unsupported() {
    let (selector, built) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    let fv = ops.add(FreeVolume::new("A", 10));

    let err = ops.schedule(Some(&context), &selector, &Device::host()).unwrap_err();
    assert_eq!(
        err,
        OpError::Unsupported(UnsupportedConfig::MissingIntegrator {
            operation: "free_volume".into(),
            required: FamilyClass::Hpmc,
        })
    );
    assert_eq!(built.count(), 0);
    assert!(!ops.compute(fv).unwrap().is_attached());
}

#[test]
fn replacing_integrator_invalidates_family_bound_computes() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    let fv = ops.add(FreeVolume::new("B", 10));
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert!(ops.compute(fv).unwrap().is_attached());

    ops.add(MdIntegrator::new(0.005).unwrap());
    assert_eq!(ops.integrator().unwrap().family(), Family::Md);
    assert!(!ops.integrator().unwrap().is_attached());
    assert_eq!(system.active_integrator(), None);

    let err = ops.schedule(Some(&context), &selector, &Device::host()).unwrap_err();
    assert_eq!(
        err,
        OpError::Unsupported(UnsupportedConfig::WrongIntegrator {
            operation: "free_volume".into(),
            required: FamilyClass::Hpmc,
            found: Family::Md,
        })
    );
    assert_eq!(system.active_family(), Some(Family::Md));
    assert_eq!(ops.compute(fv).unwrap().state(), AttachState::Detached);
}

#[test]
fn unknown_type_is_caught_by_broadcast() {
    let (selector, built) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    ops.add(FreeVolume::new("C", 10));
    let err = ops.schedule(Some(&context), &selector, &Device::host()).unwrap_err();
    assert!(matches!(err, OpError::Param(_)), "{err}");
    assert_eq!(built.count(), 0);
}

#[test]
fn missing_diameter_blocks_integrator_attach() {
    let (selector, built) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    let mut hpmc = HpmcIntegrator::new(Shape::Ellipsoid, 1);
    hpmc.set_diameter("A", 1.0).unwrap();
    ops.add(hpmc);
    let err = ops.schedule(Some(&context), &selector, &Device::host()).unwrap_err();
    assert!(matches!(err, OpError::Param(_)), "{err}");
    assert_eq!(built.count(), 0);
    assert!(!ops.integrator().unwrap().is_attached());
}

// ── Auxiliary computes ───────────────────────────────────────────────

#[test]
fn thermostat_auxiliary_computes_are_retained() {
    let (selector, _) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    let md = MdIntegrator::new(0.005)
        .unwrap()
        .with_method(MdMethod::Nvt { kt: 1.5, tau: 0.5 })
        .unwrap()
        .with_method(MdMethod::Nve)
        .unwrap();
    ops.add(md);

    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert_eq!(ops.auxiliary().len(), 1);
    let thermo = &ops.auxiliary()[0];
    thermo.compute(Timestep(1)).unwrap();
    assert_eq!(
        thermo.property("kinetic_temperature"),
        Some(Property::Scalar(1.5))
    );

    // Re-scheduling rebuilds rather than accumulates.
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert_eq!(ops.auxiliary().len(), 1);

    ops.add(sphere());
    assert!(ops.auxiliary().is_empty());
}

// ── Live parameters ──────────────────────────────────────────────────

#[test]
fn live_parameters_reach_native_integrator() {
    let (selector, _) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();

    let hpmc = ops.integrator_mut().unwrap();
    hpmc.set_param("d", ParamValue::Float(0.2)).unwrap();
    assert_eq!(hpmc.params().float("d").unwrap(), 0.2);

    let err = hpmc.set_param("seed", ParamValue::Int(3)).unwrap_err();
    assert!(matches!(err, OpError::Param(_)), "{err}");
    assert_eq!(hpmc.params().int("seed").unwrap(), 7);
    assert_eq!(hpmc.handle().unwrap().label(), "IntegratorHPMCMonoSphere");
}

// ── Removal and declarative input ────────────────────────────────────

#[test]
fn remove_detaches_and_deregisters() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    let mut ops = Operations::new();
    ops.add(sphere());
    let sort = ops.add(Sort::new());
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    system.clear_calls();

    let removed = ops.remove(sort).unwrap();
    assert_eq!(removed.type_name(), "sort");
    let name = format!("sort#{sort}");
    assert_eq!(
        system.calls(),
        vec![SystemCall::GetPeriod(name.clone()), SystemCall::Deregister(name)]
    );
    assert!(system.registered().is_empty());
    assert_eq!(ops.len(), 1);

    let err = ops.remove(sort).unwrap_err();
    assert!(matches!(err, OpError::InvalidArgument { .. }));
}

#[test]
fn removed_integrator_is_uninstalled() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    let mut ops = Operations::new();
    let hpmc = ops.add(sphere());
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert_eq!(system.active_family(), Some(Family::Hpmc(Shape::Sphere)));
    system.clear_calls();

    let removed = ops.remove(hpmc).unwrap();
    assert_eq!(removed.kind(), corral_core::OperationKind::Integrator);
    assert_eq!(system.active_integrator(), None);
    assert_eq!(system.calls(), vec![SystemCall::ClearActiveIntegrator]);

    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert!(ops.integrator().is_none());
    assert_eq!(system.active_integrator(), None);
}

#[test]
fn schedule_without_integrator_clears_stale_installation() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    let mut other = Operations::new();
    other.add(sphere());
    other.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert!(system.active_integrator().is_some());

    let mut ops = Operations::new();
    ops.add(Sort::new());
    ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
    assert_eq!(system.active_integrator(), None);
}

#[test]
fn rejected_spec_leaves_registry_unchanged() {
    let mut ops = Operations::new();
    let err = ops
        .add_spec(&OperationSpec::new("compute", "msd"))
        .unwrap_err();
    assert!(matches!(err, OpError::InvalidArgument { .. }));
    assert!(ops.is_empty());

    let id = ops
        .add_spec(
            &OperationSpec::new("compute", "sdf")
                .param("xmax", 1.0)
                .param("dx", 0.125),
        )
        .unwrap();
    assert_eq!(ops.compute_ids(), vec![id]);
}

#[test]
fn drop_deregisters_updaters() {
    let (selector, _) = mock_selector();
    let (context, system) = mock_context();
    {
        let mut ops = Operations::new();
        ops.add(sphere());
        ops.add(Sort::new());
        ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
        assert_eq!(system.registered().len(), 1);
        assert!(system.active_integrator().is_some());
    }
    assert!(system.registered().is_empty());
    assert_eq!(system.active_integrator(), None);
}

// ── Properties ───────────────────────────────────────────────────────

fn integrator_choice(i: u8) -> corral_ops::Declared {
    match i % 4 {
        0 => sphere().into(),
        1 => {
            let mut h = HpmcIntegrator::new(Shape::ConvexPolyhedron, 2);
            h.set_diameter("A", 1.0).unwrap();
            h.set_diameter("B", 1.0).unwrap();
            h.into()
        }
        2 => MdIntegrator::new(0.01).unwrap().into(),
        _ => MdIntegrator::new(0.01)
            .unwrap()
            .with_method(MdMethod::Langevin { kt: 1.0, seed: 3 })
            .unwrap()
            .into(),
    }
}

proptest! {
    #[test]
    fn at_most_one_integrator_ever(choices in prop::collection::vec(0u8..4, 1..8)) {
        let (selector, _) = mock_selector();
        let (context, system) = mock_context();
        let mut ops = Operations::new();
        let mut last = None;
        for (i, choice) in choices.iter().enumerate() {
            last = Some(ops.add(integrator_choice(*choice)));
            if i % 2 == 0 {
                ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
            }
            prop_assert_eq!(ops.len(), 1);
        }
        ops.schedule(Some(&context), &selector, &Device::host()).unwrap();
        let integrator = ops.integrator().unwrap();
        prop_assert_eq!(integrator.id(), last);
        prop_assert!(integrator.is_attached());
        prop_assert_eq!(system.active_family(), Some(integrator.family()));
    }
}
